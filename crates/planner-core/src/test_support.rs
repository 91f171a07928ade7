use std::cell::Cell;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};

static ENV_LOCK: Mutex<()> = Mutex::new(());
static TEMP_PATH_COUNTER: AtomicU64 = AtomicU64::new(0);
thread_local! {
    static ENV_LOCK_HELD: Cell<bool> = const { Cell::new(false) };
}

/// Saved environment values, restored in reverse order on drop. Only the
/// outermost patch on a thread owns the global lock.
struct EnvPatch {
    saved: Vec<(String, Option<OsString>)>,
    lock: Option<MutexGuard<'static, ()>>,
}

impl EnvPatch {
    fn apply(vars: &[(&str, Option<&str>)]) -> Self {
        let lock = if ENV_LOCK_HELD.with(Cell::get) {
            None
        } else {
            let guard = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            ENV_LOCK_HELD.with(|held| held.set(true));
            Some(guard)
        };

        let mut saved = Vec::with_capacity(vars.len());
        for (key, value) in vars {
            saved.push(((*key).to_owned(), std::env::var_os(key)));
            set_or_remove(key, value.map(OsString::from));
        }
        Self { saved, lock }
    }
}

impl Drop for EnvPatch {
    fn drop(&mut self) {
        while let Some((key, original)) = self.saved.pop() {
            set_or_remove(&key, original);
        }
        if self.lock.take().is_some() {
            ENV_LOCK_HELD.with(|held| held.set(false));
        }
    }
}

fn set_or_remove(key: &str, value: Option<OsString>) {
    match value {
        Some(value) => unsafe { std::env::set_var(key, value) },
        None => unsafe { std::env::remove_var(key) },
    }
}

/// Runs `run` with the process environment patched. Calls serialize on a
/// global lock and nest freely on the same thread.
pub fn with_env_var<R>(key: &str, value: Option<&str>, run: impl FnOnce() -> R) -> R {
    with_env_vars(&[(key, value)], run)
}

pub fn with_env_vars<R>(vars: &[(&str, Option<&str>)], run: impl FnOnce() -> R) -> R {
    let _patch = EnvPatch::apply(vars);
    run()
}

pub fn unique_temp_path(tag: &str) -> PathBuf {
    let safe_tag: String = tag
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
                ch
            } else {
                '-'
            }
        })
        .collect();
    let now_nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let counter = TEMP_PATH_COUNTER.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!(
        "sprint-planner-{safe_tag}-{}-{now_nanos}-{counter}",
        std::process::id(),
    ))
}

/// Scratch directory removed with everything inside it on drop.
pub struct TestDir {
    path: PathBuf,
}

impl TestDir {
    pub fn new(tag: &str) -> Self {
        Self {
            path: unique_temp_path(tag),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn join(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }
}

impl Drop for TestDir {
    fn drop(&mut self) {
        if let Err(err) = std::fs::remove_dir_all(&self.path) {
            if err.kind() != std::io::ErrorKind::NotFound {
                eprintln!(
                    "warning: failed to remove temporary test directory {}: {err}",
                    self.path.display()
                );
            }
        }
    }
}
