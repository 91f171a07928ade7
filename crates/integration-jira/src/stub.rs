use std::collections::VecDeque;

use async_trait::async_trait;
use planner_core::CoreError;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::transport::{JiraRequest, JiraTransport};

pub(crate) struct StubTransport {
    responses: Mutex<VecDeque<Result<Value, CoreError>>>,
    requests: Mutex<Vec<JiraRequest>>,
}

impl StubTransport {
    pub(crate) fn new(responses: Vec<Result<Value, CoreError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn ok(responses: Vec<Value>) -> Self {
        Self::new(responses.into_iter().map(Ok).collect())
    }

    pub(crate) async fn requests(&self) -> Vec<JiraRequest> {
        self.requests.lock().await.clone()
    }
}

#[async_trait]
impl JiraTransport for StubTransport {
    async fn get(&self, request: JiraRequest) -> Result<Value, CoreError> {
        self.requests.lock().await.push(request);
        self.responses.lock().await.pop_front().unwrap_or_else(|| {
            Err(CoreError::DependencyUnavailable(
                "no stub response queued".to_owned(),
            ))
        })
    }
}
