//! Scripted [`ModelClient`] for tests — returns queued completions in
//! order rather than calling out to a real provider.

use super::provider::{ModelClient, ModelError, ModelResult};
use super::types::{ModelCompletion, ModelRequest};
use async_trait::async_trait;
use tokio::sync::Mutex;

pub struct MockModelClient {
    responses: Mutex<Vec<ModelCompletion>>,
    requests: Mutex<Vec<ModelRequest>>,
}

impl MockModelClient {
    pub fn new(responses: Vec<ModelCompletion>) -> Self {
        Self {
            responses: Mutex::new(responses),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub async fn requests_seen(&self) -> usize {
        self.requests.lock().await.len()
    }
}

#[async_trait]
impl ModelClient for MockModelClient {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: ModelRequest) -> ModelResult<ModelCompletion> {
        self.requests.lock().await.push(request);
        let mut responses = self.responses.lock().await;
        if responses.is_empty() {
            return Err(ModelError::RequestFailed("mock exhausted".into()));
        }
        Ok(responses.remove(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_queued_responses_in_order() {
        let client = MockModelClient::new(vec![
            ModelCompletion { text: "first".into(), ..Default::default() },
            ModelCompletion { text: "second".into(), ..Default::default() },
        ]);
        let request = ModelRequest::new("system", vec![]);
        let first = client.complete(request.clone()).await.unwrap();
        let second = client.complete(request).await.unwrap();
        assert_eq!(first.text, "first");
        assert_eq!(second.text, "second");
        assert_eq!(client.requests_seen().await, 2);
    }

    #[tokio::test]
    async fn errors_once_exhausted() {
        let client = MockModelClient::new(vec![]);
        let result = client.complete(ModelRequest::new("system", vec![])).await;
        assert!(result.is_err());
    }
}
