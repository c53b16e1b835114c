//! Classifies a user message before the orchestrator decides which branch
//! of [`super::generate_with_planning`] to take.
//!
//! Grounded on `ai_orchestrator.py`'s `analyze_intent`: one low-temperature
//! classification call, with any unrecognised or failed response collapsing
//! to [`Intent::Chat`] rather than raising.

use crate::model::{ModelClient, ModelMessage, ModelRequest};

const CLASSIFIER_PROMPT: &str = "\
You classify a single user message sent to an app-building assistant. \
Reply with exactly one word, lowercase, no punctuation:

feature_request - the user wants something built, added, or changed in their app
debug - the user is reporting an error, crash, or something broken
question - the user is asking how something works, with no change requested
chat - anything else (greetings, small talk, unclear intent)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    FeatureRequest,
    Debug,
    Question,
    Chat,
}

impl Intent {
    fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "feature_request" => Intent::FeatureRequest,
            "debug" => Intent::Debug,
            "question" => Intent::Question,
            _ => Intent::Chat,
        }
    }
}

/// Classify `message`. Never fails: a model error or an unparseable label
/// both fall back to [`Intent::Chat`], since misclassifying a user message
/// as chat is recoverable (the dialog loop still has tools available) while
/// surfacing a classifier error to the user is not worth the confusion.
pub async fn classify_intent(model: &dyn ModelClient, message: &str) -> Intent {
    let request = ModelRequest::new(CLASSIFIER_PROMPT, vec![ModelMessage::user(message)])
        .with_temperature(0.0);

    match model.complete(request).await {
        Ok(completion) => Intent::from_label(&completion.text),
        Err(_) => Intent::Chat,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MockModelClient, ModelCompletion};

    async fn classify_with(reply: &str) -> Intent {
        let client = MockModelClient::new(vec![ModelCompletion {
            text: reply.to_string(),
            ..Default::default()
        }]);
        classify_intent(&client, "build me a todo list").await
    }

    #[tokio::test]
    async fn recognises_feature_request() {
        assert_eq!(classify_with("feature_request").await, Intent::FeatureRequest);
    }

    #[tokio::test]
    async fn recognises_debug() {
        assert_eq!(classify_with("  Debug\n").await, Intent::Debug);
    }

    #[tokio::test]
    async fn recognises_question() {
        assert_eq!(classify_with("QUESTION").await, Intent::Question);
    }

    #[tokio::test]
    async fn unrecognised_label_collapses_to_chat() {
        assert_eq!(classify_with("i'm not sure").await, Intent::Chat);
    }

    #[tokio::test]
    async fn model_error_collapses_to_chat() {
        let client = MockModelClient::new(vec![]);
        let intent = classify_intent(&client, "hello").await;
        assert_eq!(intent, Intent::Chat);
    }
}
