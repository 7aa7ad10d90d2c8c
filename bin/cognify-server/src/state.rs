//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use cognify_llm::{ExecutionClient, Tutor};

use crate::config::Config;
use crate::entities::SqliteStore;

/// State shared across all HTTP handlers and background persona tasks.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Server configuration (env-derived).
    pub config: Arc<Config>,
    pub store: Arc<SqliteStore>,
    /// Prompt catalogue over the configured language model.
    pub tutor: Tutor,
    /// Piston client for the code playground.
    pub executor: ExecutionClient,
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use async_trait::async_trait;
    use cognify_llm::{Completion, LanguageModel, LlmError};
    use std::sync::Mutex;

    /// Answers with the scripted replies in order, then fails; records every request.
    pub(crate) struct ScriptedModel {
        answers: Mutex<Vec<Result<String, ()>>>,
        pub seen: Mutex<Vec<Completion>>,
    }

    impl ScriptedModel {
        pub fn new(answers: &[&str]) -> Arc<Self> {
            Self::with(answers.iter().map(|a| Ok(a.to_string())).collect())
        }

        /// `Err(())` entries fail that call.
        pub fn with(mut answers: Vec<Result<String, ()>>) -> Arc<Self> {
            answers.reverse();
            Arc::new(Self { answers: Mutex::new(answers), seen: Mutex::new(Vec::new()) })
        }
    }

    #[async_trait]
    impl LanguageModel for ScriptedModel {
        async fn complete(&self, request: &Completion) -> Result<String, LlmError> {
            self.seen.lock().unwrap().push(request.clone());
            match self.answers.lock().unwrap().pop() {
                Some(Ok(text)) => Ok(text),
                _ => Err(LlmError::Status { status: 503, body: "scripted failure".into() }),
            }
        }

        async fn complete_stream(
            &self,
            request: &Completion,
            on_token: &mut (dyn for<'t> FnMut(&'t str) + Send),
        ) -> Result<String, LlmError> {
            let text = self.complete(request).await?;
            // Two callbacks so relays see more than one delta.
            let split = text.char_indices().nth(text.chars().count() / 2).map_or(text.len(), |(i, _)| i);
            on_token(&text[..split]);
            on_token(&text);
            Ok(text)
        }
    }

    /// Picks the answer whose needle occurs in the last prompt message, so
    /// concurrent callers get the right reply regardless of call order.
    pub(crate) struct RoutedModel {
        routes: Vec<(&'static str, &'static str)>,
        pub seen: Mutex<Vec<Completion>>,
    }

    impl RoutedModel {
        pub fn new(routes: &[(&'static str, &'static str)]) -> Arc<Self> {
            Arc::new(Self { routes: routes.to_vec(), seen: Mutex::new(Vec::new()) })
        }
    }

    #[async_trait]
    impl LanguageModel for RoutedModel {
        async fn complete(&self, request: &Completion) -> Result<String, LlmError> {
            self.seen.lock().unwrap().push(request.clone());
            let prompt = request.messages.last().map(|m| m.content.as_str()).unwrap_or("");
            self.routes
                .iter()
                .find(|(needle, _)| prompt.contains(needle))
                .map(|(_, answer)| answer.to_string())
                .ok_or(LlmError::UnexpectedFormat)
        }

        async fn complete_stream(
            &self,
            request: &Completion,
            on_token: &mut (dyn for<'t> FnMut(&'t str) + Send),
        ) -> Result<String, LlmError> {
            let text = self.complete(request).await?;
            on_token(&text);
            Ok(text)
        }
    }

    pub(crate) async fn state_with(model: Arc<dyn LanguageModel>) -> Arc<AppState> {
        let config = Config::for_tests();
        let executor = ExecutionClient::new(config.piston_url.clone()).unwrap();
        Arc::new(AppState {
            config: Arc::new(config),
            store: Arc::new(SqliteStore::memory().await.unwrap()),
            tutor: Tutor::new(model),
            executor,
        })
    }
}
