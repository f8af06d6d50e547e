//! Turn-completion judge.
//!
//! Optional helper that asks a cheap secondary model whether a burst of
//! fragments reads finished, so the debounce wait can be short for a
//! finished thought and long for an obvious mid-sentence pause. Any
//! judge failure defaults to Complete; the relay must keep answering
//! even when the judge endpoint is down.

use std::sync::Arc;

use tracing::debug;

use confidant_types::engine::{CompletionRequest, EngineMessage, MessageRole};

use crate::debounce::Fragment;
use crate::engine::CompletionEngine;

/// Verdict on whether the user has finished their burst.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JudgeVerdict {
    Complete,
    Incomplete,
}

/// Asks a secondary model whether the user is done talking.
pub struct CompletionJudge<E> {
    engine: Arc<E>,
    model: String,
}

impl<E: CompletionEngine> CompletionJudge<E> {
    pub fn new(engine: Arc<E>, model: impl Into<String>) -> Self {
        Self {
            engine,
            model: model.into(),
        }
    }

    /// Judge the pending fragments. Errors and unparsable answers
    /// default to [`JudgeVerdict::Complete`].
    pub async fn assess(&self, fragments: &[Fragment]) -> JudgeVerdict {
        let listing: String = fragments
            .iter()
            .map(|f| format!("- {}\n", f.text))
            .collect();
        let prompt = format!(
            "The user sent these messages in quick succession:\n{listing}\n\
             Has the user finished what they wanted to say? If the last \
             message clearly trails off mid-thought (ends with words like \
             \"and\", \"but\", \"because\", or an unfinished clause), answer \
             CONTINUING. Otherwise answer FINISHED. Reply with exactly one \
             word."
        );

        let request = CompletionRequest {
            model: self.model.clone(),
            system: None,
            messages: vec![EngineMessage {
                role: MessageRole::User,
                content: prompt,
            }],
        };

        match self.engine.complete(&request).await {
            Ok(reply) if reply.to_uppercase().contains("CONTINUING") => JudgeVerdict::Incomplete,
            Ok(_) => JudgeVerdict::Complete,
            Err(err) => {
                debug!(error = %err, "completion judge failed, assuming finished");
                JudgeVerdict::Complete
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::{at, MockEngine};

    fn fragment(text: &str) -> Fragment {
        Fragment {
            text: text.to_string(),
            attachments: Vec::new(),
            at: at(2026, 3, 1, 12, 0, 0),
        }
    }

    #[tokio::test]
    async fn test_finished_verdict() {
        let engine = Arc::new(MockEngine::new());
        engine.push_reply("FINISHED");
        let judge = CompletionJudge::new(engine, "judge-model");
        let verdict = judge.assess(&[fragment("see you tomorrow")]).await;
        assert_eq!(verdict, JudgeVerdict::Complete);
    }

    #[tokio::test]
    async fn test_continuing_verdict() {
        let engine = Arc::new(MockEngine::new());
        engine.push_reply("CONTINUING");
        let judge = CompletionJudge::new(engine, "judge-model");
        let verdict = judge.assess(&[fragment("so what happened was")]).await;
        assert_eq!(verdict, JudgeVerdict::Incomplete);
    }

    #[tokio::test]
    async fn test_error_defaults_to_complete() {
        let engine = Arc::new(MockEngine::new());
        // No scripted reply: the mock returns an error.
        let judge = CompletionJudge::new(engine.clone(), "judge-model");
        let verdict = judge.assess(&[fragment("hello")]).await;
        assert_eq!(verdict, JudgeVerdict::Complete);
    }

    #[tokio::test]
    async fn test_prompt_lists_all_fragments() {
        let engine = Arc::new(MockEngine::new());
        engine.push_reply("FINISHED");
        let judge = CompletionJudge::new(engine.clone(), "judge-model");
        judge.assess(&[fragment("first"), fragment("second")]).await;

        let requests = engine.requests();
        assert_eq!(requests.len(), 1);
        let content = &requests[0].messages[0].content;
        assert!(content.contains("- first"));
        assert!(content.contains("- second"));
    }
}
