//! Question answering over the stored career records.
//!
//! The [`Answerer`] is the public entry point: build context → check cache →
//! run inference → validate output → store to cache. Its contract is "always
//! returns a string" — engine failures are contained here and surface to the
//! caller only as a fixed sentinel, never as an error. Storage failures are
//! NOT this module's concern; the handler propagates those.

use std::sync::Arc;
use tracing::{debug, error, info};

use crate::llm_engine::{EngineCell, GenerationParams};
use crate::models::record::RecordRow;

pub mod cache;
pub mod context;
pub mod handlers;
pub mod prompts;

use cache::ResponseCache;

pub struct Answerer {
    engine: Arc<EngineCell>,
    cache: ResponseCache,
    params: GenerationParams,
}

impl Answerer {
    pub fn new(engine: Arc<EngineCell>, cache_capacity: usize, params: GenerationParams) -> Self {
        Self {
            engine,
            cache: ResponseCache::new(cache_capacity),
            params,
        }
    }

    /// Answers a free-text question against the given record snapshot.
    ///
    /// The question is used verbatim — an empty question just yields a
    /// low-quality answer downstream. The orchestrator holds no per-call
    /// state; only the engine cell and the cache persist across calls.
    pub async fn answer_question(&self, question: &str, records: &[RecordRow]) -> String {
        info!(records = records.len(), "Answering question");

        let context = context::build_context(records);

        if let Some(hit) = self.cache.get(question, &context) {
            debug!("Answer served from cache");
            return hit;
        }

        let prompt = prompts::qa_prompt(question, &context);
        let engine_cell = self.engine.clone();
        let params = self.params.clone();

        // Model load and inference are CPU-bound and blocking; keep them off
        // the async workers.
        let result = tokio::task::spawn_blocking(move || {
            let engine = engine_cell.get_or_load()?;
            engine.complete(&prompt, &params)
        })
        .await;

        let text = match result {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                error!(stage = "inference", error = %e, "Failed to generate answer");
                return prompts::ANSWER_FAILED_SENTINEL.to_string();
            }
            Err(e) => {
                error!(stage = "inference-task", error = %e, "Inference task panicked");
                return prompts::ANSWER_FAILED_SENTINEL.to_string();
            }
        };

        let trimmed = text.trim();
        let answer = if trimmed.is_empty() {
            prompts::NO_ANSWER_SENTINEL.to_string()
        } else {
            trimmed.to_string()
        };

        self.cache.put(question, &context, answer.clone());
        answer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_engine::{Engine, EngineError};
    use chrono::{TimeZone, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingEngine {
        calls: AtomicUsize,
        reply: &'static str,
    }

    impl CountingEngine {
        fn new(reply: &'static str) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                reply,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Engine for CountingEngine {
        fn complete(&self, _: &str, _: &GenerationParams) -> Result<String, EngineError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.reply.to_string())
        }
    }

    struct FailingEngine {
        calls: AtomicUsize,
    }

    impl Engine for FailingEngine {
        fn complete(&self, _: &str, _: &GenerationParams) -> Result<String, EngineError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(EngineError::Inference("engine exploded".into()))
        }
    }

    fn answerer_with(engine: Arc<dyn Engine>) -> Answerer {
        let cell = Arc::new(EngineCell::new(Box::new(move || Ok(engine.clone()))));
        Answerer::new(cell, 100, GenerationParams::default())
    }

    fn experience_record(description: &str) -> RecordRow {
        RecordRow {
            id: 1,
            category: "experience".to_string(),
            title: "Engineer".to_string(),
            description: description.to_string(),
            start_date: Some(Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()),
            end_date: Some(Utc.with_ymd_and_hms(2022, 6, 1, 0, 0, 0).unwrap()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn identical_calls_hit_cache_and_invoke_engine_once() {
        let engine = CountingEngine::new("They built systems.");
        let answerer = answerer_with(engine.clone());
        let records = vec![experience_record("Built systems")];

        let first = answerer.answer_question("What did they do?", &records).await;
        let second = answerer.answer_question("What did they do?", &records).await;

        assert_eq!(first, "They built systems.");
        assert_eq!(first, second);
        assert_eq!(engine.calls(), 1);
        assert_eq!(answerer.cache.len(), 1);
    }

    #[tokio::test]
    async fn changed_description_misses_cache() {
        let engine = CountingEngine::new("Some answer.");
        let answerer = answerer_with(engine.clone());

        let before = vec![experience_record("Built systems")];
        let after = vec![experience_record("Rewrote everything")];

        answerer.answer_question("What did they do?", &before).await;
        answerer.answer_question("What did they do?", &after).await;

        assert_eq!(engine.calls(), 2);
        assert_eq!(answerer.cache.len(), 2);
    }

    #[tokio::test]
    async fn engine_failure_returns_sentinel_and_skips_cache() {
        let engine = Arc::new(FailingEngine {
            calls: AtomicUsize::new(0),
        });
        let answerer = answerer_with(engine.clone());
        let records = vec![experience_record("Built systems")];

        let answer = answerer.answer_question("What did they do?", &records).await;
        assert_eq!(answer, prompts::ANSWER_FAILED_SENTINEL);
        assert_eq!(answerer.cache.len(), 0);

        // No caching of failures: the second call reaches the engine again.
        answerer.answer_question("What did they do?", &records).await;
        assert_eq!(engine.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn whitespace_only_output_becomes_no_answer_sentinel() {
        let engine = CountingEngine::new("   \n  ");
        let answerer = answerer_with(engine.clone());

        let answer = answerer.answer_question("Anything?", &[]).await;
        assert_eq!(answer, prompts::NO_ANSWER_SENTINEL);

        // An empty completion is still a successful generation, so it caches.
        let again = answerer.answer_question("Anything?", &[]).await;
        assert_eq!(again, prompts::NO_ANSWER_SENTINEL);
        assert_eq!(engine.calls(), 1);
    }

    #[tokio::test]
    async fn surrounding_whitespace_is_trimmed() {
        let engine = CountingEngine::new("  The answer.  \n");
        let answerer = answerer_with(engine);

        let answer = answerer.answer_question("Q", &[]).await;
        assert_eq!(answer, "The answer.");
    }

    #[tokio::test]
    async fn failed_engine_load_returns_sentinel() {
        let cell = Arc::new(EngineCell::new(Box::new(|| {
            Err(EngineError::ModelNotFound("models/missing.gguf".into()))
        })));
        let answerer = Answerer::new(cell, 100, GenerationParams::default());

        let answer = answerer.answer_question("Q", &[]).await;
        assert_eq!(answer, prompts::ANSWER_FAILED_SENTINEL);
        assert_eq!(answerer.cache.len(), 0);
    }
}
