/// LLM Engine — the single point of entry for all model inference in the API.
///
/// ARCHITECTURAL RULE: No other module may touch the loaded model directly.
/// All completions MUST go through an [`Engine`] obtained from the
/// [`EngineCell`].
///
/// The model is a process-wide resource: loaded at most once, never torn
/// down mid-run. Loading is expensive (GGUF weights into RAM), so the cell
/// guards against concurrent double-initialization and remembers a failed
/// load permanently — a missing artifact is a configuration error, not
/// something a retry fixes.
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};
use thiserror::Error;

pub mod download;
pub mod llama;

/// Errors produced by engine initialization and inference.
///
/// `Clone` because the one-time cell hands the same load outcome to every
/// caller, successful or not.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    #[error("model artifact not found at {0}")]
    ModelNotFound(String),

    #[error("failed to load model: {0}")]
    ModelLoad(String),

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("engine produced no decodable completion")]
    MalformedOutput,
}

/// Knobs fixed at load time.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub model_path: PathBuf,
    /// Token budget shared by prompt and generation.
    pub context_window: usize,
    /// CPU worker threads for tensor ops.
    pub threads: usize,
    /// How many prompt tokens to feed per forward pass.
    pub batch_size: usize,
}

/// Per-request sampling knobs.
#[derive(Debug, Clone)]
pub struct GenerationParams {
    pub max_tokens: usize,
    pub temperature: f64,
    pub top_p: f64,
    pub top_k: usize,
    pub repeat_penalty: f32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_tokens: 256,
            temperature: 0.5,
            top_p: 0.95,
            top_k: 40,
            repeat_penalty: 1.0,
        }
    }
}

/// A loaded inference engine. `complete` is synchronous and blocking;
/// implementations serialize concurrent calls internally (the underlying
/// model is not reentrant). Callers run it on a blocking thread.
pub trait Engine: Send + Sync {
    fn complete(&self, prompt: &str, params: &GenerationParams) -> Result<String, EngineError>;
}

type EngineLoader = Box<dyn Fn() -> Result<Arc<dyn Engine>, EngineError> + Send + Sync>;

/// One-time-initialization cell for the process-wide engine.
///
/// The first caller of [`get_or_load`](Self::get_or_load) runs the loader;
/// concurrent callers block until it finishes and then observe the same
/// outcome. The stored `Result` makes a failed load terminal: the process
/// keeps serving, degraded, and every subsequent caller sees the original
/// error.
pub struct EngineCell {
    loader: EngineLoader,
    cell: OnceLock<Result<Arc<dyn Engine>, EngineError>>,
}

impl EngineCell {
    pub fn new(loader: EngineLoader) -> Self {
        Self {
            loader,
            cell: OnceLock::new(),
        }
    }

    /// Returns the engine, loading it on first call.
    ///
    /// Blocking: must not be called from an async context directly — wrap in
    /// `spawn_blocking` (model loads take seconds).
    pub fn get_or_load(&self) -> Result<Arc<dyn Engine>, EngineError> {
        self.cell.get_or_init(|| (self.loader)()).clone()
    }

    /// True once a load has succeeded.
    pub fn is_ready(&self) -> bool {
        matches!(self.cell.get(), Some(Ok(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    struct EchoEngine;

    impl Engine for EchoEngine {
        fn complete(&self, prompt: &str, _: &GenerationParams) -> Result<String, EngineError> {
            Ok(prompt.to_string())
        }
    }

    #[test]
    fn concurrent_first_callers_trigger_exactly_one_load() {
        let loads = Arc::new(AtomicUsize::new(0));
        let counter = loads.clone();
        let cell = Arc::new(EngineCell::new(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            // Widen the race window a little.
            thread::sleep(std::time::Duration::from_millis(20));
            Ok(Arc::new(EchoEngine) as Arc<dyn Engine>)
        })));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cell = cell.clone();
                thread::spawn(move || cell.get_or_load().is_ok())
            })
            .collect();

        for handle in handles {
            assert!(handle.join().unwrap());
        }
        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert!(cell.is_ready());
    }

    #[test]
    fn failed_load_is_terminal() {
        let loads = Arc::new(AtomicUsize::new(0));
        let counter = loads.clone();
        let cell = EngineCell::new(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(EngineError::ModelNotFound("models/missing.gguf".into()))
        }));

        assert!(matches!(
            cell.get_or_load(),
            Err(EngineError::ModelNotFound(_))
        ));
        // The loader would "succeed" on a retry, but the cell never retries.
        assert!(matches!(
            cell.get_or_load(),
            Err(EngineError::ModelNotFound(_))
        ));
        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert!(!cell.is_ready());
    }
}
