//! Candle-backed engine for GGUF-quantized Llama-family models.
//!
//! Runs entirely on CPU. The loaded weights live behind a mutex because the
//! forward pass mutates the KV cache — one in-flight completion at a time.

use candle_core::quantized::gguf_file;
use candle_core::{Device, Tensor};
use candle_transformers::generation::{LogitsProcessor, Sampling};
use candle_transformers::models::quantized_llama as qlm;
use std::path::Path;
use std::sync::Mutex;
use tokenizers::Tokenizer;
use tracing::{debug, info};

use super::{Engine, EngineConfig, EngineError, GenerationParams};

/// Fixed sampling seed. Same prompt + same params → same completion, which
/// keeps the response cache honest across restarts.
const SAMPLE_SEED: u64 = 42;

/// How far back the repeat penalty looks.
const REPEAT_LAST_N: usize = 64;

pub struct LlamaEngine {
    state: Mutex<ModelState>,
    config: EngineConfig,
}

impl std::fmt::Debug for LlamaEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlamaEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

struct ModelState {
    model: qlm::ModelWeights,
    tokenizer: Tokenizer,
    device: Device,
    eos_token_id: u32,
}

impl LlamaEngine {
    /// Loads the GGUF artifact at the configured path.
    ///
    /// The artifact must already exist — fetching it is the downloader's job.
    /// A `tokenizer.json` is expected next to the model file.
    pub fn load(config: &EngineConfig) -> Result<Self, EngineError> {
        if !config.model_path.exists() {
            return Err(EngineError::ModelNotFound(
                config.model_path.display().to_string(),
            ));
        }

        // Candle's CPU backend sizes its rayon pool from the environment,
        // so this must happen before the first tensor op.
        if std::env::var_os("RAYON_NUM_THREADS").is_none() && config.threads > 0 {
            std::env::set_var("RAYON_NUM_THREADS", config.threads.to_string());
        }

        let device = Device::Cpu;

        let mut file = std::fs::File::open(&config.model_path)
            .map_err(|e| EngineError::ModelLoad(format!("failed to open model file: {e}")))?;

        let gguf = gguf_file::Content::read(&mut file)
            .map_err(|e| EngineError::ModelLoad(format!("failed to parse GGUF file: {e}")))?;

        let model = qlm::ModelWeights::from_gguf(gguf, &mut file, &device)
            .map_err(|e| EngineError::ModelLoad(format!("failed to load model weights: {e}")))?;

        let tokenizer_path = config.model_path.with_file_name("tokenizer.json");
        let tokenizer = load_tokenizer(&tokenizer_path)?;

        let eos_token_id = tokenizer
            .token_to_id("</s>")
            .or_else(|| tokenizer.token_to_id("<|endoftext|>"))
            .or_else(|| tokenizer.token_to_id("<|im_end|>"))
            .unwrap_or(2);

        info!(
            path = %config.model_path.display(),
            context_window = config.context_window,
            eos_token_id,
            "Local model loaded"
        );

        Ok(Self {
            state: Mutex::new(ModelState {
                model,
                tokenizer,
                device,
                eos_token_id,
            }),
            config: config.clone(),
        })
    }
}

fn load_tokenizer(path: &Path) -> Result<Tokenizer, EngineError> {
    if !path.exists() {
        return Err(EngineError::ModelLoad(format!(
            "tokenizer.json not found at {} (expected next to the model file)",
            path.display()
        )));
    }
    Tokenizer::from_file(path)
        .map_err(|e| EngineError::ModelLoad(format!("failed to load tokenizer: {e}")))
}

fn candle_err(e: candle_core::Error) -> EngineError {
    EngineError::Inference(e.to_string())
}

impl ModelState {
    /// Tokenize → feed prompt → sample until EOS or the token budget runs out.
    fn generate(
        &mut self,
        prompt: &str,
        params: &GenerationParams,
        config: &EngineConfig,
    ) -> Result<String, EngineError> {
        let encoding = self
            .tokenizer
            .encode(prompt, true)
            .map_err(|e| EngineError::Inference(format!("tokenization failed: {e}")))?;
        let mut tokens: Vec<u32> = encoding.get_ids().to_vec();

        // Keep the prompt tail when it overflows the window, leaving room
        // for generation.
        let budget = config
            .context_window
            .saturating_sub(params.max_tokens)
            .max(8);
        if tokens.len() > budget {
            tokens.drain(..tokens.len() - budget);
        }

        debug!(
            prompt_tokens = tokens.len(),
            max_tokens = params.max_tokens,
            "Starting generation"
        );

        let sampling = if params.temperature <= 0.0 {
            Sampling::ArgMax
        } else {
            Sampling::TopKThenTopP {
                k: params.top_k,
                p: params.top_p,
                temperature: params.temperature,
            }
        };
        let mut logits_processor = LogitsProcessor::from_sampling(SAMPLE_SEED, sampling);

        // Feed the prompt in batch-sized chunks; index_pos 0 resets the
        // model's KV cache for a fresh sequence.
        let mut index_pos = 0;
        let mut last_logits: Option<Tensor> = None;
        for chunk in tokens.chunks(config.batch_size.max(1)) {
            let input = Tensor::new(chunk, &self.device)
                .and_then(|t| t.unsqueeze(0))
                .map_err(candle_err)?;
            let out = self.model.forward(&input, index_pos).map_err(candle_err)?;
            index_pos += chunk.len();
            last_logits = Some(out);
        }
        let mut logits = match last_logits {
            Some(l) => l.squeeze(0).map_err(candle_err)?,
            None => return Err(EngineError::Inference("prompt produced no tokens".into())),
        };

        let mut all_tokens = tokens;
        let mut generated: Vec<u32> = Vec::new();

        for _ in 0..params.max_tokens {
            let step_logits = if params.repeat_penalty == 1.0 {
                logits.clone()
            } else {
                let start = all_tokens.len().saturating_sub(REPEAT_LAST_N);
                candle_transformers::utils::apply_repeat_penalty(
                    &logits,
                    params.repeat_penalty,
                    &all_tokens[start..],
                )
                .map_err(candle_err)?
            };

            let next = logits_processor.sample(&step_logits).map_err(candle_err)?;
            if next == self.eos_token_id {
                break;
            }
            all_tokens.push(next);
            generated.push(next);

            let input = Tensor::new(&[next][..], &self.device)
                .and_then(|t| t.unsqueeze(0))
                .map_err(candle_err)?;
            logits = self
                .model
                .forward(&input, index_pos)
                .and_then(|l| l.squeeze(0))
                .map_err(candle_err)?;
            index_pos += 1;
        }

        debug!(completion_tokens = generated.len(), "Generation complete");

        if generated.is_empty() {
            return Ok(String::new());
        }
        self.tokenizer
            .decode(&generated, true)
            .map_err(|_| EngineError::MalformedOutput)
    }
}

impl Engine for LlamaEngine {
    fn complete(&self, prompt: &str, params: &GenerationParams) -> Result<String, EngineError> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.generate(prompt, params, &self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn config(model_path: PathBuf) -> EngineConfig {
        EngineConfig {
            model_path,
            context_window: 2048,
            threads: 4,
            batch_size: 8,
        }
    }

    #[test]
    fn missing_artifact_fails_with_model_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.gguf");
        let err = LlamaEngine::load(&config(path.clone())).unwrap_err();
        match err {
            EngineError::ModelNotFound(reported) => {
                assert_eq!(reported, path.display().to_string())
            }
            other => panic!("expected ModelNotFound, got {other:?}"),
        }
    }

    #[test]
    fn unreadable_artifact_fails_with_model_load() {
        // The file exists but is not a GGUF container.
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.gguf");
        std::fs::write(&path, b"not a gguf file").unwrap();
        let err = LlamaEngine::load(&config(path)).unwrap_err();
        assert!(matches!(err, EngineError::ModelLoad(_)), "got {err:?}");
    }
}
