use anyhow::{anyhow, Result};
use std::path::PathBuf;

use crate::llm_engine::{EngineConfig, GenerationParams};

/// Default model artifact: a 4-bit quantized Mistral 7B Instruct.
const DEFAULT_MODEL_URL: &str = "https://huggingface.co/TheBloke/Mistral-7B-Instruct-v0.1-GGUF/resolve/main/mistral-7b-instruct-v0.1.Q4_K_M.gguf";

/// Application configuration loaded from environment variables.
/// Every knob has a default so the service starts from a bare environment;
/// the numeric generation defaults are policy, not hard constraints.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub model_path: PathBuf,
    pub model_url: String,
    pub port: u16,
    pub rust_log: String,
    pub cache_capacity: usize,
    pub context_window: usize,
    pub threads: usize,
    pub batch_size: usize,
    pub max_tokens: usize,
    pub temperature: f64,
    pub top_p: f64,
    pub top_k: usize,
    pub repeat_penalty: f32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: env_or("DATABASE_URL", "sqlite://portfolio.db"),
            model_path: PathBuf::from(env_or("MODEL_PATH", "models/mistral-7b-instruct.gguf")),
            model_url: env_or("MODEL_URL", DEFAULT_MODEL_URL),
            port: env_parse("PORT", 8080)?,
            rust_log: env_or("RUST_LOG", "info"),
            cache_capacity: env_parse("ANSWER_CACHE_CAPACITY", 100)?,
            context_window: env_parse("MODEL_CONTEXT_WINDOW", 2048)?,
            threads: env_parse("MODEL_THREADS", 4)?,
            batch_size: env_parse("MODEL_BATCH_SIZE", 8)?,
            max_tokens: env_parse("GEN_MAX_TOKENS", 256)?,
            temperature: env_parse("GEN_TEMPERATURE", 0.5)?,
            top_p: env_parse("GEN_TOP_P", 0.95)?,
            top_k: env_parse("GEN_TOP_K", 40)?,
            repeat_penalty: env_parse("GEN_REPEAT_PENALTY", 1.0)?,
        })
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            model_path: self.model_path.clone(),
            context_window: self.context_window,
            threads: self.threads,
            batch_size: self.batch_size,
        }
    }

    pub fn generation_params(&self) -> GenerationParams {
        GenerationParams {
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            top_p: self.top_p,
            top_k: self.top_k,
            repeat_penalty: self.repeat_penalty,
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|e| anyhow!("Environment variable '{key}' is invalid: {e}")),
        Err(_) => Ok(default),
    }
}
