//! Model artifact acquisition: download-if-missing at startup.
//!
//! The engine itself never fetches anything — it only checks that the file
//! exists. This module streams the artifact to a temp file and renames it
//! into place so a crashed download never leaves a half-written model where
//! the loader would find it.

use anyhow::{anyhow, Context, Result};
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

/// Ensures the model artifact exists at `model_path`, downloading it from
/// `model_url` if missing. Returns Ok if the file is present afterwards.
pub async fn ensure_model(model_path: &Path, model_url: &str) -> Result<()> {
    if model_path.exists() {
        info!("Model already present at {}", model_path.display());
        return Ok(());
    }

    if let Some(parent) = model_path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("creating model directory {}", parent.display()))?;
    }

    let tmp_path = model_path.with_extension("download");
    let result = download_to(model_url, &tmp_path).await;

    match result {
        Ok(()) => {
            tokio::fs::rename(&tmp_path, model_path)
                .await
                .context("moving downloaded model into place")?;
            info!("Model download complete: {}", model_path.display());
            Ok(())
        }
        Err(e) => {
            if tokio::fs::remove_file(&tmp_path).await.is_ok() {
                warn!("Removed partial download {}", tmp_path.display());
            }
            Err(e)
        }
    }
}

async fn download_to(url: &str, dest: &Path) -> Result<()> {
    let client = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(30))
        .build()
        .context("building HTTP client")?;

    let mut response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("requesting {url}"))?;

    if !response.status().is_success() {
        return Err(anyhow!(
            "model download failed with status {}",
            response.status()
        ));
    }

    let total_bytes = response.content_length().unwrap_or(0);
    info!("Downloading model from {url} ({total_bytes} bytes)");

    let mut file = tokio::fs::File::create(dest)
        .await
        .with_context(|| format!("creating {}", dest.display()))?;

    while let Some(chunk) = response.chunk().await.context("reading download stream")? {
        file.write_all(&chunk).await.context("writing model file")?;
    }
    file.flush().await.context("flushing model file")?;

    Ok(())
}
