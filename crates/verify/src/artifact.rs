//! Screenshot artifact validation
//!
//! A flow's screenshots are its only output; a run that "passed" but
//! wrote a truncated or undecodable PNG is a failed verification.

use std::path::{Path, PathBuf};

use image::GenericImageView;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::{VerifyError, VerifyResult};

/// Summary of one captured screenshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactInfo {
    pub name: String,
    pub path: PathBuf,
    pub bytes: u64,
    pub width: u32,
    pub height: u32,
    pub sha256: String,
}

/// Validate a captured screenshot and summarize it.
///
/// The file must exist, be non-empty, and decode as an image with
/// non-zero dimensions.
pub fn validate(name: &str, path: &Path) -> VerifyResult<ArtifactInfo> {
    let data = std::fs::read(path).map_err(|e| {
        VerifyError::Artifact(format!("screenshot '{}' missing at {}: {}", name, path.display(), e))
    })?;

    if data.is_empty() {
        return Err(VerifyError::Artifact(format!(
            "screenshot '{}' at {} is empty",
            name,
            path.display()
        )));
    }

    let img = image::load_from_memory(&data).map_err(|e| {
        VerifyError::Artifact(format!(
            "screenshot '{}' at {} does not decode: {}",
            name,
            path.display(),
            e
        ))
    })?;

    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return Err(VerifyError::Artifact(format!(
            "screenshot '{}' has zero dimensions",
            name
        )));
    }

    let mut hasher = Sha256::new();
    hasher.update(&data);
    let sha256 = hex::encode(hasher.finalize());

    debug!("Screenshot '{}': {}x{}, {} bytes", name, width, height, data.len());

    Ok(ArtifactInfo {
        name: name.to_string(),
        path: path.to_path_buf(),
        bytes: data.len() as u64,
        width,
        height,
        sha256,
    })
}
