//! Command implementations for the Graphwright CLI.

pub mod create;
pub mod ingest;
pub mod predict;
pub mod score;

use anyhow::{Context, Result, bail};
use base64::Engine as _;
use base64::engine::general_purpose;
use std::path::Path;

/// Returns `true` if the file extension maps to an image MIME type.
pub fn is_image(path: &Path) -> bool {
    mime_guess::from_path(path).first().is_some_and(|mime| mime.type_() == mime_guess::mime::IMAGE)
}

/// Reads an image file into a `data:` URL.
pub fn image_data_url(path: &Path) -> Result<String> {
    let Some(mime) = mime_guess::from_path(path).first().filter(|m| m.type_() == mime_guess::mime::IMAGE) else {
        bail!("{} is not a recognized image file", path.display());
    };
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(format!("data:{};base64,{}", mime.essence_str(), general_purpose::STANDARD.encode(bytes)))
}
