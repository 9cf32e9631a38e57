//! Front-end asset resolution from the Vite build manifest.

use std::{collections::HashMap, io, path::Path};

use serde::Deserialize;
use thiserror::Error;

/// Entry points every page loads.
pub const SCRIPT_ENTRY: &str = "assets/js/main.js";
pub const STYLE_ENTRY: &str = "assets/css/input.css";

#[derive(Debug, Error)]
pub enum ManifestError {
  #[error("cannot read asset manifest: {0}")]
  Io(#[from] io::Error),
  #[error("cannot parse asset manifest: {0}")]
  Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Deserialize)]
struct Chunk {
  file:     String,
  #[serde(default)]
  src:      Option<String>,
  #[serde(default, rename = "isEntry")]
  is_entry: bool,
}

/// Immutable after start-up; shared by every request.
#[derive(Debug, Clone, Default)]
pub struct AssetManifest {
  chunks:     HashMap<String, Chunk>,
  /// Set when no manifest was built; assets are then served by Vite.
  dev_server: Option<String>,
}

impl AssetManifest {
  /// Load the manifest at `path`. A missing file switches to dev mode.
  pub fn load(path: &Path, dev_server: &str) -> Result<Self, ManifestError> {
    match std::fs::read_to_string(path) {
      Ok(text) => Self::parse(&text),
      Err(e) if e.kind() == io::ErrorKind::NotFound => {
        tracing::info!(?path, dev_server, "no asset manifest, using dev server");
        Ok(Self::dev(dev_server))
      }
      Err(e) => Err(e.into()),
    }
  }

  pub fn parse(json: &str) -> Result<Self, ManifestError> {
    Ok(Self { chunks: serde_json::from_str(json)?, dev_server: None })
  }

  pub fn dev(server: &str) -> Self {
    Self {
      chunks:     HashMap::new(),
      dev_server: Some(server.trim_end_matches('/').to_owned()),
    }
  }

  pub fn is_dev(&self) -> bool { self.dev_server.is_some() }

  /// Public URL for a source path such as `assets/js/main.js`.
  pub fn asset_path(&self, path: &str) -> String {
    if let Some(server) = &self.dev_server {
      return format!("{server}/{path}");
    }
    match self.chunks.get(path) {
      Some(chunk) => format!("/static/{}", chunk.file),
      None => format!("/static/{path}"),
    }
  }

  /// Source paths of the build's entry chunks, sorted.
  pub fn entries(&self) -> Vec<&str> {
    let mut entries: Vec<&str> = self
      .chunks
      .iter()
      .filter(|(_, chunk)| chunk.is_entry)
      .map(|(key, chunk)| chunk.src.as_deref().unwrap_or(key))
      .collect();
    entries.sort_unstable();
    entries
  }
}
