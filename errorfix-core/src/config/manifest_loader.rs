use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::interceptor::classifier::{
    default_pattern_specs, ContentPolicy, PatternSpec, PolicyError, DEFAULT_GREETINGS,
};

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("Manifest file not found: {0}")]
    FileNotFound(String),
    #[error("Failed to parse manifest JSON: {0}")]
    ParseError(String),
    #[error("Manifest rejected: {0}")]
    InvalidPolicy(#[from] PolicyError),
    #[error("IO Error: {0}")]
    IoError(#[from] std::io::Error),
}

/// On-disk shape of a content policy. Omitted lists keep the built-in ones.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct PolicyManifest {
    #[serde(default)]
    pub greetings: Option<Vec<String>>,
    #[serde(default)]
    pub malicious_patterns: Option<Vec<PatternSpec>>,
}

impl PolicyManifest {
    pub fn into_policy(self) -> Result<ContentPolicy, PolicyError> {
        let greetings = self
            .greetings
            .unwrap_or_else(|| DEFAULT_GREETINGS.iter().map(|s| s.to_string()).collect());
        let patterns = self.malicious_patterns.unwrap_or_else(default_pattern_specs);
        ContentPolicy::new(&greetings, &patterns)
    }
}

pub fn load_policy(path: impl AsRef<Path>) -> Result<ContentPolicy, ManifestError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(ManifestError::FileNotFound(path.display().to_string()));
    }

    let raw_json = fs::read_to_string(path)?;

    let manifest: PolicyManifest =
        serde_json::from_str(&raw_json).map_err(|e| ManifestError::ParseError(e.to_string()))?;

    Ok(manifest.into_policy()?)
}
