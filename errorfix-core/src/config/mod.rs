pub mod manifest_loader;
pub mod settings;

use thiserror::Error;

pub use manifest_loader::{load_policy, ManifestError, PolicyManifest};
pub use settings::Settings;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} missing. Add it to the environment or .env")]
    Missing(&'static str),
    #[error("{key} has an invalid value '{value}'")]
    Invalid { key: &'static str, value: String },
    #[error("policy manifest: {0}")]
    Manifest(#[from] ManifestError),
}
