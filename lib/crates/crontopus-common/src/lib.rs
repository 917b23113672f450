pub mod manifest;
pub mod types;

pub use manifest::{JobManifest, ManifestError, ManifestMetadata, ManifestSpec};
pub use types::*;
