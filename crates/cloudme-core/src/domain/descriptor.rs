//! Application descriptor model.
//!
//! The descriptor file is a JSON object with PascalCase keys:
//!
//! ```json
//! {
//!   "Application": { "Name": "shop", "Version": "1.2.0", "Ports": [8080] },
//!   "Microservices": [
//!     { "Name": "api", "Image": "shop/api", "DockerFile": "Dockerfile.api" }
//!   ]
//! }
//! ```
//!
//! Missing fields decode to their empty value.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::CloudmeError;

/// Application-wide settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ApplicationDescriptor {
    pub name: String,
    pub command: String,
    pub ports: Vec<u64>,
    pub version: String,
    /// Build context location, relative to the descriptor file's directory.
    pub source: String,
    pub base_image: String,
}

/// One deployable microservice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct MicroserviceDescriptor {
    pub name: String,
    pub image: String,
    #[serde(rename = "DockerFile", alias = "Dockerfile")]
    pub dockerfile: String,
    pub hostname: String,
    #[serde(rename = "Mount", alias = "Mounts")]
    pub mounts: Vec<String>,
    pub command: String,
    pub config_path: String,
    /// Dependency hint. Declared in descriptors, not used for scheduling.
    pub requires: String,
    pub logs: String,
}

/// The decoded descriptor file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Descriptor {
    #[serde(default)]
    pub application: ApplicationDescriptor,
    #[serde(default)]
    pub microservices: Vec<MicroserviceDescriptor>,

    /// Directory the descriptor was loaded from.
    #[serde(skip)]
    base_dir: PathBuf,
}

impl Descriptor {
    /// Load and validate a descriptor file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CloudmeError> {
        let path = path.as_ref();
        let raw = std::fs::read(path).map_err(|e| CloudmeError::ConfigLoad {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let mut descriptor = Self::from_slice(&raw).map_err(|e| match e {
            CloudmeError::ConfigLoad { reason, .. } => CloudmeError::ConfigLoad {
                path: path.to_path_buf(),
                reason,
            },
            other => other,
        })?;

        descriptor.base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        if descriptor.base_dir.as_os_str().is_empty() {
            descriptor.base_dir = PathBuf::from(".");
        }

        debug!(
            path = %path.display(),
            services = descriptor.microservices.len(),
            "loaded descriptor"
        );
        Ok(descriptor)
    }

    /// Decode and validate descriptor JSON. The base directory is `.`.
    pub fn from_slice(raw: &[u8]) -> Result<Self, CloudmeError> {
        let mut descriptor: Descriptor =
            serde_json::from_slice(raw).map_err(|e| CloudmeError::ConfigLoad {
                path: PathBuf::new(),
                reason: format!("json decode: {e}"),
            })?;
        descriptor.base_dir = PathBuf::from(".");
        descriptor.validate()?;
        Ok(descriptor)
    }

    /// Build a descriptor in code (tests, embedding).
    pub fn new(
        application: ApplicationDescriptor,
        microservices: Vec<MicroserviceDescriptor>,
        base_dir: impl Into<PathBuf>,
    ) -> Result<Self, CloudmeError> {
        let descriptor = Self {
            application,
            microservices,
            base_dir: base_dir.into(),
        };
        descriptor.validate()?;
        Ok(descriptor)
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Directory packaged as the build context.
    pub fn context_dir(&self) -> PathBuf {
        if self.application.source.is_empty() {
            self.base_dir.clone()
        } else {
            self.base_dir.join(&self.application.source)
        }
    }

    /// Service names and image references are signal keys, so both must be
    /// unique and non-empty.
    fn validate(&self) -> Result<(), CloudmeError> {
        let mut names = HashSet::new();
        let mut images = HashSet::new();
        for service in &self.microservices {
            if service.name.is_empty() {
                return Err(self.invalid("microservice without a Name"));
            }
            if !is_container_name(&service.name) {
                return Err(self.invalid(format!(
                    "microservice name {:?} is not a valid container name",
                    service.name
                )));
            }
            if service.image.is_empty() {
                return Err(self.invalid(format!("microservice {} has no Image", service.name)));
            }
            if !names.insert(service.name.as_str()) {
                return Err(self.invalid(format!("duplicate microservice name {}", service.name)));
            }
            if !images.insert(service.image.as_str()) {
                return Err(self.invalid(format!("duplicate image reference {}", service.image)));
            }
        }
        Ok(())
    }

    fn invalid(&self, reason: impl Into<String>) -> CloudmeError {
        CloudmeError::ConfigLoad {
            path: self.base_dir.clone(),
            reason: reason.into(),
        }
    }
}

/// Container names: `[a-zA-Z0-9][a-zA-Z0-9_.-]*`. The name is used as a
/// path segment of the daemon API.
fn is_container_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphanumeric())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
}
