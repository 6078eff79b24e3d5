use std::path::PathBuf;

use thiserror::Error;

use crate::domain::Stage;
use crate::signal::SignalError;

#[derive(Debug, Error)]
pub enum CloudmeError {
    /// Descriptor missing or invalid. Fatal at startup.
    #[error("failed to load descriptor {path:?}: {reason}")]
    ConfigLoad { path: PathBuf, reason: String },

    /// Runtime engine unreachable or misconfigured. Fatal at startup.
    #[error("runtime init failed: {0}")]
    RuntimeInit(String),

    /// Build context could not be packaged.
    #[error("packaging {path:?} failed: {source}")]
    Packaging {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A runtime adapter call failed.
    #[error("{stage} of {service} failed: {message}")]
    StageExecution {
        stage: Stage,
        service: String,
        message: String,
    },

    #[error(transparent)]
    Signal(#[from] SignalError),
}

impl CloudmeError {
    pub fn stage(stage: Stage, service: &str, message: impl Into<String>) -> Self {
        Self::StageExecution {
            stage,
            service: service.to_string(),
            message: message.into(),
        }
    }

    /// Startup errors abort before any pipeline work begins.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ConfigLoad { .. } | Self::RuntimeInit(_))
    }
}
