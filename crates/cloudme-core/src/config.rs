//! Container daemon connection settings.
//!
//! Mirrors the docker CLI environment: `DOCKER_HOST`, `DOCKER_TLS_VERIFY`,
//! `DOCKER_CERT_PATH`. The CLI reads the variables; this module only
//! interprets them.

use std::path::{Path, PathBuf};

use crate::error::CloudmeError;

/// Where the daemon lives and how to authenticate to it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DaemonConfig {
    /// e.g. `tcp://10.0.0.5:2376`.
    pub host: Option<String>,
    pub tls_verify: bool,
    /// Directory holding `ca.pem`, `cert.pem` and `key.pem`.
    pub cert_path: Option<PathBuf>,
}

/// PEM material for mutual TLS.
#[derive(Debug, Clone)]
pub struct TlsMaterial {
    pub ca: Vec<u8>,
    /// Client certificate followed by its private key.
    pub identity: Vec<u8>,
}

impl DaemonConfig {
    pub fn new(host: Option<String>, tls_verify: bool, cert_path: Option<PathBuf>) -> Self {
        Self {
            host: host.filter(|h| !h.is_empty()),
            tls_verify,
            cert_path,
        }
    }

    /// `DOCKER_TLS_VERIFY` semantics: unset, empty or `0` disables TLS.
    pub fn tls_flag(raw: Option<&str>) -> bool {
        matches!(raw, Some(v) if !v.is_empty() && v != "0")
    }

    /// HTTP base URL for the daemon API.
    pub fn base_url(&self) -> Result<String, CloudmeError> {
        let host = self
            .host
            .as_deref()
            .ok_or_else(|| CloudmeError::RuntimeInit("DOCKER_HOST is not set".to_string()))?;

        let scheme = if self.tls_verify { "https" } else { "http" };
        let base = if let Some(rest) = host.strip_prefix("tcp://") {
            format!("{scheme}://{rest}")
        } else if host.starts_with("http://") || host.starts_with("https://") {
            host.to_string()
        } else if host.starts_with("unix://") {
            return Err(CloudmeError::RuntimeInit(format!(
                "unix socket endpoints are not supported ({host}); expose the daemon over tcp"
            )));
        } else {
            return Err(CloudmeError::RuntimeInit(format!(
                "unsupported DOCKER_HOST {host}"
            )));
        };

        Ok(base.trim_end_matches('/').to_string())
    }

    /// Load TLS material when verification is enabled.
    pub fn tls_material(&self) -> Result<Option<TlsMaterial>, CloudmeError> {
        if !self.tls_verify {
            return Ok(None);
        }
        let dir = self.cert_path.as_deref().ok_or_else(|| {
            CloudmeError::RuntimeInit("DOCKER_TLS_VERIFY is set but DOCKER_CERT_PATH is not".into())
        })?;

        let ca = read_pem(dir, "ca.pem")?;
        let mut identity = read_pem(dir, "cert.pem")?;
        identity.push(b'\n');
        identity.extend(read_pem(dir, "key.pem")?);

        Ok(Some(TlsMaterial { ca, identity }))
    }
}

fn read_pem(dir: &Path, name: &str) -> Result<Vec<u8>, CloudmeError> {
    let path = dir.join(name);
    std::fs::read(&path)
        .map_err(|e| CloudmeError::RuntimeInit(format!("reading {}: {e}", path.display())))
}
