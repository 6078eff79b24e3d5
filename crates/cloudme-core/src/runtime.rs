use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use tracing::info;

use crate::config::DaemonConfig;
use crate::error::CloudmeError;
use crate::impls::DockerRuntime;
use crate::ports::RuntimeAdapter;

/// Container engine selected at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RuntimeKind {
    #[default]
    Docker,
    /// Declared extension point; no driver yet.
    Rkt,
}

impl RuntimeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RuntimeKind::Docker => "docker",
            RuntimeKind::Rkt => "rkt",
        }
    }
}

impl fmt::Display for RuntimeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RuntimeKind {
    type Err = CloudmeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "docker" => Ok(RuntimeKind::Docker),
            "rkt" => Ok(RuntimeKind::Rkt),
            other => Err(CloudmeError::RuntimeInit(format!("unknown runtime {other}"))),
        }
    }
}

/// Construct the one driver this process will use.
///
/// `context_dir` is the directory packaged as each service's build context.
pub fn connect(
    kind: RuntimeKind,
    daemon: &DaemonConfig,
    context_dir: &Path,
) -> Result<Arc<dyn RuntimeAdapter>, CloudmeError> {
    match kind {
        RuntimeKind::Docker => {
            let runtime = DockerRuntime::connect(daemon, context_dir)?;
            info!(runtime = %kind, context = %context_dir.display(), "runtime selected");
            Ok(Arc::new(runtime))
        }
        RuntimeKind::Rkt => Err(CloudmeError::RuntimeInit(
            "rkt runtime is not supported yet".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("docker", RuntimeKind::Docker)]
    #[case("Docker", RuntimeKind::Docker)]
    #[case("rkt", RuntimeKind::Rkt)]
    fn parses_known_runtimes(#[case] raw: &str, #[case] expected: RuntimeKind) {
        assert_eq!(raw.parse::<RuntimeKind>().unwrap(), expected);
    }

    #[test]
    fn unknown_runtime_is_an_init_error() {
        let err = "podman".parse::<RuntimeKind>().unwrap_err();
        assert!(matches!(err, CloudmeError::RuntimeInit(_)));
    }

    #[test]
    fn rkt_is_declared_but_unavailable() {
        let daemon = DaemonConfig::new(Some("tcp://127.0.0.1:2375".into()), false, None);
        let err = connect(RuntimeKind::Rkt, &daemon, Path::new(".")).err().unwrap();
        assert!(err.to_string().contains("rkt"));
    }

    #[test]
    fn docker_driver_is_selected() {
        let daemon = DaemonConfig::new(Some("tcp://127.0.0.1:2375".into()), false, None);
        let runtime = connect(RuntimeKind::Docker, &daemon, Path::new(".")).unwrap();
        assert_eq!(runtime.name(), "docker");
    }
}
