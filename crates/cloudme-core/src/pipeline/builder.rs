//! CoordinatorBuilder - Coordinator の構築
//!
//! # 学習ポイント
//! - Builder パターン
//! - 起動時検証（Fail-fast 設計）: 0 秒の期限やポーリング間隔は拒否

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use super::Coordinator;
use crate::ports::RuntimeAdapter;
use crate::signal::WaitPolicy;

/// What to do with the remaining services when one stage fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Every service runs its own chain to the end; failures are reported.
    #[default]
    Continue,

    /// The first failed stage cancels everything still pending.
    FailFast,
}

/// Timing and failure settings for one coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// How dependents wait for their predecessor.
    pub wait: WaitPolicy,

    /// Upper bound for a single runtime adapter call.
    pub stage_timeout: Duration,

    pub failure_policy: FailurePolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            wait: WaitPolicy::default(),
            stage_timeout: Duration::from_secs(900),
            failure_policy: FailurePolicy::default(),
        }
    }
}

impl PipelineConfig {
    /// Deadline for a stage sitting `depth` links down its predecessor chain.
    ///
    /// Every predecessor's call is already bounded by `stage_timeout`, so the
    /// bound grows with the chain and `wait.timeout` is the slack on top.
    pub fn wait_deadline(&self, start: Instant, depth: u32) -> Instant {
        self.wait.deadline_from(start) + self.stage_timeout * depth
    }
}

/// BuilderError は Coordinator 構築時のエラー
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum BuilderError {
    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),
}

/// # 使用例
/// ```ignore
/// let coordinator = Coordinator::builder(runtime)
///     .wait_timeout(Duration::from_secs(120))
///     .failure_policy(FailurePolicy::FailFast)
///     .build()?;
/// ```
pub struct CoordinatorBuilder {
    runtime: Arc<dyn RuntimeAdapter>,
    config: PipelineConfig,
}

impl CoordinatorBuilder {
    pub fn new(runtime: Arc<dyn RuntimeAdapter>) -> Self {
        Self {
            runtime,
            config: PipelineConfig::default(),
        }
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.wait.poll_interval = interval;
        self
    }

    pub fn wait_timeout(mut self, timeout: Duration) -> Self {
        self.config.wait.timeout = timeout;
        self
    }

    pub fn stage_timeout(mut self, timeout: Duration) -> Self {
        self.config.stage_timeout = timeout;
        self
    }

    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.config.failure_policy = policy;
        self
    }

    pub fn build(self) -> Result<Coordinator, BuilderError> {
        let checks = [
            ("poll interval", self.config.wait.poll_interval),
            ("wait timeout", self.config.wait.timeout),
            ("stage timeout", self.config.stage_timeout),
        ];
        if let Some((name, _)) = checks.iter().find(|(_, d)| d.is_zero()) {
            return Err(BuilderError::ZeroDuration(*name));
        }
        Ok(Coordinator::new(self.runtime, self.config))
    }
}
