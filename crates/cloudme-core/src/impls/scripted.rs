//! ScriptedRuntime - 台本どおりに振る舞う RuntimeAdapter
//!
//! 開発・テスト用。ステージ × サービスごとに「成功 / 失敗 / 停止」と
//! 所要時間を指定し、呼び出し履歴を記録します。

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::domain::{ApplicationDescriptor, MicroserviceDescriptor, Stage};
use crate::error::CloudmeError;
use crate::ports::RuntimeAdapter;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Behavior {
    Succeed,
    Fail(String),
    /// Never returns.
    Hang,
}

/// One recorded adapter call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub stage: Stage,
    pub service: String,
    pub started: Instant,
    pub finished: Instant,
}

/// Test double that records every call.
///
/// # 使用例
/// ```ignore
/// let runtime = ScriptedRuntime::new()
///     .with_delay(Duration::from_millis(100))
///     .fail(Stage::Build, "api", "daemon said no");
/// ```
#[derive(Debug, Default)]
pub struct ScriptedRuntime {
    behaviors: HashMap<(Stage, String), Behavior>,
    delays: HashMap<(Stage, String), Duration>,
    default_delay: Duration,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay applied to every call without a specific one.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.default_delay = delay;
        self
    }

    pub fn delay(mut self, stage: Stage, service: &str, delay: Duration) -> Self {
        self.delays.insert((stage, service.to_string()), delay);
        self
    }

    pub fn fail(mut self, stage: Stage, service: &str, message: &str) -> Self {
        self.behaviors
            .insert((stage, service.to_string()), Behavior::Fail(message.to_string()));
        self
    }

    pub fn hang(mut self, stage: Stage, service: &str) -> Self {
        self.behaviors
            .insert((stage, service.to_string()), Behavior::Hang);
        self
    }

    /// Completed calls in completion order.
    pub async fn calls(&self) -> Vec<Call> {
        self.calls.lock().await.clone()
    }

    pub async fn count(&self, stage: Stage, service: &str) -> usize {
        self.calls
            .lock()
            .await
            .iter()
            .filter(|c| c.stage == stage && c.service == service)
            .count()
    }

    pub async fn call(&self, stage: Stage, service: &str) -> Option<Call> {
        self.calls
            .lock()
            .await
            .iter()
            .find(|c| c.stage == stage && c.service == service)
            .cloned()
    }

    async fn perform(&self, stage: Stage, service: &str) -> Result<(), CloudmeError> {
        let key = (stage, service.to_string());
        let started = Instant::now();

        let behavior = self.behaviors.get(&key).cloned().unwrap_or(Behavior::Succeed);
        if behavior == Behavior::Hang {
            std::future::pending::<()>().await;
        }

        let delay = self.delays.get(&key).copied().unwrap_or(self.default_delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        self.calls.lock().await.push(Call {
            stage,
            service: service.to_string(),
            started,
            finished: Instant::now(),
        });

        match behavior {
            Behavior::Fail(message) => Err(CloudmeError::stage(stage, service, message)),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl RuntimeAdapter for ScriptedRuntime {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn build(
        &self,
        service: &MicroserviceDescriptor,
        _app: &ApplicationDescriptor,
    ) -> Result<(), CloudmeError> {
        self.perform(Stage::Build, &service.name).await
    }

    async fn run(
        &self,
        service: &MicroserviceDescriptor,
        _app: &ApplicationDescriptor,
    ) -> Result<(), CloudmeError> {
        self.perform(Stage::Run, &service.name).await
    }

    async fn verify(
        &self,
        service: &MicroserviceDescriptor,
        _app: &ApplicationDescriptor,
    ) -> Result<(), CloudmeError> {
        self.perform(Stage::Verify, &service.name).await
    }

    async fn delete(
        &self,
        service: &MicroserviceDescriptor,
        _app: &ApplicationDescriptor,
    ) -> Result<(), CloudmeError> {
        self.perform(Stage::Delete, &service.name).await
    }
}
