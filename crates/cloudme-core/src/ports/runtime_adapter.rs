//! RuntimeAdapter port - コンテナエンジンの操作
//!
//! # 実装
//! - **DockerRuntime**: Docker Engine API（本番用）
//! - **ScriptedRuntime**: 結果を台本で決めるテスト用ダブル
//! - rkt: 宣言のみ（未実装）

use async_trait::async_trait;

use crate::domain::{ApplicationDescriptor, MicroserviceDescriptor, Stage};
use crate::error::CloudmeError;

/// RuntimeAdapter は 1 サービス単位で build/run/verify/delete を実行
///
/// # Thread Safety
/// - 複数タスクから同時に呼ばれる（`Send + Sync`）
/// - 外部 API に対する排他はドライバ側の責任
#[async_trait]
pub trait RuntimeAdapter: Send + Sync {
    /// Short engine identifier ("docker", ...).
    fn name(&self) -> &'static str;

    /// Package the build context and build the service image.
    async fn build(
        &self,
        service: &MicroserviceDescriptor,
        app: &ApplicationDescriptor,
    ) -> Result<(), CloudmeError>;

    /// Start (or replace) the service container.
    async fn run(
        &self,
        service: &MicroserviceDescriptor,
        app: &ApplicationDescriptor,
    ) -> Result<(), CloudmeError>;

    /// Resolve the service's health within a bounded time.
    async fn verify(
        &self,
        service: &MicroserviceDescriptor,
        app: &ApplicationDescriptor,
    ) -> Result<(), CloudmeError>;

    /// Remove the service container. Absence is not an error.
    async fn delete(
        &self,
        service: &MicroserviceDescriptor,
        app: &ApplicationDescriptor,
    ) -> Result<(), CloudmeError>;

    /// Dispatch by stage.
    async fn execute(
        &self,
        stage: Stage,
        service: &MicroserviceDescriptor,
        app: &ApplicationDescriptor,
    ) -> Result<(), CloudmeError> {
        match stage {
            Stage::Build => self.build(service, app).await,
            Stage::Run => self.run(service, app).await,
            Stage::Verify => self.verify(service, app).await,
            Stage::Delete => self.delete(service, app).await,
        }
    }
}
