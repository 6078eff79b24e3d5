//! Pipeline - build / run / verify / delete の並行オーケストレーション
//!
//! # 構成
//! - **Coordinator**: (service, stage) ごとのタスクを起動して join する
//! - **CoordinatorBuilder**: 待機時間・失敗ポリシーの設定
//! - **PipelineReport**: サービス × ステージの結果

mod builder;
mod coordinator;
mod report;

pub use builder::{BuilderError, CoordinatorBuilder, FailurePolicy, PipelineConfig};
pub use coordinator::Coordinator;
pub use report::{PipelineReport, ServiceReport};

use crate::domain::{MicroserviceDescriptor, Stage};

/// Signal key of `service` in `stage`: the image reference for build,
/// the service name otherwise.
pub(crate) fn slot_key(stage: Stage, service: &MicroserviceDescriptor) -> &str {
    if stage.keyed_by_image() {
        &service.image
    } else {
        &service.name
    }
}
