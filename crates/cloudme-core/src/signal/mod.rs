//! Signal - ステージ間の結果受け渡し
//!
//! 各ステージは entity key（build は image、run/verify/delete は service 名）
//! ごとに one-shot の slot を持ちます。
//!
//! # 不変条件
//! - slot への publish は高々 1 回
//! - slot がまだ無いことは「前段が未開始」であり、失敗ではない
//! - 完了済み slot の読み出しは何度でも同じ値を即座に返す
//! - 待機には期限と CancellationToken が必ず付く

mod registry;
mod slot;

pub use registry::{SignalRegistry, Signals, WaitPolicy};
pub use slot::{Slot, SlotPublisher};

use thiserror::Error;

use crate::domain::Stage;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignalError {
    #[error("{stage} slot for {key} already exists and is unpublished")]
    SlotExists { stage: Stage, key: String },

    #[error("{stage} slot for {key} was already published")]
    AlreadyPublished { stage: Stage, key: String },

    #[error("no {stage} slot for {key}")]
    UnknownSlot { stage: Stage, key: String },

    #[error("timed out waiting for {stage} of {key}")]
    Timeout { stage: Stage, key: String },

    #[error("cancelled while waiting for {stage} of {key}")]
    Cancelled { stage: Stage, key: String },
}
