//! cloudme-core
//!
//! Descriptor-driven build / run / verify / delete of a microservice
//! application against a container runtime.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（descriptor, stage, outcome, ids）
//! - **signal**: ステージ間の one-shot 結果受け渡し（slot と registry）
//! - **pipeline**: Coordinator と実行レポート
//! - **ports**: 抽象化レイヤー（RuntimeAdapter）
//! - **impls**: 実装（DockerRuntime, ScriptedRuntime, HealthProbe）
//! - **packager**: build context の tar 化
//! - **config / runtime**: daemon 接続設定とランタイム選択
//! - **observability**: tracing 初期化と集計

pub mod config;
pub mod domain;
pub mod error;
pub mod impls;
pub mod observability;
pub mod packager;
pub mod pipeline;
pub mod ports;
pub mod runtime;
pub mod signal;

pub use error::CloudmeError;
pub use pipeline::{Coordinator, FailurePolicy, PipelineReport};
pub use runtime::RuntimeKind;
