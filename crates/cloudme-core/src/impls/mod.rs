//! Impls - RuntimeAdapter の実装
//!
//! # 含まれる実装
//! - **DockerRuntime**: Docker Engine API（TCP / mutual TLS）
//! - **ScriptedRuntime**: 開発・テスト用のダブル
//! - **HealthProbe**: verify で使う HTTP ポーリング

pub mod docker;
pub mod health;
pub mod scripted;

// 主要な型を再エクスポート
pub use self::docker::DockerRuntime;
pub use self::health::HealthProbe;
pub use self::scripted::{Call, ScriptedRuntime};
