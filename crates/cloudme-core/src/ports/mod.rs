//! Ports - 抽象化レイヤー
//!
//! コンテナエンジンへのインターフェースを trait として定義し、
//! Coordinator は具体的なドライバ（Docker など）を知らずに動きます。
//!
//! # 設計原則
//! - ドライバは起動時に 1 つだけ構築し、`Arc<dyn RuntimeAdapter>` で渡す
//! - グローバルな可変状態は持たない
//! - テストでは `impls::ScriptedRuntime` に差し替える

pub mod runtime_adapter;

pub use self::runtime_adapter::RuntimeAdapter;
