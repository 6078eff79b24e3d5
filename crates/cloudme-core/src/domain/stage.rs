//! Stage - マイクロサービスのデプロイ段階
//!
//! # 段階の順序（1サービス内）
//! - Build -> Run -> Verify
//! - Delete は単独で実行（前段なし）

use std::fmt;

use serde::{Deserialize, Serialize};

/// A phase in a microservice's deployment lifecycle.
///
/// Using an enum keeps the predecessor table exhaustive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Build,
    Run,
    Verify,
    Delete,
}

impl Stage {
    pub const ALL: [Stage; 4] = [Stage::Build, Stage::Run, Stage::Verify, Stage::Delete];

    /// The stage whose outcome must be known before this one may start.
    pub fn predecessor(self) -> Option<Stage> {
        match self {
            Stage::Build | Stage::Delete => None,
            Stage::Run => Some(Stage::Build),
            Stage::Verify => Some(Stage::Run),
        }
    }

    /// Does this stage key its signal slot by image reference (vs service name)?
    pub fn keyed_by_image(self) -> bool {
        matches!(self, Stage::Build)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Build => "build",
            Stage::Run => "run",
            Stage::Verify => "verify",
            Stage::Delete => "delete",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
