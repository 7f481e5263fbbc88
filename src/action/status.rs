//! Action Status Codes

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Context variable holding an action's status code.
pub const STATUS_CODE: &str = "StatusCode";

/// Context variable holding an action's status reason.
pub const STATUS_REASON: &str = "StatusReason";

/// Lifecycle status of an action.
///
/// Transitions: `Pending → Running → Complete | Failed`. A skipped action
/// is `Complete` with a distinct reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusCode {
    /// Not started yet
    Pending,
    /// Started, waiting for asynchronous completion
    Running,
    /// Finished successfully (or skipped)
    Complete,
    /// Finished with an error
    Failed,
}

impl StatusCode {
    /// The string persisted in the context.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Complete => "complete",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatusCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "running" => Ok(Self::Running),
            "complete" => Ok(Self::Complete),
            "failed" => Ok(Self::Failed),
            other => Err(format!("Invalid status code: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_strings() {
        for code in [
            StatusCode::Pending,
            StatusCode::Running,
            StatusCode::Complete,
            StatusCode::Failed,
        ] {
            assert_eq!(code.as_str().parse::<StatusCode>().unwrap(), code);
        }
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("COMPLETE".parse::<StatusCode>().unwrap(), StatusCode::Complete);
        assert!("skipped".parse::<StatusCode>().is_err());
    }
}
