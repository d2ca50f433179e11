use serde::{Deserialize, Serialize};
use std::fmt;

/// Branch lifecycle states tracked by the execution planner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchState {
    /// Branch is registered but not part of an active plan
    Idle,
    /// Branch is preparing resources before processing
    Initializing,
    /// Branch is currently executing
    Processing,
    /// Branch is blocked on an external signal
    Waiting,
    /// Branch finished successfully
    Completed,
    /// Branch failed; eligible for `retry_failed_branch`
    Error,
}

impl BranchState {
    /// Check if this state satisfies dependents (no further work expected)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }

    /// Check if this is an error state that may allow recovery
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error)
    }

    /// Check if this is an active state (branch is being processed)
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Initializing | Self::Processing | Self::Waiting)
    }

    /// Check if this state satisfies a dependency gate
    pub fn satisfies_dependencies(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl fmt::Display for BranchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Initializing => write!(f, "initializing"),
            Self::Processing => write!(f, "processing"),
            Self::Waiting => write!(f, "waiting"),
            Self::Completed => write!(f, "completed"),
            Self::Error => write!(f, "error"),
        }
    }
}

impl std::str::FromStr for BranchState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idle" => Ok(Self::Idle),
            "initializing" => Ok(Self::Initializing),
            "processing" => Ok(Self::Processing),
            "waiting" => Ok(Self::Waiting),
            "completed" => Ok(Self::Completed),
            "error" => Ok(Self::Error),
            _ => Err(format!("Invalid branch state: {s}")),
        }
    }
}

impl Default for BranchState {
    fn default() -> Self {
        Self::Idle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_check() {
        assert!(BranchState::Completed.is_terminal());
        assert!(BranchState::Error.is_terminal());
        assert!(!BranchState::Idle.is_terminal());
        assert!(!BranchState::Processing.is_terminal());
        assert!(!BranchState::Waiting.is_terminal());
    }

    #[test]
    fn test_dependency_satisfaction() {
        assert!(BranchState::Completed.satisfies_dependencies());
        assert!(!BranchState::Error.satisfies_dependencies());
        assert!(!BranchState::Processing.satisfies_dependencies());
    }

    #[test]
    fn test_state_string_conversion() {
        assert_eq!(BranchState::Processing.to_string(), "processing");
        assert_eq!(
            "completed".parse::<BranchState>().unwrap(),
            BranchState::Completed
        );
        assert!("running".parse::<BranchState>().is_err());
    }

    #[test]
    fn test_state_serde() {
        let json = serde_json::to_string(&BranchState::Initializing).unwrap();
        assert_eq!(json, "\"initializing\"");
        let parsed: BranchState = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, BranchState::Initializing);
    }
}
