use serde::Serialize;

/// Whether a run is allowed to mutate the store or the records
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    #[default]
    DryRun,
    Live,
}

impl ExecutionMode {
    pub fn from_execute_flag(execute: bool) -> Self {
        if execute {
            ExecutionMode::Live
        } else {
            ExecutionMode::DryRun
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self, ExecutionMode::Live)
    }
}

impl std::fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionMode::DryRun => write!(f, "dry-run"),
            ExecutionMode::Live => write!(f, "live"),
        }
    }
}

/// Options shared by reconciliation runs
#[derive(Debug, Clone, Default)]
pub struct ReconcileConfig {
    /// Only objects whose path starts with this prefix are considered
    pub prefix: String,
    pub mode: ExecutionMode,
}

impl ReconcileConfig {
    pub fn new(prefix: impl Into<String>, mode: ExecutionMode) -> Self {
        Self {
            prefix: prefix.into(),
            mode,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_dry_run() {
        assert_eq!(ExecutionMode::default(), ExecutionMode::DryRun);
        assert!(!ReconcileConfig::default().mode.is_live());
    }

    #[test]
    fn test_execute_flag() {
        assert_eq!(ExecutionMode::from_execute_flag(true), ExecutionMode::Live);
        assert_eq!(ExecutionMode::from_execute_flag(false), ExecutionMode::DryRun);
        assert_eq!(ExecutionMode::Live.to_string(), "live");
    }
}
