//! Error types for the verification harness

use thiserror::Error;

/// Result type alias using the harness error
pub type HarnessResult<T> = std::result::Result<T, HarnessError>;

#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("Server failed to start: {0}")]
    ServerStartup(String),

    #[error("Server health check failed after {0} attempts")]
    ServerHealthCheck(usize),

    #[error("Browser launch failed: {0}")]
    BrowserLaunch(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Element present but not rendered: {0}")]
    ElementNotVisible(String),

    #[error("Element never became interactive: {selector} (waited {waited_ms}ms)")]
    ElementNeverReady { selector: String, waited_ms: u64 },

    #[error("Condition not satisfied before deadline: {condition} (last observed: {last_observed})")]
    ConditionTimeout {
        condition: String,
        last_observed: String,
    },

    #[error("No reliable indicator exists for: {0}")]
    UnsupportedIndicator(String),

    #[error("Alias read before first capture: {0}")]
    AliasUnset(String),

    #[error("Fixture load failed: {name}: {reason}")]
    FixtureLoad { name: String, reason: String },

    #[error("Invalid scenario state transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Input dispatch error: {0}")]
    InputDispatch(String),

    #[error("Session error: {0}")]
    Session(#[from] chromiumoxide::error::CdpError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl HarnessError {
    /// Whether this error is an assertion miss (the condition under test was
    /// never observed) rather than a harness fault. Assertion misses surface
    /// as `Failed`; everything else aborts the scenario as `Errored`.
    pub fn is_assertion(&self) -> bool {
        matches!(self, HarnessError::ConditionTimeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn condition_timeout_is_assertion_class() {
        let err = HarnessError::ConditionTimeout {
            condition: "align attribute".into(),
            last_observed: "left".into(),
        };
        assert!(err.is_assertion());
    }

    #[test]
    fn harness_faults_are_not_assertion_class() {
        assert!(!HarnessError::ElementNotFound("#AlignLeft".into()).is_assertion());
        assert!(!HarnessError::FixtureLoad {
            name: "alignment_options.ods".into(),
            reason: "missing".into(),
        }
        .is_assertion());
        assert!(!HarnessError::AliasUnset("currentTextPos".into()).is_assertion());
    }
}
