use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("store error: {0}")]
    Store(String),

    #[error("record not found: {0}")]
    NotFound(String),

    #[error("bus error: {0}")]
    Bus(String),

    #[error("subscription to '{0}' closed")]
    SubscriptionClosed(String),

    #[error("classifier timed out after {0:?}")]
    ClassifierTimeout(Duration),

    #[error("classifier error: {0}")]
    Classifier(String),

    #[error("malformed classifier response: {0}")]
    MalformedClassification(String),

    #[error("malformed event payload: {0}")]
    MalformedEvent(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AnalyzerError {
    /// `true` for collaborator failures that may succeed on the next trigger
    /// (next bus message, next detector tick, next supervisor restart).
    ///
    /// Malformed input and missing records are not transient: retrying the
    /// same input produces the same failure.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            AnalyzerError::Store(_)
            | AnalyzerError::Bus(_)
            | AnalyzerError::SubscriptionClosed(_)
            | AnalyzerError::ClassifierTimeout(_)
            | AnalyzerError::Classifier(_) => true,
            AnalyzerError::NotFound(_)
            | AnalyzerError::MalformedClassification(_)
            | AnalyzerError::MalformedEvent(_)
            | AnalyzerError::Json(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collaborator_outages_are_transient() {
        assert!(AnalyzerError::Store("down".to_owned()).is_transient());
        assert!(AnalyzerError::Bus("down".to_owned()).is_transient());
        assert!(AnalyzerError::ClassifierTimeout(Duration::from_secs(1)).is_transient());
    }

    #[test]
    fn bad_input_is_not_transient() {
        assert!(!AnalyzerError::MalformedEvent("no subject".to_owned()).is_transient());
        assert!(!AnalyzerError::NotFound("t-1".to_owned()).is_transient());
        let json_err = serde_json::from_str::<()>("{").unwrap_err();
        assert!(!AnalyzerError::from(json_err).is_transient());
    }
}
