//! Coalescing cache error types

use std::sync::Arc;

use thiserror::Error;

/// Errors from a coalesced call.
///
/// `Clone` so one failed flight can be fanned out to every caller that was
/// sharing it.
#[derive(Debug, Clone, Error)]
pub enum CoalesceError {
    /// The shared producer call failed. Every caller awaiting that flight
    /// receives the same underlying report.
    #[error("producer failed: {0}")]
    Producer(Arc<eyre::Report>),

    /// The default request-key derivation could not serialize the
    /// arguments.
    #[error("request key derivation failed: {0}")]
    Key(Arc<serde_json::Error>),
}

impl CoalesceError {
    /// The producer failure report, if that is what this error is.
    pub fn producer_error(&self) -> Option<&eyre::Report> {
        match self {
            CoalesceError::Producer(report) => Some(report),
            CoalesceError::Key(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_producer_error_accessor() {
        let err = CoalesceError::Producer(Arc::new(eyre::eyre!("boom")));
        assert!(err.producer_error().is_some());
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn test_clones_share_the_report() {
        let err = CoalesceError::Producer(Arc::new(eyre::eyre!("boom")));
        let cloned = err.clone();

        match (&err, &cloned) {
            (CoalesceError::Producer(a), CoalesceError::Producer(b)) => {
                assert!(Arc::ptr_eq(a, b));
            }
            _ => panic!("expected producer errors"),
        }
    }
}
