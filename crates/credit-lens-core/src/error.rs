use thiserror::Error;

use crate::credit::Bureau;

/// Failure to obtain a canonical report from a single bureau.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BureauError {
    #[error("{bureau} endpoint unavailable: {message}")]
    Transport { bureau: Bureau, message: String },
    #[error("{bureau} returned a malformed response: {reason}")]
    MalformedResponse { bureau: Bureau, reason: String },
}

impl BureauError {
    pub fn transport(bureau: Bureau, message: impl Into<String>) -> Self {
        Self::Transport {
            bureau,
            message: message.into(),
        }
    }

    pub fn malformed(bureau: Bureau, reason: impl Into<String>) -> Self {
        Self::MalformedResponse {
            bureau,
            reason: reason.into(),
        }
    }

    pub fn bureau(&self) -> Bureau {
        match self {
            Self::Transport { bureau, .. } | Self::MalformedResponse { bureau, .. } => *bureau,
        }
    }
}

/// Loan purpose key outside the fixed weight table.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown loan purpose `{0}` (expected one of personal, business, home, car, education)")]
pub struct InvalidLoanPurpose(pub String);

/// Reasons an aggregation attempt produced no new report set.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AggregationError {
    #[error(transparent)]
    InvalidLoanPurpose(#[from] InvalidLoanPurpose),
    /// At least one bureau failed; nothing derived from the others is published.
    #[error("aggregation failed: {} of 4 bureaus unavailable ({})", missing.len(), describe(failures))]
    Incomplete {
        available: Vec<Bureau>,
        missing: Vec<Bureau>,
        failures: Vec<BureauError>,
    },
    /// A newer request wrote the snapshot first; this attempt's outcome was discarded.
    #[error("aggregation superseded by a newer request")]
    Superseded,
}

fn describe(failures: &[BureauError]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incomplete_message_lists_each_failure() {
        let err = AggregationError::Incomplete {
            available: vec![Bureau::Cibil, Bureau::Experian, Bureau::Equifax],
            missing: vec![Bureau::CrifHighmark],
            failures: vec![BureauError::transport(Bureau::CrifHighmark, "connection refused")],
        };
        let message = err.to_string();
        assert!(message.contains("1 of 4"));
        assert!(message.contains("CRIF Highmark endpoint unavailable: connection refused"));
    }

    #[test]
    fn bureau_is_reported_for_both_variants() {
        assert_eq!(
            BureauError::transport(Bureau::Equifax, "timeout").bureau(),
            Bureau::Equifax
        );
        assert_eq!(
            BureauError::malformed(Bureau::Cibil, "missing score").bureau(),
            Bureau::Cibil
        );
    }
}
