//! Tagged command outcomes.
//!
//! Every lifecycle operation returns a tagged value instead of raising:
//! `Outcome::Ok(payload)` or `Outcome::Invalid(detail)`, where the detail is a
//! per-command error enum so callers can render distinct messages. Withdraw is
//! the single three-way outcome (`WithdrawOutcome`) because "has supports" is a
//! user-facing condition, not a validation error. Infrastructure failures
//! travel separately as `anyhow::Error`.

use serde::{Deserialize, Serialize};

use crate::common::FictionId;

/// Two-way tagged result returned by most commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T, E> {
    /// The operation ran and produced a payload.
    Ok(T),
    /// The operation refused; the detail says why.
    Invalid(E),
}

impl<T, E> Outcome<T, E> {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, Self::Invalid(_))
    }

    /// Returns the payload, discarding the invalid detail.
    pub fn ok(self) -> Option<T> {
        match self {
            Self::Ok(value) => Some(value),
            Self::Invalid(_) => None,
        }
    }

    /// Returns the invalid detail, discarding the payload.
    pub fn invalid(self) -> Option<E> {
        match self {
            Self::Ok(_) => None,
            Self::Invalid(detail) => Some(detail),
        }
    }
}

/// Per-fiction partition reported by batch commands.
///
/// Batch commands never abort on a single fiction: each fiction either lands
/// in `successful` or in `errored`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchReport {
    pub successful: Vec<FictionId>,
    pub errored: Vec<FictionId>,
}

impl BatchReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn succeed(&mut self, id: FictionId) {
        self.successful.push(id);
    }

    pub fn fail(&mut self, id: FictionId) {
        self.errored.push(id);
    }

    pub fn is_empty(&self) -> bool {
        self.successful.is_empty() && self.errored.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_accessors() {
        let ok: Outcome<i32, &str> = Outcome::Ok(7);
        assert!(ok.is_ok());
        assert_eq!(ok.ok(), Some(7));

        let invalid: Outcome<i32, &str> = Outcome::Invalid("nope");
        assert!(invalid.is_invalid());
        assert_eq!(invalid.invalid(), Some("nope"));
    }

    #[test]
    fn batch_report_partitions() {
        let mut report = BatchReport::new();
        assert!(report.is_empty());

        report.succeed(FictionId::new());
        report.fail(FictionId::new());
        assert_eq!(report.successful.len(), 1);
        assert_eq!(report.errored.len(), 1);
    }
}
