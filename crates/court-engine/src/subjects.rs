//! # Subjects and Eligibility
//!
//! The arbitrable subject that raised a dispute learns the final ruling
//! through [`Arbitrable::rule`], exactly once. Dispute creation is gated on
//! the subject being up to date with its court subscription.

use std::collections::BTreeSet;
use std::sync::Arc;

use court_core::{AccountId, DisputeId, Outcome};
use parking_lot::Mutex;

/// Receiver of final rulings.
pub trait Arbitrable {
    fn rule(&mut self, subject: &AccountId, dispute: DisputeId, ruling: Outcome);
}

/// Subscription check applied at dispute creation.
pub trait EligibilityGate {
    fn is_up_to_date(&self, subject: &AccountId) -> bool;
}

/// A delivered ruling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RulingNotice {
    pub subject: AccountId,
    pub dispute: DisputeId,
    pub ruling: Outcome,
}

/// Shared log of delivered rulings; clones observe the same log.
#[derive(Debug, Clone, Default)]
pub struct RulingRecorder {
    notices: Arc<Mutex<Vec<RulingNotice>>>,
}

impl RulingRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<RulingNotice> {
        self.notices.lock().clone()
    }

    /// Rulings delivered for `dispute`.
    pub fn rulings_for(&self, dispute: DisputeId) -> Vec<Outcome> {
        self.notices
            .lock()
            .iter()
            .filter(|n| n.dispute == dispute)
            .map(|n| n.ruling)
            .collect()
    }
}

impl Arbitrable for RulingRecorder {
    fn rule(&mut self, subject: &AccountId, dispute: DisputeId, ruling: Outcome) {
        self.notices.lock().push(RulingNotice {
            subject: subject.clone(),
            dispute,
            ruling,
        });
    }
}

/// Eligibility by roster: subjects are up to date unless marked overdue.
#[derive(Debug, Clone, Default)]
pub struct SubscriptionRoster {
    overdue: Arc<Mutex<BTreeSet<AccountId>>>,
}

impl SubscriptionRoster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_overdue(&self, subject: &AccountId, overdue: bool) {
        let mut set = self.overdue.lock();
        if overdue {
            set.insert(subject.clone());
        } else {
            set.remove(subject);
        }
    }
}

impl EligibilityGate for SubscriptionRoster {
    fn is_up_to_date(&self, subject: &AccountId) -> bool {
        !self.overdue.lock().contains(subject)
    }
}
