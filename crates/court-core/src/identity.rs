//! # Identity Newtypes
//!
//! Court entities are addressed by opaque integers assigned monotonically
//! from zero. Parties, jurors and subjects are addressed by [`AccountId`].

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Identifier of a dispute, assigned sequentially from 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DisputeId(pub u64);

/// Index of a round within its dispute, starting at 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoundId(pub u64);

/// Sequential term number. Term 0 precedes genesis.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct TermId(pub u64);

/// Identifier of the commit-reveal vote backing one round.
///
/// Packs the dispute id into the high 64 bits and the round index into the
/// low 64 bits, so every round owns exactly one vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VoteId(pub u128);

/// A party, juror, or arbitrable subject.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountId(String);

impl DisputeId {
    /// Access the raw integer.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl RoundId {
    /// Access the raw integer.
    pub fn get(self) -> u64 {
        self.0
    }

    /// The round that follows this one.
    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// The round before this one, if any.
    pub fn previous(self) -> Option<Self> {
        self.0.checked_sub(1).map(Self)
    }

    /// Position of the round in its dispute's round list.
    pub fn index(self) -> usize {
        usize::try_from(self.0).unwrap_or(usize::MAX)
    }
}

impl TermId {
    /// The pre-genesis term.
    pub const ZERO: Self = Self(0);

    /// Access the raw integer.
    pub fn get(self) -> u64 {
        self.0
    }

    /// The term immediately after this one.
    pub fn next(self) -> Self {
        self.plus(1)
    }

    /// The term `terms` after this one.
    pub fn plus(self, terms: u64) -> Self {
        Self(self.0.saturating_add(terms))
    }

    /// Number of terms from `earlier` to `self`, zero if `earlier` is later.
    pub fn since(self, earlier: TermId) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl VoteId {
    /// The vote backing `round` of `dispute`.
    pub fn for_round(dispute: DisputeId, round: RoundId) -> Self {
        Self((u128::from(dispute.0) << 64) | u128::from(round.0))
    }

    /// The dispute this vote belongs to.
    pub fn dispute(self) -> DisputeId {
        DisputeId((self.0 >> 64) as u64)
    }

    /// The round this vote belongs to.
    pub fn round(self) -> RoundId {
        RoundId((self.0 & u128::from(u64::MAX)) as u64)
    }
}

impl AccountId {
    /// Create an account identifier, rejecting blank or whitespace-padded input.
    pub fn new(value: impl Into<String>) -> Result<Self, CoreError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(CoreError::InvalidAccount {
                value,
                reason: "must not be blank",
            });
        }
        if value.trim() != value {
            return Err(CoreError::InvalidAccount {
                value,
                reason: "must not carry surrounding whitespace",
            });
        }
        Ok(Self(value))
    }

    /// Access the identifier string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for AccountId {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<AccountId> for String {
    fn from(id: AccountId) -> Self {
        id.0
    }
}

impl std::fmt::Display for DisputeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "dispute:{}", self.0)
    }
}

impl std::fmt::Display for RoundId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "round:{}", self.0)
    }
}

impl std::fmt::Display for TermId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "term:{}", self.0)
    }
}

impl std::fmt::Display for VoteId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "vote:{}/{}", self.dispute().0, self.round().0)
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
