//! # Vote Outcomes
//!
//! One byte encodes every value a juror's vote or a dispute ruling can take:
//!
//! | Code | Meaning |
//! |------|---------|
//! | 0 | missing (not yet voted / ruling unset) |
//! | 1 | leaked (commitment exposed during the commit phase) |
//! | 2 | refused (explicit refusal; also the ruling of a round with no votes) |
//! | 3.. | ruling options, one per possible ruling |

use serde::{Deserialize, Serialize};

/// A vote outcome or dispute ruling.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Outcome(pub u8);

impl Outcome {
    pub const MISSING: Self = Self(0);
    pub const LEAKED: Self = Self(1);
    pub const REFUSED: Self = Self(2);

    /// The `n`-th ruling option, counting from 1.
    pub fn option(n: u8) -> Self {
        Self(Self::REFUSED.0.saturating_add(n))
    }

    /// Highest outcome code valid for a dispute with `possible_rulings` options.
    pub fn max_for(possible_rulings: u8) -> Self {
        Self::option(possible_rulings)
    }

    /// Whether this outcome may be revealed, appealed or confirmed in a
    /// dispute with `possible_rulings` options: refused or one of the options.
    pub fn is_valid_ruling(self, possible_rulings: u8) -> bool {
        self >= Self::REFUSED && self <= Self::max_for(possible_rulings)
    }

    /// Raw byte, as hashed into commitments.
    pub fn as_u8(self) -> u8 {
        self.0
    }

    pub fn is_missing(self) -> bool {
        self == Self::MISSING
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Self::MISSING => f.write_str("missing"),
            Self::LEAKED => f.write_str("leaked"),
            Self::REFUSED => f.write_str("refused"),
            Self(code) => write!(f, "ruling#{}", code - Self::REFUSED.0),
        }
    }
}
