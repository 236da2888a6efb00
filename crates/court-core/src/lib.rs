//! # court-core — Foundational Types for the Staked-Juror Court
//!
//! This crate defines the primitives shared by every other crate in the
//! workspace. It depends on nothing internal.
//!
//! ## Modules
//!
//! - **identity**: `DisputeId`, `RoundId`, `TermId`, `VoteId`, `AccountId`.
//!   Opaque, monotonically assigned integers for court entities; validated
//!   strings for accounts. No bare integers cross crate boundaries.
//!
//! - **amount**: `Amount`, a checked `u128` token quantity with
//!   permyriad helpers (`PCT_BASE = 10_000`).
//!
//! - **outcome**: `Outcome`, the vote/ruling encoding shared by voting and
//!   adjudication (`missing`, `leaked`, `refused`, ruling options).
//!
//! - **temporal**: `Timestamp`, UTC seconds-precision instants.
//!
//! - **digest**: `Seed` and the SHA-256 helper every derived seed and
//!   commitment flows through.
//!
//! - **config**: `GenesisConfig` and `CourtConfig` with validation.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `court-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod amount;
pub mod config;
pub mod digest;
pub mod error;
pub mod identity;
pub mod outcome;
pub mod temporal;

pub use amount::{Amount, PCT_BASE};
pub use config::{
    CollateralConfig, CourtConfig, DisputesConfig, FeesConfig, GenesisConfig, PenaltiesConfig,
    TermsConfig,
};
pub use digest::{sha256, Seed};
pub use error::CoreError;
pub use identity::{AccountId, DisputeId, RoundId, TermId, VoteId};
pub use outcome::Outcome;
pub use temporal::Timestamp;
