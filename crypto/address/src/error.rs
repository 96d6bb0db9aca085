// Copyright (c) 2024 Botho Foundation

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeriveError {
    #[error("Too many seeds: {count} (max {max})")]
    TooManySeeds { count: usize, max: usize },

    #[error("Seed {index} is {len} bytes (max {max})")]
    SeedTooLong { index: usize, len: usize, max: usize },

    /// The digest for this exact bump is a curve point.
    #[error("Derived digest lies on the ed25519 curve")]
    OnCurve,

    /// Every bump from 255 to 0 produced a curve point. Never expected in
    /// practice; treated as a broken program id or seed layout.
    #[error("No bump in 0..=255 yields an off-curve address")]
    NoViableBump,
}
