// Copyright (c) 2024 Botho Foundation

//! Shared building blocks for the nuoi escrow workspace.
//!
//! Everything here is protocol-agnostic: the scalar aliases used for money
//! and time, the [`Clock`] abstraction the runtime reads `now` from, and the
//! tracing subscriber setup used by binaries and tests.

pub mod logger;
pub mod time;

pub use time::{Clock, ManualClock, SystemClock, SECONDS_PER_DAY};

/// Amount in the smallest transferable unit.
pub type Amount = u64;

/// Signed Unix time in seconds.
pub type UnixTimestamp = i64;
