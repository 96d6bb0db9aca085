// Copyright (c) 2024 Botho Foundation

//! Protocol parameters.
//!
//! Refund windows are constants: they decide how persisted state is read, so
//! every runtime over the same store must agree on them. Vote durations only
//! shape new requests and are tunable per node.

use nuoi_common::SECONDS_PER_DAY;
use serde::{Deserialize, Serialize};

/// Longest content reference accepted for metadata and evidence.
pub const MAX_REF_LEN: usize = 64;

/// Goal reached but no request made for this long: donors may refund.
pub const INACTIVITY_REFUND_SECS: i64 = 7 * SECONDS_PER_DAY;

/// Request approved but not executed for this long: donors may refund.
pub const UNEXECUTED_REFUND_SECS: i64 = 3 * SECONDS_PER_DAY;

fn default_vote_duration_secs() -> i64 {
    3 * SECONDS_PER_DAY
}

fn default_max_vote_duration_secs() -> i64 {
    30 * SECONDS_PER_DAY
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolParams {
    /// Applied when a request asks for a zero-length vote.
    #[serde(default = "default_vote_duration_secs")]
    pub default_vote_duration_secs: i64,

    #[serde(default = "default_max_vote_duration_secs")]
    pub max_vote_duration_secs: i64,
}

impl Default for ProtocolParams {
    fn default() -> Self {
        Self {
            default_vote_duration_secs: default_vote_duration_secs(),
            max_vote_duration_secs: default_max_vote_duration_secs(),
        }
    }
}

impl ProtocolParams {
    /// Resolve a requested vote duration, `0` meaning the default.
    pub fn vote_duration(&self, requested: i64) -> i64 {
        if requested == 0 {
            self.default_vote_duration_secs
        } else {
            requested
        }
    }
}
