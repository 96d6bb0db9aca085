// Copyright (c) 2024 Botho Foundation

//! Derived addresses.
//!
//! Every escrow entity lives at an address computed from a namespace tag and
//! typed seeds:
//!
//! ```text
//! address = sha256(tag ‖ seeds… ‖ [bump] ‖ program_id ‖ "ProgramDerivedAddress")
//! ```
//!
//! `bump` is searched downward from 255 until the digest is *not* the
//! encoding of an ed25519 curve point. Such an address has no private key,
//! so only protocol logic that can reproduce the seeds can act for it, and
//! anybody holding the seeds can find it again without a lookup table.

mod derive;
mod deriver;
mod error;

pub use derive::{
    create_program_address, find_program_address, is_on_curve, DerivedAddress, MAX_SEEDS,
    MAX_SEED_LEN, PDA_MARKER,
};
pub use deriver::{AddressDeriver, Namespace};
pub use error::DeriveError;
