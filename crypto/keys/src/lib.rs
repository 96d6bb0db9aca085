// Copyright (c) 2024 Botho Foundation

//! Identities and the signing authority.
//!
//! Every participant and every protocol entity is named by a 32-byte
//! [`Pubkey`]. Participants hold an ed25519 [`Keypair`]; protocol entities
//! live at derived addresses that no keypair can sign for.

mod error;
mod keypair;
mod pubkey;
mod signature;

pub use error::KeyError;
pub use keypair::{Keypair, Signer};
pub use pubkey::{Pubkey, PUBKEY_BYTES};
pub use signature::{Signature, SIGNATURE_BYTES};
