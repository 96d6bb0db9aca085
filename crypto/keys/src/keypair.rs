// Copyright (c) 2024 Botho Foundation

//! Local signing authority.

use ed25519_dalek::{Signer as _, SigningKey, SECRET_KEY_LENGTH};
use rand_core::OsRng;
use std::fmt;

use crate::{KeyError, Pubkey, Signature};

/// Something that can authorize a prepared message on behalf of an identity.
///
/// Wallet adapters and remote signers implement this; the protocol only ever
/// sees the resulting `(pubkey, signature)` pair.
pub trait Signer {
    fn pubkey(&self) -> Pubkey;
    fn sign_message(&self, message: &[u8]) -> Signature;
}

/// An ed25519 keypair held in process.
pub struct Keypair {
    signing: SigningKey,
}

impl Keypair {
    /// Generate a fresh keypair from the OS RNG.
    pub fn generate() -> Self {
        Self {
            signing: SigningKey::generate(&mut OsRng),
        }
    }

    /// Deterministic keypair from a 32-byte secret seed.
    pub fn from_seed(seed: &[u8; SECRET_KEY_LENGTH]) -> Self {
        Self {
            signing: SigningKey::from_bytes(seed),
        }
    }

    /// Parse the hex-encoded secret seed written by [`Keypair::to_hex`].
    pub fn from_hex(s: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(s.trim()).map_err(|e| KeyError::InvalidHex(e.to_string()))?;
        let seed: [u8; SECRET_KEY_LENGTH] =
            bytes.as_slice().try_into().map_err(|_| KeyError::InvalidLength {
                expected: SECRET_KEY_LENGTH,
                actual: bytes.len(),
            })?;
        Ok(Self::from_seed(&seed))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.signing.to_bytes())
    }
}

impl Signer for Keypair {
    fn pubkey(&self) -> Pubkey {
        Pubkey::new_from_array(self.signing.verifying_key().to_bytes())
    }

    fn sign_message(&self, message: &[u8]) -> Signature {
        Signature::new(self.signing.sign(message).to_bytes())
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keypair")
            .field("pubkey", &self.pubkey())
            .finish_non_exhaustive()
    }
}
