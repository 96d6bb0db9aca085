// Copyright (c) 2024 Botho Foundation

use curve25519_dalek::edwards::CompressedEdwardsY;
use nuoi_crypto_keys::Pubkey;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::DeriveError;

/// Maximum number of seeds, bump included.
pub const MAX_SEEDS: usize = 16;

/// Maximum length of a single seed.
pub const MAX_SEED_LEN: usize = 32;

/// Domain separator appended after the program id.
pub const PDA_MARKER: &[u8] = b"ProgramDerivedAddress";

/// An address together with the bump that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DerivedAddress {
    pub address: Pubkey,
    pub bump: u8,
}

/// True when `bytes` decompress to a point on the ed25519 curve, i.e. when
/// some private key could in principle sign for them.
pub fn is_on_curve(bytes: &[u8; 32]) -> bool {
    CompressedEdwardsY(*bytes).decompress().is_some()
}

fn check_seeds(seeds: &[&[u8]]) -> Result<(), DeriveError> {
    if seeds.len() > MAX_SEEDS {
        return Err(DeriveError::TooManySeeds {
            count: seeds.len(),
            max: MAX_SEEDS,
        });
    }
    for (index, seed) in seeds.iter().enumerate() {
        if seed.len() > MAX_SEED_LEN {
            return Err(DeriveError::SeedTooLong {
                index,
                len: seed.len(),
                max: MAX_SEED_LEN,
            });
        }
    }
    Ok(())
}

/// Hash `seeds` (bump already appended by the caller) under `program_id`.
///
/// Fails with [`DeriveError::OnCurve`] if the digest is a valid public key.
pub fn create_program_address(seeds: &[&[u8]], program_id: &Pubkey) -> Result<Pubkey, DeriveError> {
    check_seeds(seeds)?;

    let mut hasher = Sha256::new();
    for seed in seeds {
        hasher.update(seed);
    }
    hasher.update(program_id.as_ref());
    hasher.update(PDA_MARKER);
    let digest: [u8; 32] = hasher.finalize().into();

    if is_on_curve(&digest) {
        return Err(DeriveError::OnCurve);
    }
    Ok(Pubkey::new_from_array(digest))
}

/// Search for the highest bump whose address is off the curve.
pub fn find_program_address(
    seeds: &[&[u8]],
    program_id: &Pubkey,
) -> Result<DerivedAddress, DeriveError> {
    // Leave room for the bump seed.
    if seeds.len() >= MAX_SEEDS {
        return Err(DeriveError::TooManySeeds {
            count: seeds.len() + 1,
            max: MAX_SEEDS,
        });
    }

    for bump in (0..=u8::MAX).rev() {
        let bump_seed = [bump];
        let mut with_bump = seeds.to_vec();
        with_bump.push(&bump_seed);
        match create_program_address(&with_bump, program_id) {
            Ok(address) => return Ok(DerivedAddress { address, bump }),
            Err(DeriveError::OnCurve) => continue,
            Err(e) => return Err(e),
        }
    }

    Err(DeriveError::NoViableBump)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loader() -> Pubkey {
        "BPFLoaderUpgradeab1e11111111111111111111111".parse().unwrap()
    }

    // Known answers shared with other implementations of this scheme.
    #[test]
    fn test_create_program_address_vectors() {
        let program_id = loader();
        let public_key: Pubkey = "SeedPubey1111111111111111111111111111111111".parse().unwrap();

        assert_eq!(
            create_program_address(&[b"", &[1]], &program_id).unwrap().to_string(),
            "BwqrghZA2htAcqq8dzP1WDAhTXYTYWj7CHxF5j7TDBAe"
        );
        assert_eq!(
            create_program_address(&["☉".as_bytes(), &[0]], &program_id)
                .unwrap()
                .to_string(),
            "13yWmRpaTR4r5nAktwLqMpRNr28tnVUZw26rTvPSSB19"
        );
        assert_eq!(
            create_program_address(&[b"Talking", b"Squirrels"], &program_id)
                .unwrap()
                .to_string(),
            "2fnQrngrQT4SeLcdToJAD96phoEjNL2man2kfRLCASVk"
        );
        assert_eq!(
            create_program_address(&[public_key.as_ref(), &[1]], &program_id)
                .unwrap()
                .to_string(),
            "976ymqVnfE32QFe6NfGDctSvVa36LWnvYxhU6G2232YL"
        );
    }

    #[test]
    fn test_seed_limits() {
        let program_id = loader();
        let long = [127u8; MAX_SEED_LEN + 1];
        assert_eq!(
            create_program_address(&[&long], &program_id),
            Err(DeriveError::SeedTooLong {
                index: 0,
                len: 33,
                max: 32
            })
        );

        let max_seed = [0u8; MAX_SEED_LEN];
        assert!(find_program_address(&[&max_seed], &program_id).is_ok());

        let seeds: Vec<&[u8]> = vec![&b"x"[..]; MAX_SEEDS];
        assert!(matches!(
            find_program_address(&seeds, &program_id),
            Err(DeriveError::TooManySeeds { .. })
        ));
    }

    #[test]
    fn test_found_bump_reproduces_address() {
        let program_id = loader();
        let found = find_program_address(&[b"Lil'", b"Bits"], &program_id).unwrap();
        let again =
            create_program_address(&[b"Lil'", b"Bits", &[found.bump]], &program_id).unwrap();
        assert_eq!(found.address, again);
        assert!(!is_on_curve(found.address.as_bytes()));
    }

    #[test]
    fn test_real_keys_are_on_curve() {
        // The ed25519 basepoint, compressed.
        let mut basepoint = [0x66u8; 32];
        basepoint[0] = 0x58;
        assert!(is_on_curve(&basepoint));
    }
}
