// Copyright (c) 2024 Botho Foundation

//! Property-based tests for derived addresses.

use std::collections::HashSet;

use nuoi_crypto_address::{is_on_curve, AddressDeriver, Namespace};
use nuoi_crypto_keys::Pubkey;
use proptest::{
    prelude::*,
    strategy::ValueTree,
    test_runner::TestRunner,
};

fn deriver() -> AddressDeriver {
    AddressDeriver::new(
        "Ctfz2Ksrytewrtgc6UF2WB6FAfHhPHJRmJFcBGe8r7qS"
            .parse()
            .expect("valid program id"),
    )
}

// ============================================================================
// Determinism and sensitivity
// ============================================================================

proptest! {
    /// Same inputs always yield the same (address, bump).
    #[test]
    fn prop_campaign_deterministic(
        creator in prop::array::uniform32(any::<u8>()),
        id in any::<u64>(),
    ) {
        let creator = Pubkey::new_from_array(creator);
        let a = deriver().campaign(&creator, id).unwrap();
        let b = deriver().campaign(&creator, id).unwrap();
        prop_assert_eq!(a, b);
    }

    /// Flipping any byte of the creator or of the LE-encoded campaign id
    /// changes the campaign address.
    #[test]
    fn prop_campaign_byte_change(
        creator in prop::array::uniform32(any::<u8>()),
        id in any::<u64>(),
        position in 0usize..40,
        flip in 1u8..=255,
    ) {
        let (mut other_creator, mut other_id) = (creator, id);
        if position < 32 {
            other_creator[position] ^= flip;
        } else {
            other_id ^= u64::from(flip) << (8 * (position - 32));
        }

        let a = deriver().campaign(&Pubkey::new_from_array(creator), id).unwrap();
        let b = deriver()
            .campaign(&Pubkey::new_from_array(other_creator), other_id)
            .unwrap();
        prop_assert_ne!(a.address, b.address);
    }

    /// Flipping any byte of the campaign or of the LE-encoded request index
    /// changes the withdraw address.
    #[test]
    fn prop_withdraw_byte_change(
        campaign in prop::array::uniform32(any::<u8>()),
        index in any::<u32>(),
        position in 0usize..36,
        flip in 1u8..=255,
    ) {
        let (mut other_campaign, mut other_index) = (campaign, index);
        if position < 32 {
            other_campaign[position] ^= flip;
        } else {
            other_index ^= u32::from(flip) << (8 * (position - 32));
        }

        let a = deriver().withdraw(&Pubkey::new_from_array(campaign), index).unwrap();
        let b = deriver()
            .withdraw(&Pubkey::new_from_array(other_campaign), other_index)
            .unwrap();
        prop_assert_ne!(a.address, b.address);
    }

    /// Flipping any byte of either identity changes the donation, vote and
    /// (for the first seed) vault addresses.
    #[test]
    fn prop_pair_byte_change(
        first in prop::array::uniform32(any::<u8>()),
        second in prop::array::uniform32(any::<u8>()),
        position in 0usize..64,
        flip in 1u8..=255,
    ) {
        let (mut other_first, mut other_second) = (first, second);
        if position < 32 {
            other_first[position] ^= flip;
        } else {
            other_second[position - 32] ^= flip;
        }
        let (a1, a2) = (Pubkey::new_from_array(first), Pubkey::new_from_array(second));
        let (b1, b2) = (
            Pubkey::new_from_array(other_first),
            Pubkey::new_from_array(other_second),
        );
        let deriver = deriver();

        prop_assert_ne!(
            deriver.donation(&a1, &a2).unwrap().address,
            deriver.donation(&b1, &b2).unwrap().address
        );
        prop_assert_ne!(
            deriver.vote(&a1, &a2).unwrap().address,
            deriver.vote(&b1, &b2).unwrap().address
        );
        if position < 32 {
            prop_assert_ne!(
                deriver.vault(&a1).unwrap().address,
                deriver.vault(&b1).unwrap().address
            );
        }
    }

    /// Accepted addresses never decode to a curve point.
    #[test]
    fn prop_never_on_curve(
        campaign in prop::array::uniform32(any::<u8>()),
        donor in prop::array::uniform32(any::<u8>()),
        index in any::<u32>(),
    ) {
        let campaign = Pubkey::new_from_array(campaign);
        let donor = Pubkey::new_from_array(donor);
        let deriver = deriver();

        for derived in [
            deriver.vault(&campaign).unwrap(),
            deriver.donation(&campaign, &donor).unwrap(),
            deriver.withdraw(&campaign, index).unwrap(),
            deriver.vote(&campaign, &donor).unwrap(),
        ] {
            prop_assert!(!is_on_curve(&derived.address.to_bytes()));
        }
    }

    /// Identical trailing seeds under different tags never collide.
    #[test]
    fn prop_namespace_separation(
        a in prop::array::uniform32(any::<u8>()),
        b in prop::array::uniform32(any::<u8>()),
    ) {
        let deriver = deriver();
        let seeds: [&[u8]; 2] = [&a, &b];
        let mut seen = HashSet::new();
        for namespace in Namespace::ALL {
            let derived = deriver.derive(namespace, &seeds).unwrap();
            prop_assert!(seen.insert(derived.address), "collision under {}", namespace);
        }
    }
}

// ============================================================================
// Collision sweep
// ============================================================================

/// Seed bytes of one derivation, prefixed with its namespace.
fn seed_key(namespace: Namespace, seeds: &[&[u8]]) -> Vec<u8> {
    let mut key = namespace.tag().to_vec();
    for seed in seeds {
        key.extend_from_slice(seed);
    }
    key
}

#[test]
fn test_no_collisions_across_ten_thousand_tuples() {
    let deriver = deriver();
    let strategy = (
        0usize..Namespace::ALL.len(),
        prop::array::uniform32(any::<u8>()),
        prop::array::uniform32(any::<u8>()),
        any::<u64>(),
        any::<u32>(),
    );
    let mut runner = TestRunner::deterministic();
    let mut inputs = HashSet::new();
    let mut addresses = HashSet::new();

    while inputs.len() < 10_000 {
        let (which, a, b, id, index) = strategy.new_tree(&mut runner).unwrap().current();
        let namespace = Namespace::ALL[which];
        let (first, second) = (Pubkey::new_from_array(a), Pubkey::new_from_array(b));
        let (key, derived) = match namespace {
            Namespace::Campaign => (
                seed_key(namespace, &[&a, &id.to_le_bytes()]),
                deriver.campaign(&first, id),
            ),
            Namespace::Vault => (seed_key(namespace, &[&a]), deriver.vault(&first)),
            Namespace::Donation => (
                seed_key(namespace, &[&a, &b]),
                deriver.donation(&first, &second),
            ),
            Namespace::Withdraw => (
                seed_key(namespace, &[&a, &index.to_le_bytes()]),
                deriver.withdraw(&first, index),
            ),
            Namespace::Vote => (seed_key(namespace, &[&a, &b]), deriver.vote(&first, &second)),
        };
        if inputs.insert(key) {
            let address = derived.unwrap().address;
            assert!(addresses.insert(address), "collision at {address}");
        }
    }
    assert_eq!(addresses.len(), 10_000);
}
