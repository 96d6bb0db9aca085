// Copyright (c) 2024 Botho Foundation

use anyhow::Result;
use nuoi_crypto_keys::{Keypair, Signer};

pub fn run() -> Result<()> {
    let keypair = Keypair::generate();
    println!("Address:    {}", keypair.pubkey());
    println!("Secret key: {}", keypair.to_hex());
    Ok(())
}
