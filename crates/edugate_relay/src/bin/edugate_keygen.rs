/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use edugate_relay::keys::{generate_keypair, write_keypair};
use std::env;

fn main() -> anyhow::Result<()> {
    let out_dir = env::args().nth(1).unwrap_or_else(|| ".".to_string());
    let prefix = env::args().nth(2).unwrap_or_else(|| "gateway".to_string());
    let bits = env::var("EDUGATE_KEYGEN_BITS")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(2048);
    if bits < 1024 {
        anyhow::bail!("usage: edugate_keygen [out_dir] [prefix] (EDUGATE_KEYGEN_BITS >= 1024)");
    }

    let pair = generate_keypair(bits)?;
    write_keypair(&out_dir, &prefix, &pair)?;
    println!("wrote {out_dir}/{prefix}_private_key.pem");
    println!("wrote {out_dir}/{prefix}_public_key.pem");
    Ok(())
}
