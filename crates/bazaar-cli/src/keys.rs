//! # Keygen Subcommand
//!
//! Identity keys live in two files: `<prefix>.key` holds the 32-byte secret
//! seed as hex, `<prefix>.pub` the public key as hex.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;

use bazaar_crypto::{Ed25519KeyPair, Ed25519PublicKey};

/// Arguments for `bazaar keygen`.
#[derive(Args, Debug)]
pub struct KeygenArgs {
    /// Output directory for the keypair files.
    #[arg(long, short, default_value = ".")]
    pub output: PathBuf,
    /// Prefix for the key filenames.
    #[arg(long, default_value = "bazaar")]
    pub prefix: String,
}

/// Generate a new identity and write it to disk.
pub fn run_keygen(args: &KeygenArgs) -> Result<u8> {
    std::fs::create_dir_all(&args.output).with_context(|| {
        format!(
            "failed to create output directory: {}",
            args.output.display()
        )
    })?;

    let kp = Ed25519KeyPair::generate();
    let pk_hex = kp.public_key().to_hex();
    let sk_path = args.output.join(format!("{}.key", args.prefix));
    let pk_path = args.output.join(format!("{}.pub", args.prefix));

    if sk_path.exists() {
        bail!("refusing to overwrite existing key: {}", sk_path.display());
    }
    std::fs::write(&sk_path, kp.secret_hex().as_str())
        .with_context(|| format!("failed to write private key: {}", sk_path.display()))?;
    std::fs::write(&pk_path, &pk_hex)
        .with_context(|| format!("failed to write public key: {}", pk_path.display()))?;

    println!("OK: generated identity");
    println!("  Private key: {}", sk_path.display());
    println!("  Public key:  {}", pk_path.display());
    println!("  Public key (hex): {pk_hex}");
    Ok(0)
}

/// Load an identity from a `.key` file.
pub fn load_keypair(path: &Path) -> Result<Ed25519KeyPair> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read private key: {}", path.display()))?;
    Ed25519KeyPair::from_secret_hex(raw.trim())
        .with_context(|| format!("invalid private key in {}", path.display()))
}

/// Parse a public key given as hex or as a path to a `.pub` file.
pub fn parse_pubkey(value: &str) -> Result<Ed25519PublicKey> {
    if let Ok(pk) = Ed25519PublicKey::from_hex(value.trim()) {
        return Ok(pk);
    }
    let path = Path::new(value);
    if !path.exists() {
        bail!("{value:?} is neither a hex public key nor a key file");
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read public key: {}", path.display()))?;
    Ed25519PublicKey::from_hex(raw.trim())
        .with_context(|| format!("invalid public key in {}", path.display()))
}
