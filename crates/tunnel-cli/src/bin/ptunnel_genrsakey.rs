//! `ptunnel-genrsakey`: generates an RSA key pair and writes
//! `PrivateKey.pem`/`PublicKey.pem`/`NBits.txt` into a directory.

use std::path::PathBuf;

use clap::Parser;
use tunnel_crypto::generate_keypair;

/// pTunnelGenRSAKey is a tool to generate an RSA key pair.
#[derive(Parser, Debug)]
#[command(name = "ptunnel-genrsakey", version, about)]
struct Args {
    /// Length of the RSA key pair, in bits.
    #[arg(short = 'l', long, default_value_t = 2048)]
    length: usize,
    /// Directory to save the key pair into.
    #[arg(short = 'd', long, default_value = "./cert")]
    dir: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let pair = generate_keypair(args.length)?;
    pair.write_to_dir(&args.dir)?;

    println!("wrote RSA key pair ({} bits) to {}", args.length, args.dir.display());
    Ok(())
}
