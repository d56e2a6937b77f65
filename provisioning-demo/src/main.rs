// SPDX-License-Identifier: Apache-2.0
// Copyright 2026 Secret Provisioning Authors

mod remote;

use base64::{engine::general_purpose, Engine as _};
use clap::Parser;
use log::*;
use remote::RemoteParty;
use secret_provisioning::{
    attestation::SoftwareAttester,
    bignum::CodecError,
    config::{ConfigError, ProvisioningConfig},
    crypto::{sha256_concat, testing::CryptoTestError},
    report::AttestationError,
    ProtectedContext, ProvisioningError,
};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DemoError {
    #[error("Provisioning error")]
    Provisioning(#[from] ProvisioningError),
    #[error("Configuration error")]
    Config(#[from] ConfigError),
    #[error("Attestation error")]
    Attestation(#[from] AttestationError),
    #[error("Remote party crypto error")]
    Crypto(#[from] CryptoTestError),
    #[error("Public key decoding error")]
    Codec(#[from] CodecError),
    #[error("OpenSSL error")]
    OpenSSL(#[from] openssl::error::ErrorStack),
    #[error("Quote verification failed: {0}")]
    Verification(String),
    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, DemoError>;

#[derive(Parser)]
#[clap(about)]
struct Args {
    /// TOML configuration file
    #[clap(long, short = 'c')]
    config: Option<PathBuf>,
    /// Freshness nonce, as a decimal number
    #[clap(long, short = 'n', default_value = "42")]
    nonce: String,
    /// Secret the remote party provisions
    #[clap(long, short = 's', default_value = "hello")]
    secret: String,
    /// Print the quote, base64 encoded
    #[clap(long)]
    print_quote: bool,
}

fn main() -> std::result::Result<(), DemoError> {
    pretty_env_logger::init();
    let args = Args::parse();

    let config = ProvisioningConfig::load(args.config.as_deref())?;

    let measurement = sha256_concat(&[&b"secret-provisioning-demo"[..]]);
    let attester = SoftwareAttester::new(measurement)?;
    let mut ctx = ProtectedContext::new(&config, attester);
    let remote = RemoteParty::new(measurement)?;

    info!("Requesting public key and quote with nonce {}", args.nonce);
    let pkq = ctx.get_public_key_and_quote(&args.nonce)?;
    if args.print_quote {
        println!("{}", general_purpose::STANDARD.encode(pkq.quote.as_bytes()));
    }

    remote.verify(&pkq, &args.nonce)?;
    let delivery = remote.deliver(&pkq, args.secret.as_bytes())?;

    ctx.unwrap_swk(&delivery.wrapped_swk)?;
    info!("Provisioning state: {}", ctx.state());
    let secret = ctx.unwrap_secret(&delivery.wrapped_secret)?;
    info!("Provisioning state: {}", ctx.state());

    if secret.as_slice() != args.secret.as_bytes() {
        return Err(DemoError::Other(
            "unwrapped secret differs from the one sent".into(),
        ));
    }
    println!("Provisioned a secret of {} bytes", secret.len());
    Ok(())
}
