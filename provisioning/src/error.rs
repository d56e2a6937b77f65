// SPDX-License-Identifier: Apache-2.0
// Copyright 2026 Secret Provisioning Authors

use crate::{config::ConfigError, report::AttestationError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProvisioningError {
    /// Malformed or out-of-range caller input, detected before any mutation
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The key pair could not be generated. Fatal for the context instance.
    #[error("RSA key pair generation failed: {0}")]
    KeyGenerationFailed(String),

    /// The private key could not be rebuilt from its CRT components
    #[error("failed to construct RSA private key from CRT components")]
    KeyConstructionFailed(#[source] openssl::error::ErrorStack),

    #[error("nonce length {length} is not in the expected range (0, {max}]")]
    NonceOutOfRange { length: usize, max: usize },

    // Cryptographic rejections carry no detail on purpose
    #[error("authentication tag mismatch")]
    AuthenticationFailed,

    #[error("decryption failed")]
    DecryptionFailed,

    /// Operation called out of protocol order
    #[error("not provisioned: {0}")]
    NotProvisioned(String),

    #[error("failed to allocate {size} bytes")]
    ResourceExhausted { size: usize },

    /// Unexpected failure while setting up a cipher context
    #[error("cipher failure: {message}")]
    CipherFailure {
        message: String,
        source: openssl::error::ErrorStack,
    },

    #[error("failed to obtain the quoting target info")]
    TargetInfoFailed(#[source] AttestationError),

    #[error("report creation failed")]
    ReportCreationFailed(#[source] AttestationError),

    #[error("failed to convert report into a quote")]
    QuoteFailed(#[source] AttestationError),

    #[error("configuration error")]
    Configuration(#[from] ConfigError),
}

impl ProvisioningError {
    /// Status code returned by the attestation collaborator, if the error
    /// came from it
    pub fn attestation_status(&self) -> Option<u32> {
        match self {
            ProvisioningError::TargetInfoFailed(e)
            | ProvisioningError::ReportCreationFailed(e)
            | ProvisioningError::QuoteFailed(e) => Some(e.status),
            _ => None,
        }
    }
}

pub type Result<T, E = ProvisioningError> = std::result::Result<T, E>;
