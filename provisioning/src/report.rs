// SPDX-License-Identifier: Apache-2.0
// Copyright 2026 Secret Provisioning Authors

//! Attested report construction.
//!
//! A report binds the context's public key and a caller supplied freshness
//! nonce to the context's measured identity. The binding is
//! `SHA-256(exponent || modulus || nonce)`, placed in the low 32 bytes of the
//! 64-byte report-data field. Producing the report itself is delegated to an
//! [`AttestationCollaborator`].

use crate::{
    bignum::{decimal_to_be_bytes, CodecError},
    crypto::{sha256_concat, SHA256_DIGEST_LEN},
    error::{ProvisioningError, Result},
    key_manager::{KeyManager, PublicKey},
};
use log::*;
use std::fmt;
use thiserror::Error;

/// Largest accepted decoded nonce, in bytes
pub const NONCE_MAX_BYTES: usize = 32;
pub const REPORT_DATA_SIZE: usize = 64;

/// Failure reported by the attestation collaborator, with its own status
/// code passed through untouched
#[derive(Debug, Clone, Error)]
#[error("attestation status {status:#06x}: {message}")]
pub struct AttestationError {
    pub status: u32,
    pub message: String,
}

impl AttestationError {
    pub fn new(status: u32, message: impl Into<String>) -> Self {
        AttestationError {
            status,
            message: message.into(),
        }
    }
}

/// Descriptor of the enclave that will verify the report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetInfo(Vec<u8>);

impl TargetInfo {
    pub fn new(bytes: Vec<u8>) -> Self {
        TargetInfo(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub struct ReportData([u8; REPORT_DATA_SIZE]);

impl ReportData {
    /// Place `digest` in the low bytes, zero the rest
    pub fn from_digest(digest: &[u8; SHA256_DIGEST_LEN]) -> Self {
        let mut data = [0u8; REPORT_DATA_SIZE];
        data[..SHA256_DIGEST_LEN].copy_from_slice(digest);
        ReportData(data)
    }

    pub fn from_bytes(bytes: [u8; REPORT_DATA_SIZE]) -> Self {
        ReportData(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; REPORT_DATA_SIZE] {
        &self.0
    }
}

impl fmt::Debug for ReportData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ReportData({})", hex::encode(self.0))
    }
}

/// Opaque report produced by the collaborator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report(Vec<u8>);

impl Report {
    pub fn new(bytes: Vec<u8>) -> Self {
        Report(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Verifiable attestation evidence derived from a report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quote(Vec<u8>);

impl Quote {
    pub fn new(bytes: Vec<u8>) -> Self {
        Quote(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Platform facility that turns report data into attestation evidence
pub trait AttestationCollaborator {
    fn target_info(&self) -> std::result::Result<TargetInfo, AttestationError>;

    fn create_report(
        &self,
        target: &TargetInfo,
        report_data: &ReportData,
    ) -> std::result::Result<Report, AttestationError>;

    fn report_to_quote(
        &self,
        report: &Report,
    ) -> std::result::Result<Quote, AttestationError>;
}

/// Decode a decimal nonce and check its length is in `(0, NONCE_MAX_BYTES]`
pub fn decode_nonce(nonce: &str) -> Result<Vec<u8>> {
    let bytes = decimal_to_be_bytes(nonce).map_err(|e: CodecError| {
        ProvisioningError::InvalidParameter(format!("invalid nonce: {e}"))
    })?;
    if bytes.is_empty() || bytes.len() > NONCE_MAX_BYTES {
        return Err(ProvisioningError::NonceOutOfRange {
            length: bytes.len(),
            max: NONCE_MAX_BYTES,
        });
    }
    Ok(bytes)
}

/// Report data binding `public_key` to the decoded nonce
pub fn report_data_for(public_key: &PublicKey, nonce: &[u8]) -> ReportData {
    let digest =
        sha256_concat(&[public_key.exponent(), public_key.modulus(), nonce]);
    ReportData::from_digest(&digest)
}

/// Build a report for `target` over the context key and `nonce`.
///
/// The nonce is validated before the key pair is touched, so a bad nonce
/// never triggers key generation. Collaborator failures surface as
/// `ReportCreationFailed` carrying the collaborator's status.
pub fn build_report<C>(
    collaborator: &C,
    key_manager: &mut KeyManager,
    target: &TargetInfo,
    nonce: &str,
) -> Result<Report>
where
    C: AttestationCollaborator + ?Sized,
{
    let nonce_bytes = decode_nonce(nonce)?;
    let public_key = key_manager.public_key()?;
    let report_data = report_data_for(&public_key, &nonce_bytes);
    debug!("Requesting report for report data {report_data:?}");

    collaborator
        .create_report(target, &report_data)
        .map_err(|e| {
            warn!("Report creation failed: {e}");
            ProvisioningError::ReportCreationFailed(e)
        })
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingCollaborator;
    use super::*;
    use crate::key_manager::testing::{key_manager, CountingGenerator};
    use std::sync::atomic::Ordering;

    // 2^256 - 1 and 2^256
    const NONCE_32_BYTES: &str = "115792089237316195423570985008687907853269984665640564039457584007913129639935";
    const NONCE_33_BYTES: &str = "115792089237316195423570985008687907853269984665640564039457584007913129639936";

    #[test]
    fn test_decode_nonce_bounds() {
        assert!(matches!(
            decode_nonce("0"),
            Err(ProvisioningError::NonceOutOfRange { length: 0, max: 32 })
        ));
        assert_eq!(
            decode_nonce(NONCE_32_BYTES).expect("32 byte nonce rejected"),
            vec![0xFF; NONCE_MAX_BYTES]
        );
        assert!(matches!(
            decode_nonce(NONCE_33_BYTES),
            Err(ProvisioningError::NonceOutOfRange {
                length: 33,
                max: 32
            })
        ));
        assert_eq!(decode_nonce("42").expect("nonce rejected"), vec![0x2A]);
    }

    #[test]
    fn test_decode_nonce_not_decimal() {
        for bad in ["", "-42", "forty-two", "4 2"] {
            assert!(matches!(
                decode_nonce(bad),
                Err(ProvisioningError::InvalidParameter(_))
            ));
        }
    }

    #[test]
    fn test_report_data_layout() {
        let mut km = key_manager();
        let public_key = km.public_key().expect("failed to create key");
        let collaborator = RecordingCollaborator::default();
        let target = TargetInfo::new(vec![0x11; 512]);

        let report = build_report(&collaborator, &mut km, &target, "42")
            .expect("failed to build report");

        let expected = sha256_concat(&[
            public_key.exponent(),
            public_key.modulus(),
            &[0x2A],
        ]);
        let seen = collaborator.seen.borrow();
        assert_eq!(seen.len(), 1);
        let data = seen[0].as_bytes();
        assert_eq!(&data[..SHA256_DIGEST_LEN], &expected);
        assert!(data[SHA256_DIGEST_LEN..].iter().all(|b| *b == 0));
        assert_eq!(report.as_bytes(), data);
    }

    #[test]
    fn test_report_data_is_deterministic() {
        let mut km = key_manager();
        let collaborator = RecordingCollaborator::default();
        let target = TargetInfo::new(vec![0x22; 16]);

        for nonce in ["42", "42", "0042"] {
            let _ = build_report(&collaborator, &mut km, &target, nonce)
                .expect("failed to build report");
        }
        let _ = build_report(&collaborator, &mut km, &target, "43")
            .expect("failed to build report");

        let seen = collaborator.seen.borrow();
        assert_eq!(seen[0], seen[1]);
        assert_eq!(seen[1], seen[2]);
        assert_ne!(seen[2], seen[3]);
    }

    #[test]
    fn test_invalid_nonce_does_not_create_key() {
        let generator = CountingGenerator::default();
        let calls = generator.calls.clone();
        let mut km = KeyManager::with_generator(Box::new(generator));
        let collaborator = RecordingCollaborator::default();
        let target = TargetInfo::new(vec![]);

        let r = build_report(&collaborator, &mut km, &target, NONCE_33_BYTES);
        assert!(matches!(r, Err(ProvisioningError::NonceOutOfRange { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(collaborator.seen.borrow().is_empty());
    }

    #[test]
    fn test_collaborator_status_is_preserved() {
        let mut km = key_manager();
        let collaborator = RecordingCollaborator {
            fail_with: Some(0x0002),
            ..Default::default()
        };
        let target = TargetInfo::new(vec![]);

        let err = build_report(&collaborator, &mut km, &target, "7")
            .expect_err("report should fail");
        assert!(matches!(err, ProvisioningError::ReportCreationFailed(_)));
        assert_eq!(err.attestation_status(), Some(0x0002));
    }
}
