// SPDX-License-Identifier: Apache-2.0
// Copyright 2026 Secret Provisioning Authors

//! Software stand-in for the platform attestation facility.
//!
//! Reports are MACed with a per-instance platform key so that only this
//! attester can turn them into quotes. This gives hosts without
//! protected-context hardware, and the test suite, the same report/quote
//! flow as real hardware. It provides no security guarantees.
//!
//! Report layout:
//!
//! ```text
//! measurement(32) || SHA-256(target info)(32) || report data(64) || MAC(32)
//! ```
//!
//! A quote is `SWQ1 || report`.

use crate::{
    crypto::{sha256_concat, SHA256_DIGEST_LEN},
    report::{
        AttestationCollaborator, AttestationError, Quote, Report, ReportData,
        TargetInfo, REPORT_DATA_SIZE,
    },
};
use log::*;
use openssl::{
    hash::MessageDigest, memcmp, pkey::PKey, rand::rand_bytes, sign::Signer,
};
use zeroize::Zeroizing;

pub const STATUS_UNEXPECTED: u32 = 0x0001;
pub const STATUS_INVALID_PARAMETER: u32 = 0x0002;
pub const STATUS_MAC_MISMATCH: u32 = 0x3001;

pub const MEASUREMENT_SIZE: usize = 32;
pub const SOFTWARE_REPORT_SIZE: usize = MEASUREMENT_SIZE
    + SHA256_DIGEST_LEN
    + REPORT_DATA_SIZE
    + SHA256_DIGEST_LEN;
pub const SOFTWARE_QUOTE_MAGIC: &[u8; 4] = b"SWQ1";

const PLATFORM_KEY_LEN: usize = 32;
const TARGET_INFO_LEN: usize = 512;

const TARGET_HASH_OFFSET: usize = MEASUREMENT_SIZE;
const REPORT_DATA_OFFSET: usize = TARGET_HASH_OFFSET + SHA256_DIGEST_LEN;
const MAC_OFFSET: usize = REPORT_DATA_OFFSET + REPORT_DATA_SIZE;

fn unexpected(
    message: &str,
) -> impl FnOnce(openssl::error::ErrorStack) -> AttestationError + '_ {
    move |e| {
        AttestationError::new(STATUS_UNEXPECTED, format!("{message}: {e}"))
    }
}

pub struct SoftwareAttester {
    platform_key: Zeroizing<Vec<u8>>,
    measurement: [u8; MEASUREMENT_SIZE],
    target_info: TargetInfo,
}

impl SoftwareAttester {
    /// Create an attester with a random platform key and target info
    pub fn new(
        measurement: [u8; MEASUREMENT_SIZE],
    ) -> Result<Self, AttestationError> {
        let mut platform_key = Zeroizing::new(vec![0u8; PLATFORM_KEY_LEN]);
        rand_bytes(&mut platform_key[..])
            .map_err(unexpected("failed to generate platform key"))?;
        let mut target = vec![0u8; TARGET_INFO_LEN];
        rand_bytes(&mut target)
            .map_err(unexpected("failed to generate target info"))?;
        Ok(Self::with_key(
            &platform_key,
            measurement,
            TargetInfo::new(target),
        ))
    }

    pub fn with_key(
        platform_key: &[u8],
        measurement: [u8; MEASUREMENT_SIZE],
        target_info: TargetInfo,
    ) -> Self {
        SoftwareAttester {
            platform_key: Zeroizing::new(platform_key.to_vec()),
            measurement,
            target_info,
        }
    }

    fn mac(&self, data: &[u8]) -> Result<Vec<u8>, AttestationError> {
        let pkey = PKey::hmac(&self.platform_key)
            .map_err(unexpected("failed to load platform key"))?;
        let mut signer = Signer::new(MessageDigest::sha256(), &pkey)
            .map_err(unexpected("failed creating Signer object"))?;
        signer
            .update(data)
            .map_err(unexpected("failed to add input data to Signer"))?;
        signer
            .sign_to_vec()
            .map_err(unexpected("failed to generate report MAC"))
    }
}

impl AttestationCollaborator for SoftwareAttester {
    fn target_info(&self) -> Result<TargetInfo, AttestationError> {
        Ok(self.target_info.clone())
    }

    fn create_report(
        &self,
        target: &TargetInfo,
        report_data: &ReportData,
    ) -> Result<Report, AttestationError> {
        if target.as_bytes().is_empty() {
            return Err(AttestationError::new(
                STATUS_INVALID_PARAMETER,
                "empty target info",
            ));
        }

        let mut report = Vec::with_capacity(SOFTWARE_REPORT_SIZE);
        report.extend(&self.measurement);
        report.extend(&sha256_concat(&[target.as_bytes()]));
        report.extend(report_data.as_bytes());
        let mac = self.mac(&report)?;
        report.extend(&mac);

        debug!("Created software report for report data {report_data:?}");
        Ok(Report::new(report))
    }

    fn report_to_quote(
        &self,
        report: &Report,
    ) -> Result<Quote, AttestationError> {
        let bytes = report.as_bytes();
        if bytes.len() != SOFTWARE_REPORT_SIZE {
            return Err(AttestationError::new(
                STATUS_INVALID_PARAMETER,
                format!(
                    "report must be {SOFTWARE_REPORT_SIZE} bytes, got {}",
                    bytes.len()
                ),
            ));
        }

        let expected_target = sha256_concat(&[self.target_info.as_bytes()]);
        if bytes[TARGET_HASH_OFFSET..REPORT_DATA_OFFSET] != expected_target {
            return Err(AttestationError::new(
                STATUS_INVALID_PARAMETER,
                "report is not targeted at this quoting enclave",
            ));
        }

        let mac = self.mac(&bytes[..MAC_OFFSET])?;
        if !memcmp::eq(&mac, &bytes[MAC_OFFSET..]) {
            return Err(AttestationError::new(
                STATUS_MAC_MISMATCH,
                "report MAC verification failed",
            ));
        }

        let mut quote =
            Vec::with_capacity(SOFTWARE_QUOTE_MAGIC.len() + bytes.len());
        quote.extend(SOFTWARE_QUOTE_MAGIC);
        quote.extend(bytes);
        Ok(Quote::new(quote))
    }
}

fn quote_body(quote: &Quote) -> Result<&[u8], AttestationError> {
    let bytes = quote.as_bytes();
    match bytes.strip_prefix(&SOFTWARE_QUOTE_MAGIC[..]) {
        Some(body) if body.len() == SOFTWARE_REPORT_SIZE => Ok(body),
        _ => Err(AttestationError::new(
            STATUS_INVALID_PARAMETER,
            "not a software quote",
        )),
    }
}

/// Extract the report data a software quote was made over
pub fn quote_report_data(
    quote: &Quote,
) -> Result<ReportData, AttestationError> {
    let body = quote_body(quote)?;
    let mut data = [0u8; REPORT_DATA_SIZE];
    data.copy_from_slice(&body[REPORT_DATA_OFFSET..MAC_OFFSET]);
    Ok(ReportData::from_bytes(data))
}

/// Extract the measurement a software quote was made over
pub fn quote_measurement(
    quote: &Quote,
) -> Result<[u8; MEASUREMENT_SIZE], AttestationError> {
    let body = quote_body(quote)?;
    let mut measurement = [0u8; MEASUREMENT_SIZE];
    measurement.copy_from_slice(&body[..MEASUREMENT_SIZE]);
    Ok(measurement)
}
