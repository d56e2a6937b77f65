// SPDX-License-Identifier: Apache-2.0
// Copyright 2026 Secret Provisioning Authors

use crate::{
    config::ProvisioningConfig,
    error::{ProvisioningError, Result},
    key_manager::{KeyManager, PublicKey},
    provisioning::{Provisioner, ProvisioningState},
    report::{
        build_report, decode_nonce, AttestationCollaborator, Quote, Report,
        TargetInfo,
    },
};
use log::*;
use zeroize::Zeroizing;

/// Public key together with a quote binding it to the context
#[derive(Debug, Clone)]
pub struct PublicKeyQuote {
    pub public_key: PublicKey,
    pub quote: Quote,
}

/// One loaded protected context: its key pair, its provisioning state and
/// the attestation facility it reports through.
///
/// Every mutating operation takes `&mut self`. Share across threads behind
/// a `Mutex`.
pub struct ProtectedContext<C> {
    collaborator: C,
    key_manager: KeyManager,
    provisioner: Provisioner,
    report_retries: u32,
}

impl<C: AttestationCollaborator> ProtectedContext<C> {
    pub fn new(config: &ProvisioningConfig, collaborator: C) -> Self {
        Self::with_key_manager(config, collaborator, KeyManager::new())
    }

    pub fn with_key_manager(
        config: &ProvisioningConfig,
        collaborator: C,
        key_manager: KeyManager,
    ) -> Self {
        ProtectedContext {
            collaborator,
            key_manager,
            provisioner: Provisioner::new(config.log_secret),
            report_retries: config.report_retries,
        }
    }

    pub fn collaborator(&self) -> &C {
        &self.collaborator
    }

    pub fn state(&self) -> ProvisioningState {
        self.provisioner.state()
    }

    /// Public exponent and modulus, creating the key pair on first use
    pub fn get_public_key(&mut self) -> Result<PublicKey> {
        self.key_manager.public_key()
    }

    pub fn get_report(
        &mut self,
        target: &TargetInfo,
        nonce: &str,
    ) -> Result<Report> {
        build_report(&self.collaborator, &mut self.key_manager, target, nonce)
    }

    pub fn unwrap_swk(&mut self, wrapped_swk: &[u8]) -> Result<()> {
        self.provisioner.unwrap_swk(&self.key_manager, wrapped_swk)
    }

    pub fn unwrap_secret(
        &mut self,
        wrapped_secret: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>> {
        self.provisioner.unwrap_secret(wrapped_secret)
    }

    /// Produce the public key and a quote over it and `nonce`.
    ///
    /// A failed report is retried up to `report_retries` more times, each
    /// time with freshly fetched target info. Other failures are returned
    /// immediately.
    pub fn get_public_key_and_quote(
        &mut self,
        nonce: &str,
    ) -> Result<PublicKeyQuote> {
        let _ = decode_nonce(nonce)?;
        let public_key = self.get_public_key()?;

        let mut attempt = 0;
        let report = loop {
            let target = self
                .collaborator
                .target_info()
                .map_err(ProvisioningError::TargetInfoFailed)?;

            match build_report(
                &self.collaborator,
                &mut self.key_manager,
                &target,
                nonce,
            ) {
                Ok(report) => break report,
                Err(ProvisioningError::ReportCreationFailed(e))
                    if attempt < self.report_retries =>
                {
                    attempt += 1;
                    warn!(
                        "Report creation failed ({e}), retrying with fresh target info ({attempt}/{})",
                        self.report_retries
                    );
                }
                Err(e) => return Err(e),
            }
        };

        let quote = self
            .collaborator
            .report_to_quote(&report)
            .map_err(ProvisioningError::QuoteFailed)?;
        info!("Generated quote of {} bytes", quote.as_bytes().len());

        Ok(PublicKeyQuote { public_key, quote })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        attestation::{
            quote_report_data, SoftwareAttester, STATUS_INVALID_PARAMETER,
        },
        crypto::sha256_concat,
        key_manager::testing::key_manager,
        report::{AttestationError, ReportData},
    };
    use std::cell::Cell;

    /// Rejects the first `failures` reports, counting target info fetches
    struct FlakyAttester {
        inner: SoftwareAttester,
        failures: Cell<u32>,
        target_fetches: Cell<u32>,
    }

    impl FlakyAttester {
        fn new(failures: u32) -> Self {
            FlakyAttester {
                inner: SoftwareAttester::new([0x33; 32])
                    .expect("failed to create attester"),
                failures: Cell::new(failures),
                target_fetches: Cell::new(0),
            }
        }
    }

    impl AttestationCollaborator for FlakyAttester {
        fn target_info(
            &self,
        ) -> std::result::Result<TargetInfo, AttestationError> {
            self.target_fetches.set(self.target_fetches.get() + 1);
            self.inner.target_info()
        }

        fn create_report(
            &self,
            target: &TargetInfo,
            report_data: &ReportData,
        ) -> std::result::Result<Report, AttestationError> {
            if self.failures.get() > 0 {
                self.failures.set(self.failures.get() - 1);
                return Err(AttestationError::new(
                    STATUS_INVALID_PARAMETER,
                    "stale target info",
                ));
            }
            self.inner.create_report(target, report_data)
        }

        fn report_to_quote(
            &self,
            report: &Report,
        ) -> std::result::Result<Quote, AttestationError> {
            self.inner.report_to_quote(report)
        }
    }

    fn context(
        retries: u32,
        attester: FlakyAttester,
    ) -> ProtectedContext<FlakyAttester> {
        let config = ProvisioningConfig {
            report_retries: retries,
            ..Default::default()
        };
        ProtectedContext::with_key_manager(&config, attester, key_manager())
    }

    #[test]
    fn test_quote_binds_key_and_nonce() {
        let mut ctx = context(0, FlakyAttester::new(0));
        let pkq = ctx
            .get_public_key_and_quote("42")
            .expect("failed to get quote");

        let digest = sha256_concat(&[
            pkq.public_key.exponent(),
            pkq.public_key.modulus(),
            &[0x2A],
        ]);
        let data = quote_report_data(&pkq.quote).expect("failed to parse");
        assert_eq!(data, ReportData::from_digest(&digest));
        assert_eq!(
            pkq.public_key,
            ctx.get_public_key().expect("failed to get key")
        );
        assert_eq!(ctx.collaborator().target_fetches.get(), 1);
    }

    #[test]
    fn test_quote_retry_refreshes_target() {
        let mut ctx = context(1, FlakyAttester::new(1));
        let _ = ctx
            .get_public_key_and_quote("7")
            .expect("retry should succeed");
        assert_eq!(ctx.collaborator().target_fetches.get(), 2);
    }

    #[test]
    fn test_quote_retries_exhausted() {
        let mut ctx = context(1, FlakyAttester::new(2));
        let err = ctx
            .get_public_key_and_quote("7")
            .expect_err("retries should be exhausted");
        assert_eq!(err.attestation_status(), Some(STATUS_INVALID_PARAMETER));
        assert_eq!(ctx.collaborator().target_fetches.get(), 2);

        let mut ctx = context(0, FlakyAttester::new(1));
        assert!(matches!(
            ctx.get_public_key_and_quote("7"),
            Err(ProvisioningError::ReportCreationFailed(_))
        ));
        assert_eq!(ctx.collaborator().target_fetches.get(), 1);
    }

    #[test]
    fn test_bad_nonce_is_not_retried() {
        let mut ctx = context(3, FlakyAttester::new(0));
        assert!(matches!(
            ctx.get_public_key_and_quote("0"),
            Err(ProvisioningError::NonceOutOfRange { .. })
        ));
        assert_eq!(ctx.collaborator().target_fetches.get(), 0);
    }

    #[test]
    fn test_get_report_with_explicit_target() {
        let mut ctx = context(0, FlakyAttester::new(0));
        let target = ctx
            .collaborator()
            .target_info()
            .expect("failed to get target");
        let report = ctx.get_report(&target, "1234").expect("no report");
        assert!(!report.as_bytes().is_empty());
        assert_eq!(ctx.state(), ProvisioningState::NoSwk);
    }
}
