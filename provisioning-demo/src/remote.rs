// SPDX-License-Identifier: Apache-2.0
// Copyright 2026 Secret Provisioning Authors

//! The remote party: checks the quote, then sends the SWK and the secret.

use crate::{DemoError, Result};
use base64::{engine::general_purpose, Engine as _};
use log::*;
use openssl::rand::rand_bytes;
use secret_provisioning::{
    attestation::{quote_measurement, quote_report_data, MEASUREMENT_SIZE},
    context::PublicKeyQuote,
    crypto::{
        testing::{rsa_oaep_sha256_encrypt, wrap_secret},
        AES_256_KEY_LEN, GCM_IV_LEN,
    },
    report::{decode_nonce, report_data_for},
};
use zeroize::Zeroizing;

pub struct RemoteParty {
    expected_measurement: [u8; MEASUREMENT_SIZE],
    swk: Zeroizing<[u8; AES_256_KEY_LEN]>,
}

/// Messages sent to the protected context
pub struct Delivery {
    pub wrapped_swk: Vec<u8>,
    pub wrapped_secret: Vec<u8>,
}

impl RemoteParty {
    pub fn new(expected_measurement: [u8; MEASUREMENT_SIZE]) -> Result<Self> {
        let mut swk = Zeroizing::new([0u8; AES_256_KEY_LEN]);
        rand_bytes(swk.as_mut_slice())?;
        Ok(RemoteParty {
            expected_measurement,
            swk,
        })
    }

    /// Check that the quote comes from the expected code and binds the
    /// published key to our nonce
    pub fn verify(&self, pkq: &PublicKeyQuote, nonce: &str) -> Result<()> {
        let measurement = quote_measurement(&pkq.quote)?;
        if measurement != self.expected_measurement {
            return Err(DemoError::Verification(format!(
                "unexpected measurement {}",
                hex::encode(measurement)
            )));
        }

        let nonce_bytes = decode_nonce(nonce)?;
        let expected = report_data_for(&pkq.public_key, &nonce_bytes);
        if quote_report_data(&pkq.quote)? != expected {
            return Err(DemoError::Verification(
                "quote does not bind the published public key".into(),
            ));
        }
        info!("Quote verified, measurement {}", hex::encode(measurement));
        Ok(())
    }

    pub fn deliver(
        &self,
        pkq: &PublicKeyQuote,
        secret: &[u8],
    ) -> Result<Delivery> {
        let public_key = pkq.public_key.to_pkey()?;
        let wrapped_swk =
            rsa_oaep_sha256_encrypt(&public_key, self.swk.as_slice())?;

        let mut iv = [0u8; GCM_IV_LEN];
        rand_bytes(&mut iv)?;
        let wrapped_secret = wrap_secret(self.swk.as_slice(), &iv, secret)?;

        debug!(
            "Wrapped SWK: {}",
            general_purpose::STANDARD.encode(&wrapped_swk)
        );
        debug!(
            "Wrapped secret: {}",
            general_purpose::STANDARD.encode(&wrapped_secret)
        );
        Ok(Delivery {
            wrapped_swk,
            wrapped_secret,
        })
    }
}
