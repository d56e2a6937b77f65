// SPDX-License-Identifier: Apache-2.0
// Copyright 2026 Secret Provisioning Authors

//! Two-stage secret delivery.
//!
//! The remote party first sends a symmetric wrapping key (SWK) encrypted
//! under the context's RSA public key, then any number of secrets sealed
//! under that SWK with AES-256-GCM. States only advance on success:
//!
//! ```text
//! NoSwk --unwrap_swk--> SwkReady --unwrap_secret--> SecretProvisioned
//!                          ^                               |
//!                          +-----------unwrap_swk----------+
//! ```

use crate::{
    crypto::{
        decrypt_aes256_gcm, rsa_oaep_sha256_decrypt,
        wrapped_secret::WrappedSecret, wrapping_key::WrappingKey,
    },
    error::{ProvisioningError, Result},
    key_manager::KeyManager,
};
use log::*;
use std::fmt;
use zeroize::Zeroizing;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisioningState {
    NoSwk,
    SwkReady,
    SecretProvisioned,
}

impl fmt::Display for ProvisioningState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProvisioningState::NoSwk => "no wrapping key",
            ProvisioningState::SwkReady => "wrapping key ready",
            ProvisioningState::SecretProvisioned => "secret provisioned",
        };
        f.write_str(s)
    }
}

#[derive(Debug)]
pub struct Provisioner {
    state: ProvisioningState,
    swk: Option<WrappingKey>,
    log_secret: bool,
}

impl Provisioner {
    pub fn new(log_secret: bool) -> Self {
        Provisioner {
            state: ProvisioningState::NoSwk,
            swk: None,
            log_secret,
        }
    }

    pub fn state(&self) -> ProvisioningState {
        self.state
    }

    /// Recover the SWK from an RSA-OAEP ciphertext and make it resident,
    /// replacing any previous one.
    pub fn unwrap_swk(
        &mut self,
        key_manager: &KeyManager,
        wrapped_swk: &[u8],
    ) -> Result<()> {
        if wrapped_swk.is_empty() {
            return Err(ProvisioningError::InvalidParameter(
                "empty wrapped key".into(),
            ));
        }
        let private_key = key_manager.private_key()?;
        let swk = rsa_oaep_sha256_decrypt(&private_key, wrapped_swk)?;
        let swk = WrappingKey::try_from(swk.as_slice())
            .map_err(|e| ProvisioningError::InvalidParameter(e.to_string()))?;

        if self.swk.replace(swk).is_some() {
            info!("Replaced resident wrapping key");
        }
        self.state = ProvisioningState::SwkReady;
        debug!("Provisioning state: {}", self.state);
        Ok(())
    }

    /// Open an `IV || ciphertext || TAG` buffer with the resident SWK.
    ///
    /// A failed decryption leaves the state unchanged.
    pub fn unwrap_secret(
        &mut self,
        wrapped_secret: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>> {
        let swk = match (&self.state, &self.swk) {
            (ProvisioningState::NoSwk, _) | (_, None) => {
                return Err(ProvisioningError::NotProvisioned(
                    "no wrapping key has been unwrapped".into(),
                ))
            }
            (_, Some(swk)) => swk,
        };

        let wrapped = WrappedSecret::try_from(wrapped_secret)
            .map_err(|e| ProvisioningError::InvalidParameter(e.to_string()))?;
        let plaintext = decrypt_aes256_gcm(
            swk.as_ref(),
            wrapped.ciphertext(),
            wrapped.iv(),
            None,
            wrapped.tag(),
        )?;

        self.state = ProvisioningState::SecretProvisioned;
        info!("Unwrapped secret of {} bytes", plaintext.len());
        if self.log_secret {
            info!("Secret: {}", secret_hex(&plaintext).as_str());
        }
        Ok(plaintext)
    }
}

/// Hex form of a secret for opt-in logging, wiped on drop
fn secret_hex(secret: &[u8]) -> Zeroizing<String> {
    Zeroizing::new(hex::encode(secret))
}
