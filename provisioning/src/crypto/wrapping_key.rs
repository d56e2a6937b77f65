// SPDX-License-Identifier: Apache-2.0
// Copyright 2026 Secret Provisioning Authors

use crate::crypto::AES_256_KEY_LEN;
use std::fmt;
use thiserror::Error;
use zeroize::Zeroizing;

#[derive(Debug, Error)]
pub enum WrappingKeyError {
    // Invalid key size for AES-256
    #[error("invalid wrapping key size: {0}")]
    InvalidKeySize(usize),
}

// the symmetric wrapping key (SWK) delivered by the remote party
#[derive(Clone, PartialEq, Eq)]
pub struct WrappingKey {
    bytes: Zeroizing<[u8; AES_256_KEY_LEN]>,
}

impl AsRef<[u8]> for WrappingKey {
    fn as_ref(&self) -> &[u8] {
        self.bytes.as_slice()
    }
}

impl TryFrom<&[u8]> for WrappingKey {
    type Error = WrappingKeyError;

    fn try_from(v: &[u8]) -> std::result::Result<Self, WrappingKeyError> {
        let bytes: [u8; AES_256_KEY_LEN] = v
            .try_into()
            .map_err(|_| WrappingKeyError::InvalidKeySize(v.len()))?;
        Ok(WrappingKey {
            bytes: Zeroizing::new(bytes),
        })
    }
}

// never print key material
impl fmt::Debug for WrappingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WrappingKey").finish_non_exhaustive()
    }
}
