// SPDX-License-Identifier: Apache-2.0
// Copyright 2026 Secret Provisioning Authors

use crate::crypto::{GCM_IV_LEN, GCM_TAG_LEN};
use thiserror::Error;
use zeroize::Zeroizing;

#[derive(Debug, Error)]
pub enum WrappedSecretError {
    #[error(
        "wrapped secret of {length} bytes is shorter than IV and tag \
         ({min} bytes)"
    )]
    TooShort { length: usize, min: usize },
}

/// Secret wrapped under the SWK, laid out on the wire as
/// `IV(12) || ciphertext(n) || TAG(16)` without length prefixes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrappedSecret {
    iv: [u8; GCM_IV_LEN],
    ciphertext: Vec<u8>,
    tag: Zeroizing<[u8; GCM_TAG_LEN]>,
}

impl WrappedSecret {
    pub const OVERHEAD: usize = GCM_IV_LEN + GCM_TAG_LEN;

    pub fn new(
        iv: [u8; GCM_IV_LEN],
        ciphertext: Vec<u8>,
        tag: [u8; GCM_TAG_LEN],
    ) -> Self {
        WrappedSecret {
            iv,
            ciphertext,
            tag: Zeroizing::new(tag),
        }
    }

    pub fn iv(&self) -> &[u8] {
        &self.iv
    }

    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    pub fn tag(&self) -> &[u8] {
        self.tag.as_slice()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut result = Vec::with_capacity(
            self.iv.len() + self.ciphertext.len() + self.tag.len(),
        );
        result.extend(&self.iv);
        result.extend(&self.ciphertext);
        result.extend(self.tag.iter());
        result
    }
}

impl TryFrom<&[u8]> for WrappedSecret {
    type Error = WrappedSecretError;

    fn try_from(v: &[u8]) -> std::result::Result<Self, Self::Error> {
        let length = v.len();
        if length < Self::OVERHEAD {
            return Err(WrappedSecretError::TooShort {
                length,
                min: Self::OVERHEAD,
            });
        }
        let (iv, rest) = v.split_at(GCM_IV_LEN);
        let (ciphertext, tag) = rest.split_at(rest.len() - GCM_TAG_LEN);

        let mut wrapped = WrappedSecret {
            iv: [0u8; GCM_IV_LEN],
            ciphertext: ciphertext.to_vec(),
            tag: Zeroizing::new([0u8; GCM_TAG_LEN]),
        };
        wrapped.iv.copy_from_slice(iv);
        wrapped.tag.copy_from_slice(tag);
        Ok(wrapped)
    }
}
