// SPDX-License-Identifier: Apache-2.0
// Copyright 2026 Secret Provisioning Authors

use crate::crypto::GCM_TAG_LEN;
use thiserror::Error;
use zeroize::Zeroizing;

#[derive(Debug, Error)]
pub enum AuthTagError {
    // Invalid authentication tag size
    #[error("auth tag length {0} does not correspond to an AES-GCM tag")]
    InvalidAuthTagSize(usize),
}

/// Local copy of a GCM authentication tag, wiped when dropped
#[derive(Debug, Clone)]
pub struct AuthTag {
    bytes: Zeroizing<[u8; GCM_TAG_LEN]>,
}

impl AsRef<[u8]> for AuthTag {
    fn as_ref(&self) -> &[u8] {
        self.bytes.as_slice()
    }
}

impl TryFrom<&[u8]> for AuthTag {
    type Error = AuthTagError;

    fn try_from(v: &[u8]) -> std::result::Result<Self, Self::Error> {
        let bytes: [u8; GCM_TAG_LEN] = v
            .try_into()
            .map_err(|_| AuthTagError::InvalidAuthTagSize(v.len()))?;
        Ok(AuthTag {
            bytes: Zeroizing::new(bytes),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert() {
        let a: [u8; GCM_TAG_LEN] = [0xAA; GCM_TAG_LEN];
        let invalid: [u8; 48] = [0xBB; 48];

        let r = AuthTag::try_from(a.as_ref());
        assert!(r.is_ok());
        assert_eq!(r.unwrap().as_ref(), &a); //#[allow_ci]

        let r = AuthTag::try_from(invalid.as_ref());
        assert!(matches!(r, Err(AuthTagError::InvalidAuthTagSize(48))));
    }
}
