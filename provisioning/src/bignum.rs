// SPDX-License-Identifier: Apache-2.0
// Copyright 2026 Secret Provisioning Authors

//! Conversions between decimal numerals, big integers and the fixed-width
//! little-endian byte arrays the protected context keeps its key material in.

use openssl::bn::{BigNum, BigNumRef};
use std::ops::{Deref, DerefMut};
use thiserror::Error;
use zeroize::Zeroizing;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("'{0}' is not a non-negative decimal numeral")]
    InvalidDecimal(String),

    #[error("value needs {required} bytes but the field is {width} bytes wide")]
    TooWide { required: usize, width: usize },

    #[error("OpenSSL big number error")]
    OpenSSL(#[from] openssl::error::ErrorStack),
}

/// Decode a decimal numeral into its minimal big-endian byte string.
///
/// Zero decodes to an empty byte string.
pub fn decimal_to_be_bytes(numeral: &str) -> Result<Vec<u8>, CodecError> {
    if numeral.is_empty() || !numeral.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CodecError::InvalidDecimal(numeral.to_string()));
    }
    let bn = BigNum::from_dec_str(numeral)?;
    Ok(bn.to_vec())
}

/// Reverse byte order. Works for both directions.
pub fn swap_endianness(bytes: &[u8]) -> Zeroizing<Vec<u8>> {
    Zeroizing::new(bytes.iter().rev().copied().collect())
}

pub fn bignum_from_le(bytes: &[u8]) -> Result<BigNum, CodecError> {
    let be = swap_endianness(bytes);
    Ok(BigNum::from_slice(&be)?)
}

/// Export `bn` as exactly `width` little-endian bytes, zero-padded at the
/// most significant end.
pub fn bignum_to_le(
    bn: &BigNumRef,
    width: usize,
) -> Result<Zeroizing<Vec<u8>>, CodecError> {
    let required = bn.num_bytes() as usize;
    if required > width {
        return Err(CodecError::TooWide { required, width });
    }
    let be = Zeroizing::new(bn.to_vec_padded(width as i32)?);
    Ok(swap_endianness(&be))
}

/// A big number that is cleared before its memory is released.
///
/// Used for private key material so every exit path, including early
/// returns on error, wipes the value.
pub struct ClearOnDrop(BigNum);

impl ClearOnDrop {
    pub fn from_le(bytes: &[u8]) -> Result<Self, CodecError> {
        Ok(ClearOnDrop(bignum_from_le(bytes)?))
    }

    pub fn new() -> Result<Self, CodecError> {
        Ok(ClearOnDrop(BigNum::new()?))
    }

    /// Duplicate the value into a secure-heap `BigNum`, to hand ownership
    /// to an OpenSSL structure. The copy is cleared when freed, whether or
    /// not that hand-off happens.
    pub fn dup(&self) -> Result<BigNum, CodecError> {
        let mut copy = BigNum::new_secure()?;
        let be = Zeroizing::new(self.0.to_vec());
        copy.copy_from_slice(&be)?;
        if self.0.is_negative() {
            copy.set_negative(true);
        }
        Ok(copy)
    }
}

impl Deref for ClearOnDrop {
    type Target = BigNumRef;

    fn deref(&self) -> &BigNumRef {
        &self.0
    }
}

impl DerefMut for ClearOnDrop {
    fn deref_mut(&mut self) -> &mut BigNumRef {
        &mut self.0
    }
}

impl Drop for ClearOnDrop {
    fn drop(&mut self) {
        self.0.clear();
    }
}
