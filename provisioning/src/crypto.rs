// SPDX-License-Identifier: Apache-2.0
// Copyright 2026 Secret Provisioning Authors

pub mod auth_tag;
pub mod wrapped_secret;
pub mod wrapping_key;

use crate::error::{ProvisioningError, Result};
use auth_tag::AuthTag;
use log::*;
use openssl::{
    encrypt::Decrypter,
    hash::MessageDigest,
    pkey::{PKeyRef, Private},
    rsa::Padding,
    sha::Sha256,
    symm::{Cipher, Crypter, Mode},
};
use zeroize::Zeroizing;

pub const AES_256_KEY_LEN: usize = 32;
pub const GCM_IV_LEN: usize = 12;
pub const GCM_TAG_LEN: usize = 16;
pub const SHA256_DIGEST_LEN: usize = 32;

/// Largest buffer accepted by the cipher primitives
const MAX_CRYPTO_INPUT_LEN: usize = i32::MAX as usize;

/// Allocate a zeroizing buffer, reporting allocation failure instead of
/// aborting.
pub(crate) fn secret_buffer(size: usize) -> Result<Zeroizing<Vec<u8>>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(size)
        .map_err(|_| ProvisioningError::ResourceExhausted { size })?;
    buf.resize(size, 0u8);
    Ok(Zeroizing::new(buf))
}

/// SHA-256 over the concatenation of all `parts`
pub fn sha256_concat(parts: &[&[u8]]) -> [u8; SHA256_DIGEST_LEN] {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finish()
}

/*
 * Inputs: 256 bit key
 *         ciphertext
 *         96 bit nonce
 *         optional associated data
 *         128 bit authentication tag
 * Output: plaintext
 *
 * Decrypt AES-256-GCM ciphertext. All parameters are checked before any
 * cipher state is created. When the tag does not match, the partial
 * plaintext is wiped and only AuthenticationFailed is returned.
 */
pub fn decrypt_aes256_gcm(
    key: &[u8],
    ciphertext: &[u8],
    nonce: &[u8],
    aad: Option<&[u8]>,
    tag: &[u8],
) -> Result<Zeroizing<Vec<u8>>> {
    if ciphertext.len() >= MAX_CRYPTO_INPUT_LEN {
        return Err(ProvisioningError::InvalidParameter(format!(
            "ciphertext length {} is too large",
            ciphertext.len()
        )));
    }
    if let Some(aad) = aad {
        if aad.len() >= MAX_CRYPTO_INPUT_LEN {
            return Err(ProvisioningError::InvalidParameter(format!(
                "associated data length {} is too large",
                aad.len()
            )));
        }
    }
    if key.len() != AES_256_KEY_LEN {
        return Err(ProvisioningError::InvalidParameter(format!(
            "invalid AES-256 key length {}",
            key.len()
        )));
    }
    if nonce.len() != GCM_IV_LEN {
        return Err(ProvisioningError::InvalidParameter(format!(
            "invalid GCM nonce length {}",
            nonce.len()
        )));
    }
    let tag = AuthTag::try_from(tag)
        .map_err(|e| ProvisioningError::InvalidParameter(e.to_string()))?;

    let cipher = Cipher::aes_256_gcm();
    let mut crypter = Crypter::new(cipher, Mode::Decrypt, key, Some(nonce))
        .map_err(|source| ProvisioningError::CipherFailure {
            message: "failed to initialize AES-256-GCM decryption".into(),
            source,
        })?;

    if let Some(aad) = aad {
        crypter
            .aad_update(aad)
            .map_err(|source| ProvisioningError::CipherFailure {
                message: "failed to add associated data".into(),
                source,
            })?;
    }

    let mut plaintext = secret_buffer(ciphertext.len() + cipher.block_size())?;
    let mut written = crypter.update(ciphertext, &mut plaintext[..]).map_err(
        |source| ProvisioningError::CipherFailure {
            message: "failed to decrypt ciphertext".into(),
            source,
        },
    )?;

    crypter.set_tag(tag.as_ref()).map_err(|source| {
        ProvisioningError::CipherFailure {
            message: "failed to set expected authentication tag".into(),
            source,
        }
    })?;

    // Dropping `plaintext` on this path wipes whatever was produced
    written += crypter
        .finalize(&mut plaintext[written..])
        .map_err(|_| ProvisioningError::AuthenticationFailed)?;
    plaintext.truncate(written);

    Ok(plaintext)
}

fn oaep_sha256_decrypter<'a>(
    priv_key: &'a PKeyRef<Private>,
) -> Result<Decrypter<'a>> {
    let mut decrypter = Decrypter::new(priv_key).map_err(|source| {
        ProvisioningError::CipherFailure {
            message: "failed to create RSA decrypter object".into(),
            source,
        }
    })?;
    decrypter.set_rsa_padding(Padding::PKCS1_OAEP).map_err(|source| {
        ProvisioningError::CipherFailure {
            message: "failed to set RSA decrypter padding".into(),
            source,
        }
    })?;
    decrypter
        .set_rsa_oaep_md(MessageDigest::sha256())
        .map_err(|source| ProvisioningError::CipherFailure {
            message:
                "failed to set RSA decrypter OAEP Message Digest algorithm"
                    .into(),
            source,
        })?;
    decrypter
        .set_rsa_mgf1_md(MessageDigest::sha256())
        .map_err(|source| ProvisioningError::CipherFailure {
            message: "failed to set RSA decrypter MGF1 Message Digest algorithm"
                .into(),
            source,
        })?;
    Ok(decrypter)
}

/// Decrypt RSA-OAEP (SHA-256 for both the padding hash and MGF1).
///
/// Two-phase: with `out` set to `None` only the required output length is
/// returned. With a buffer, the plaintext is written into it and its actual
/// length returned. A buffer shorter than the required length is an
/// `InvalidParameter`, distinct from any cryptographic failure.
pub fn rsa_oaep_sha256_decrypt_into(
    priv_key: &PKeyRef<Private>,
    data: &[u8],
    out: Option<&mut [u8]>,
) -> Result<usize> {
    if data.is_empty() || data.len() >= MAX_CRYPTO_INPUT_LEN {
        return Err(ProvisioningError::InvalidParameter(format!(
            "invalid RSA ciphertext length {}",
            data.len()
        )));
    }

    let decrypter = oaep_sha256_decrypter(priv_key)?;
    let required = decrypter
        .decrypt_len(data)
        .map_err(|_| ProvisioningError::DecryptionFailed)?;

    let out = match out {
        None => return Ok(required),
        Some(out) => out,
    };
    if out.len() < required {
        return Err(ProvisioningError::InvalidParameter(format!(
            "output buffer of {} bytes is smaller than the required {required}",
            out.len()
        )));
    }

    // OpenSSL reports padding errors in detail; callers only get one answer
    decrypter.decrypt(data, out).map_err(|e| {
        debug!("RSA OAEP decryption rejected: {} error(s)", e.errors().len());
        ProvisioningError::DecryptionFailed
    })
}

/// Size query followed by decryption into an exactly sized buffer
pub fn rsa_oaep_sha256_decrypt(
    priv_key: &PKeyRef<Private>,
    data: &[u8],
) -> Result<Zeroizing<Vec<u8>>> {
    let required = rsa_oaep_sha256_decrypt_into(priv_key, data, None)?;
    let mut decrypted = secret_buffer(required)?;
    let len = rsa_oaep_sha256_decrypt_into(
        priv_key,
        data,
        Some(&mut decrypted[..]),
    )?;
    decrypted.truncate(len);
    Ok(decrypted)
}

/// Counterparts of the decryption primitives, as used by the remote party
/// that provisions the context.
pub mod testing {
    use super::*;
    use crate::crypto::wrapped_secret::WrappedSecret;
    use openssl::{
        encrypt::Encrypter,
        pkey::{PKeyRef, Public},
    };
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum CryptoTestError {
        /// OpenSSL error
        #[error("OpenSSL error")]
        OpenSSLError(#[from] openssl::error::ErrorStack),

        /// Invalid key length
        #[error("Invalid key length: expected {expected} got {got}")]
        InvalidKeyLen { expected: usize, got: usize },

        /// Invalid IV length
        #[error("Invalid IV length: expected {expected} got {got}")]
        InvalidIVLen { expected: usize, got: usize },
    }

    pub fn rsa_oaep_sha256_encrypt(
        pub_key: &PKeyRef<Public>,
        data: &[u8],
    ) -> Result<Vec<u8>, CryptoTestError> {
        let mut encrypter = Encrypter::new(pub_key)?;

        encrypter.set_rsa_padding(Padding::PKCS1_OAEP)?;
        encrypter.set_rsa_mgf1_md(MessageDigest::sha256())?;
        encrypter.set_rsa_oaep_md(MessageDigest::sha256())?;

        // Create an output buffer
        let buffer_len = encrypter.encrypt_len(data)?;
        let mut encrypted = vec![0; buffer_len];

        // Encrypt and truncate the buffer
        let encrypted_len = encrypter.encrypt(data, &mut encrypted)?;
        encrypted.truncate(encrypted_len);

        Ok(encrypted)
    }

    /// Encrypt with AES-256-GCM, returning the ciphertext and the tag
    pub fn encrypt_aes256_gcm(
        key: &[u8],
        iv: &[u8],
        aad: &[u8],
        data: &[u8],
    ) -> Result<(Vec<u8>, [u8; GCM_TAG_LEN]), CryptoTestError> {
        if key.len() != AES_256_KEY_LEN {
            return Err(CryptoTestError::InvalidKeyLen {
                expected: AES_256_KEY_LEN,
                got: key.len(),
            });
        }
        if iv.len() != GCM_IV_LEN {
            return Err(CryptoTestError::InvalidIVLen {
                expected: GCM_IV_LEN,
                got: iv.len(),
            });
        }
        let mut tag = [0u8; GCM_TAG_LEN];
        let ciphertext = openssl::symm::encrypt_aead(
            Cipher::aes_256_gcm(),
            key,
            Some(iv),
            aad,
            data,
            &mut tag,
        )?;
        Ok((ciphertext, tag))
    }

    /// Produce the `IV || ciphertext || TAG` layout expected by
    /// `Provisioner::unwrap_secret`
    pub fn wrap_secret(
        key: &[u8],
        iv: &[u8],
        secret: &[u8],
    ) -> Result<Vec<u8>, CryptoTestError> {
        let (ciphertext, tag) = encrypt_aes256_gcm(key, iv, &[], secret)?;
        let mut iv_arr = [0u8; GCM_IV_LEN];
        iv_arr.copy_from_slice(iv);
        Ok(WrappedSecret::new(iv_arr, ciphertext, tag).to_bytes())
    }
}
