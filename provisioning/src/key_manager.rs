// SPDX-License-Identifier: Apache-2.0
// Copyright 2026 Secret Provisioning Authors

//! RSA key pair owned by the protected context.
//!
//! The pair is generated lazily, at most once per context, and kept as
//! fixed-width little-endian component arrays. Only the public exponent and
//! modulus ever leave. The private key object used for unwrapping is rebuilt
//! from the CRT components whenever it is needed.

use crate::{
    bignum::{bignum_from_le, bignum_to_le, ClearOnDrop, CodecError},
    error::{ProvisioningError, Result},
};
use log::*;
use openssl::{
    bn::{BigNum, BigNumContext},
    pkey::{PKey, Private, Public},
    rsa::{Rsa, RsaRef},
};
use std::fmt;
use zeroize::Zeroizing;

/// Modulus size in bytes (RSA-3072)
pub const RSA_MODULUS_SIZE: usize = 384;
/// Public exponent size in bytes
pub const RSA_EXPONENT_SIZE: usize = 4;
pub const RSA_PUBLIC_EXPONENT: u32 = 0x10001;
/// Size of each CRT component (p, q, dmp1, dmq1, iqmp)
pub const RSA_FACTOR_SIZE: usize = RSA_MODULUS_SIZE / 2;

/// Public half of the context key, as published to the remote party
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    exponent: [u8; RSA_EXPONENT_SIZE],
    modulus: Vec<u8>,
}

impl PublicKey {
    pub const ENCODED_LEN: usize = RSA_EXPONENT_SIZE + RSA_MODULUS_SIZE;

    pub fn exponent(&self) -> &[u8] {
        &self.exponent
    }

    pub fn modulus(&self) -> &[u8] {
        &self.modulus
    }

    /// `exponent(4) || modulus(384)`, both little-endian
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::ENCODED_LEN);
        out.extend(&self.exponent);
        out.extend(&self.modulus);
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != Self::ENCODED_LEN {
            return Err(ProvisioningError::InvalidParameter(format!(
                "public key must be {} bytes, got {}",
                Self::ENCODED_LEN,
                bytes.len()
            )));
        }
        let (e, n) = bytes.split_at(RSA_EXPONENT_SIZE);
        let mut exponent = [0u8; RSA_EXPONENT_SIZE];
        exponent.copy_from_slice(e);
        Ok(PublicKey {
            exponent,
            modulus: n.to_vec(),
        })
    }

    /// Build an OpenSSL public key, e.g. for the remote party to wrap the SWK
    pub fn to_pkey(&self) -> std::result::Result<PKey<Public>, CodecError> {
        let n = bignum_from_le(&self.modulus)?;
        let e = bignum_from_le(&self.exponent)?;
        let rsa = Rsa::from_public_components(n, e)?;
        Ok(PKey::from_rsa(rsa)?)
    }
}

/// Borrowed view over the components needed to rebuild the private key.
/// All slices are little-endian.
pub struct CrtComponents<'a> {
    pub exponent: &'a [u8],
    pub p: &'a [u8],
    pub q: &'a [u8],
    pub dmp1: &'a [u8],
    pub dmq1: &'a [u8],
    pub iqmp: &'a [u8],
}

pub struct KeyPair {
    modulus: Vec<u8>,
    exponent: [u8; RSA_EXPONENT_SIZE],
    p: Zeroizing<Vec<u8>>,
    q: Zeroizing<Vec<u8>>,
    dmp1: Zeroizing<Vec<u8>>,
    dmq1: Zeroizing<Vec<u8>>,
    iqmp: Zeroizing<Vec<u8>>,
}

impl KeyPair {
    /// Export all components of an OpenSSL RSA key into fixed-width arrays
    pub fn from_rsa(rsa: &RsaRef<Private>) -> Result<Self> {
        let missing = |name: &str| {
            ProvisioningError::KeyGenerationFailed(format!(
                "generated key has no {name} component"
            ))
        };
        let export = |bn: &openssl::bn::BigNumRef, width: usize| {
            bignum_to_le(bn, width).map_err(|e| {
                ProvisioningError::KeyGenerationFailed(e.to_string())
            })
        };

        let e = export(rsa.e(), RSA_EXPONENT_SIZE)?;
        let mut exponent = [0u8; RSA_EXPONENT_SIZE];
        exponent.copy_from_slice(&e);

        Ok(KeyPair {
            modulus: export(rsa.n(), RSA_MODULUS_SIZE)?.to_vec(),
            exponent,
            p: export(rsa.p().ok_or_else(|| missing("p"))?, RSA_FACTOR_SIZE)?,
            q: export(rsa.q().ok_or_else(|| missing("q"))?, RSA_FACTOR_SIZE)?,
            dmp1: export(
                rsa.dmp1().ok_or_else(|| missing("dmp1"))?,
                RSA_FACTOR_SIZE,
            )?,
            dmq1: export(
                rsa.dmq1().ok_or_else(|| missing("dmq1"))?,
                RSA_FACTOR_SIZE,
            )?,
            iqmp: export(
                rsa.iqmp().ok_or_else(|| missing("iqmp"))?,
                RSA_FACTOR_SIZE,
            )?,
        })
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey {
            exponent: self.exponent,
            modulus: self.modulus.clone(),
        }
    }

    pub fn crt_components(&self) -> CrtComponents<'_> {
        CrtComponents {
            exponent: &self.exponent,
            p: &self.p,
            q: &self.q,
            dmp1: &self.dmp1,
            dmq1: &self.dmq1,
            iqmp: &self.iqmp,
        }
    }

    pub fn private_key(&self) -> Result<PKey<Private>> {
        reconstruct_private_key(
            RSA_MODULUS_SIZE,
            RSA_EXPONENT_SIZE,
            &self.crt_components(),
        )
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("exponent", &hex::encode(self.exponent))
            .field("modulus_len", &self.modulus.len())
            .finish_non_exhaustive()
    }
}

fn construction_error(e: CodecError) -> ProvisioningError {
    match e {
        CodecError::OpenSSL(source) => {
            ProvisioningError::KeyConstructionFailed(source)
        }
        other => ProvisioningError::InvalidParameter(other.to_string()),
    }
}

/// Rebuild an RSA private key from its exponent and CRT components.
///
/// The private exponent is recomputed as `d = e^-1 mod (n - p - q + 1)`,
/// with `d` and `e` flagged for constant-time arithmetic. Every intermediate
/// big number is cleared when it goes out of scope, on success and on every
/// error path.
pub fn reconstruct_private_key(
    modulus_size: usize,
    exponent_size: usize,
    components: &CrtComponents<'_>,
) -> Result<PKey<Private>> {
    if modulus_size == 0 || exponent_size == 0 || modulus_size % 2 != 0 {
        return Err(ProvisioningError::InvalidParameter(format!(
            "invalid RSA sizes: modulus {modulus_size}, exponent {exponent_size}"
        )));
    }
    if components.exponent.len() != exponent_size {
        return Err(ProvisioningError::InvalidParameter(format!(
            "exponent must be {exponent_size} bytes, got {}",
            components.exponent.len()
        )));
    }
    let factor_size = modulus_size / 2;
    for (name, value) in [
        ("p", components.p),
        ("q", components.q),
        ("dmp1", components.dmp1),
        ("dmq1", components.dmq1),
        ("iqmp", components.iqmp),
    ] {
        if value.len() != factor_size {
            return Err(ProvisioningError::InvalidParameter(format!(
                "CRT component {name} must be {factor_size} bytes, got {}",
                value.len()
            )));
        }
    }

    let mut ctx = BigNumContext::new()
        .map_err(ProvisioningError::KeyConstructionFailed)?;

    let p = ClearOnDrop::from_le(components.p).map_err(construction_error)?;
    let q = ClearOnDrop::from_le(components.q).map_err(construction_error)?;
    let dmp1 =
        ClearOnDrop::from_le(components.dmp1).map_err(construction_error)?;
    let dmq1 =
        ClearOnDrop::from_le(components.dmq1).map_err(construction_error)?;
    let iqmp =
        ClearOnDrop::from_le(components.iqmp).map_err(construction_error)?;
    let mut e =
        ClearOnDrop::from_le(components.exponent).map_err(construction_error)?;

    let mut n = ClearOnDrop::new().map_err(construction_error)?;
    n.checked_mul(&p, &q, &mut ctx)
        .map_err(ProvisioningError::KeyConstructionFailed)?;

    // phi(n) = n - p - q + 1
    let mut n_minus_p = ClearOnDrop::new().map_err(construction_error)?;
    n_minus_p
        .checked_sub(&n, &p)
        .map_err(ProvisioningError::KeyConstructionFailed)?;
    let mut phi = ClearOnDrop::new().map_err(construction_error)?;
    phi.checked_sub(&n_minus_p, &q)
        .map_err(ProvisioningError::KeyConstructionFailed)?;
    phi.add_word(1)
        .map_err(ProvisioningError::KeyConstructionFailed)?;

    phi.set_const_time();
    e.set_const_time();

    let mut d = ClearOnDrop::new().map_err(construction_error)?;
    d.set_const_time();
    d.mod_inverse(&e, &phi, &mut ctx)
        .map_err(ProvisioningError::KeyConstructionFailed)?;

    let mut d_owned = d.dup().map_err(construction_error)?;
    d_owned.set_const_time();
    let mut e_owned = e.dup().map_err(construction_error)?;
    e_owned.set_const_time();

    let rsa = Rsa::from_private_components(
        n.dup().map_err(construction_error)?,
        e_owned,
        d_owned,
        p.dup().map_err(construction_error)?,
        q.dup().map_err(construction_error)?,
        dmp1.dup().map_err(construction_error)?,
        dmq1.dup().map_err(construction_error)?,
        iqmp.dup().map_err(construction_error)?,
    )
    .map_err(ProvisioningError::KeyConstructionFailed)?;

    PKey::from_rsa(rsa).map_err(ProvisioningError::KeyConstructionFailed)
}

/// Source of fresh key pairs
pub trait KeyPairGenerator: Send {
    fn generate(&self) -> Result<KeyPair>;
}

/// Generates RSA-3072 key pairs with public exponent 65537 using OpenSSL
#[derive(Debug, Default, Clone, Copy)]
pub struct OpensslKeyPairGenerator;

impl KeyPairGenerator for OpensslKeyPairGenerator {
    fn generate(&self) -> Result<KeyPair> {
        let to_err = |e: openssl::error::ErrorStack| {
            ProvisioningError::KeyGenerationFailed(e.to_string())
        };
        let e = BigNum::from_u32(RSA_PUBLIC_EXPONENT).map_err(to_err)?;
        let rsa = Rsa::generate_with_e((RSA_MODULUS_SIZE * 8) as u32, &e)
            .map_err(to_err)?;
        KeyPair::from_rsa(&rsa)
    }
}

/// Owns the context's key pair and the generator that creates it
pub struct KeyManager {
    generator: Box<dyn KeyPairGenerator>,
    key_pair: Option<KeyPair>,
    generation_failed: bool,
}

impl Default for KeyManager {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyManager {
    pub fn new() -> Self {
        Self::with_generator(Box::new(OpensslKeyPairGenerator))
    }

    pub fn with_generator(generator: Box<dyn KeyPairGenerator>) -> Self {
        KeyManager {
            generator,
            key_pair: None,
            generation_failed: false,
        }
    }

    /// Return the public key, generating the key pair on first use.
    ///
    /// A generation failure is permanent for this manager: later calls fail
    /// with `KeyGenerationFailed` without invoking the generator again.
    pub fn public_key(&mut self) -> Result<PublicKey> {
        if let Some(key_pair) = &self.key_pair {
            return Ok(key_pair.public_key());
        }
        if self.generation_failed {
            return Err(ProvisioningError::KeyGenerationFailed(
                "key generation already failed for this context".into(),
            ));
        }

        info!("Generating RSA-{} key pair", RSA_MODULUS_SIZE * 8);
        match self.generator.generate() {
            Ok(key_pair) => {
                let public = key_pair.public_key();
                self.key_pair = Some(key_pair);
                Ok(public)
            }
            Err(e) => {
                error!("RSA key pair creation failed: {e}");
                self.generation_failed = true;
                Err(e)
            }
        }
    }

    pub fn key_pair(&self) -> Option<&KeyPair> {
        self.key_pair.as_ref()
    }

    /// Rebuild the private key of the resident key pair
    pub fn private_key(&self) -> Result<PKey<Private>> {
        match &self.key_pair {
            Some(key_pair) => key_pair.private_key(),
            None => Err(ProvisioningError::NotProvisioned(
                "no RSA key pair has been created".into(),
            )),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, OnceLock,
    };

    // RSA-3072 generation is slow; tests share one reference key
    fn reference_rsa() -> &'static Rsa<Private> {
        static RSA: OnceLock<Rsa<Private>> = OnceLock::new();
        RSA.get_or_init(|| {
            let e = BigNum::from_u32(RSA_PUBLIC_EXPONENT)
                .expect("failed to create exponent");
            Rsa::generate_with_e((RSA_MODULUS_SIZE * 8) as u32, &e)
                .expect("failed to generate RSA key")
        })
    }

    /// Generator returning copies of a shared key, counting invocations
    #[derive(Clone, Default)]
    pub struct CountingGenerator {
        pub calls: Arc<AtomicUsize>,
    }

    impl KeyPairGenerator for CountingGenerator {
        fn generate(&self) -> Result<KeyPair> {
            let _ = self.calls.fetch_add(1, Ordering::SeqCst);
            KeyPair::from_rsa(reference_rsa())
        }
    }

    pub struct FailingGenerator {
        pub calls: Arc<AtomicUsize>,
    }

    impl KeyPairGenerator for FailingGenerator {
        fn generate(&self) -> Result<KeyPair> {
            let _ = self.calls.fetch_add(1, Ordering::SeqCst);
            Err(ProvisioningError::KeyGenerationFailed(
                "entropy source unavailable".into(),
            ))
        }
    }

    pub fn key_manager() -> KeyManager {
        KeyManager::with_generator(Box::new(CountingGenerator::default()))
    }
}
