// SPDX-License-Identifier: Apache-2.0
// Copyright 2026 Secret Provisioning Authors

pub mod attestation;
pub mod bignum;
pub mod config;
pub mod context;
pub mod crypto;
pub mod error;
pub mod key_manager;
pub mod provisioning;
pub mod report;

pub use context::ProtectedContext;
pub use error::{ProvisioningError, Result};
pub use provisioning::ProvisioningState;
