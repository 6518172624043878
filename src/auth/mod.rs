// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Shared-secret checks for the endpoints that inject data on behalf of
//! backend services: publishing notifications and queueing push tasks.
//! Exchange endpoints are open; possession of the exchange id is the
//! capability.
//!
//! - `POST /sse` carries the key in the JSON body (`key`)
//! - `POST /push` carries it in the `x-api-key` header ([`ServiceKey`])

pub mod error;
pub mod extractor;

pub use error::AuthError;
pub use extractor::{ServiceKey, SERVICE_KEY_HEADER};

/// Check `provided` against the configured service key.
pub fn verify_service_key(configured: Option<&str>, provided: Option<&str>) -> Result<(), AuthError> {
    let expected = configured.ok_or(AuthError::NotConfigured)?;
    let provided = provided.ok_or(AuthError::MissingKey)?;
    if provided.as_bytes() == expected.as_bytes() {
        Ok(())
    } else {
        Err(AuthError::InvalidKey)
    }
}
