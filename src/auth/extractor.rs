// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractor for the service key header.
//!
//! ```rust,ignore
//! async fn my_handler(_key: ServiceKey, State(state): State<AppState>) -> impl IntoResponse {
//!     // only reached with a valid `x-api-key`
//! }
//! ```

use axum::{extract::FromRequestParts, http::request::Parts};

use super::{verify_service_key, AuthError};
use crate::state::AppState;

pub const SERVICE_KEY_HEADER: &str = "x-api-key";

/// Proof that the request carried the configured service key.
pub struct ServiceKey;

impl FromRequestParts<AppState> for ServiceKey {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let provided = parts
            .headers
            .get(SERVICE_KEY_HEADER)
            .map(|value| value.to_str().map_err(|_| AuthError::InvalidKey))
            .transpose()?;

        verify_service_key(state.api_key.as_deref(), provided)?;
        Ok(ServiceKey)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(state: &AppState, key: Option<&str>) -> Result<ServiceKey, AuthError> {
        let mut builder = Request::builder().uri("/push");
        if let Some(key) = key {
            builder = builder.header(SERVICE_KEY_HEADER, key);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        ServiceKey::from_request_parts(&mut parts, state).await
    }

    #[tokio::test]
    async fn accepts_matching_header() {
        let state = AppState::default().with_api_key("s3cret");
        assert!(extract(&state, Some("s3cret")).await.is_ok());
    }

    #[tokio::test]
    async fn rejects_missing_and_wrong_header() {
        let state = AppState::default().with_api_key("s3cret");
        assert_eq!(extract(&state, None).await.err(), Some(AuthError::MissingKey));
        assert_eq!(
            extract(&state, Some("guess")).await.err(),
            Some(AuthError::InvalidKey)
        );
    }

    #[tokio::test]
    async fn unconfigured_relay_rejects_everything() {
        let state = AppState::default();
        assert_eq!(
            extract(&state, Some("anything")).await.err(),
            Some(AuthError::NotConfigured)
        );
    }
}
