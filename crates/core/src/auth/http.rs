//! Auth and registration over HTTP.
//!
//! Speaks the JSON contract served by `api-rest`, so any backend exposing the same routes can
//! stand in for the mock.

use super::{AuthProvider, RegistrationProvider};
use crate::{PortalError, PortalResult};
use api_shared::{
    OtpRequestResponse, OtpVerifyResponse, RegisterReq, RegisterResponse, RequestOtpReq,
    ResendOtpReq, Role, VerifyOtpReq,
};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

/// HTTP client for the auth/registration routes.
#[derive(Clone, Debug)]
pub struct HttpAuthProvider {
    base_url: String,
    client: reqwest::Client,
}

impl HttpAuthProvider {
    /// Create a provider pointing at `base_url` (e.g. `http://localhost:3000`).
    ///
    /// # Errors
    ///
    /// Returns `PortalError::RemoteCallFailure` if the HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> PortalResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> PortalResult<R>
    where
        B: Serialize + Sync + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await?
            .error_for_status()
            .map_err(|e| PortalError::RemoteCallFailure(format!("POST {path}: {e}")))?;

        Ok(response.json::<R>().await?)
    }
}

#[async_trait]
impl AuthProvider for HttpAuthProvider {
    async fn request_otp(&self, phone: &str, role: Role) -> PortalResult<OtpRequestResponse> {
        let body = RequestOtpReq {
            phone: phone.to_string(),
            role,
        };
        self.post("/auth/otp/request", &body).await
    }

    async fn verify_otp(
        &self,
        request_id: &str,
        otp: &str,
        phone: &str,
        role: Role,
    ) -> PortalResult<OtpVerifyResponse> {
        let body = VerifyOtpReq {
            request_id: request_id.to_string(),
            otp: otp.to_string(),
            phone: phone.to_string(),
            role,
        };
        self.post("/auth/otp/verify", &body).await
    }

    async fn resend_otp(&self, request_id: &str) -> PortalResult<OtpRequestResponse> {
        let body = ResendOtpReq {
            request_id: request_id.to_string(),
        };
        self.post("/auth/otp/resend", &body).await
    }
}

#[async_trait]
impl RegistrationProvider for HttpAuthProvider {
    async fn register(&self, role: Role, req: &RegisterReq) -> PortalResult<RegisterResponse> {
        self.post(&format!("/register/{role}"), req).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unreachable_server_is_remote_failure() {
        // Port 9 (discard) on localhost is not expected to run an HTTP server.
        let provider =
            HttpAuthProvider::new("http://127.0.0.1:9/", Duration::from_millis(500)).unwrap();
        let err = provider
            .request_otp("9876543210", Role::Patient)
            .await
            .unwrap_err();
        assert!(matches!(err, PortalError::RemoteCallFailure(_)));
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let provider =
            HttpAuthProvider::new("http://localhost:3000/", Duration::from_secs(1)).unwrap();
        assert_eq!(provider.base_url, "http://localhost:3000");
    }
}
