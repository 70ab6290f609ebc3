//! Phone + OTP authentication.
//!
//! The provider traits describe the backend contract; [`flow::OtpFlow`] is the client-side
//! state machine a login screen (or the CLI) drives on top of a provider.
//!
//! Providers report *business* outcomes (bad phone, wrong code, unknown user) as values with
//! `success: false` and a message. `Err` is reserved for calls that never produced an answer,
//! which always surface as [`PortalError::RemoteCallFailure`](crate::PortalError).

pub mod flow;
pub mod http;
pub mod mock;

use crate::PortalResult;
use api_shared::{OtpRequestResponse, OtpVerifyResponse, RegisterReq, RegisterResponse, Role};
use async_trait::async_trait;

pub use flow::{Countdown, LoginOutcome, OtpCells, OtpFlow, OtpState, SharedOtpFlow, VerifyOutcome};
pub use http::HttpAuthProvider;
pub use mock::{KnownUser, MockPortalProvider};

/// Backend contract for requesting, verifying and resending OTPs.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn request_otp(&self, phone: &str, role: Role) -> PortalResult<OtpRequestResponse>;

    async fn verify_otp(
        &self,
        request_id: &str,
        otp: &str,
        phone: &str,
        role: Role,
    ) -> PortalResult<OtpVerifyResponse>;

    async fn resend_otp(&self, request_id: &str) -> PortalResult<OtpRequestResponse>;
}

/// Backend contract for submitting a registration.
///
/// The role-specific helpers all funnel into `register`.
#[async_trait]
pub trait RegistrationProvider: Send + Sync {
    async fn register(&self, role: Role, req: &RegisterReq) -> PortalResult<RegisterResponse>;

    async fn register_patient(&self, req: &RegisterReq) -> PortalResult<RegisterResponse> {
        self.register(Role::Patient, req).await
    }

    async fn register_doctor(&self, req: &RegisterReq) -> PortalResult<RegisterResponse> {
        self.register(Role::Doctor, req).await
    }

    async fn register_lab(&self, req: &RegisterReq) -> PortalResult<RegisterResponse> {
        self.register(Role::Lab, req).await
    }
}
