//! In-process auth and registration backend.
//!
//! Accepts the fixed code [`MOCK_OTP_CODE`] and knows a small set of seeded users. It is both
//! the test double for the flow and the backend the REST API serves when no real identity
//! service exists.

use super::{AuthProvider, RegistrationProvider};
use crate::constants::{
    DEFAULT_OTP_EXPIRY_SECS, MOCK_OTP_CODE, MSG_INVALID_OTP, MSG_INVALID_PHONE,
};
use crate::PortalResult;
use api_shared::{
    AuthUser, OtpRequestResponse, OtpVerifyResponse, RegisterReq, RegisterResponse, Role,
};
use async_trait::async_trait;
use portal_types::PhoneNumber;
use std::sync::RwLock;
use std::time::Duration;
use uuid::Uuid;

/// A user the mock backend recognises after OTP verification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KnownUser {
    pub id: String,
    pub phone: String,
    pub role: Role,
}

impl KnownUser {
    fn to_auth_user(&self) -> AuthUser {
        AuthUser {
            id: self.id.clone(),
            phone: self.phone.clone(),
            role: self.role,
        }
    }
}

/// Seeded users, one per role.
pub fn default_known_users() -> Vec<KnownUser> {
    vec![
        KnownUser {
            id: "user_patient_1".into(),
            phone: "9876543210".into(),
            role: Role::Patient,
        },
        KnownUser {
            id: "user_doctor_1".into(),
            phone: "9876543211".into(),
            role: Role::Doctor,
        },
        KnownUser {
            id: "user_lab_1".into(),
            phone: "9876543212".into(),
            role: Role::Lab,
        },
    ]
}

fn unique_suffix() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Mock implementation of [`AuthProvider`] and [`RegistrationProvider`].
///
/// Every call sleeps for `delay` first so UI-facing callers can observe in-flight states.
/// Successful registrations are remembered, so the next login for the same phone and role
/// reports `userExists = true`.
#[derive(Debug)]
pub struct MockPortalProvider {
    users: RwLock<Vec<KnownUser>>,
    accepted_code: String,
    expires_in: u32,
    delay: Duration,
}

impl Default for MockPortalProvider {
    fn default() -> Self {
        Self::new(default_known_users())
    }
}

impl MockPortalProvider {
    pub fn new(users: Vec<KnownUser>) -> Self {
        Self {
            users: RwLock::new(users),
            accepted_code: MOCK_OTP_CODE.into(),
            expires_in: DEFAULT_OTP_EXPIRY_SECS,
            delay: Duration::ZERO,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_expiry(mut self, expires_in: u32) -> Self {
        self.expires_in = expires_in;
        self
    }

    /// Looks up a known user by phone and role.
    pub fn find_user(&self, phone: &str, role: Role) -> Option<KnownUser> {
        self.users
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .find(|u| u.phone == phone && u.role == role)
            .cloned()
    }

    async fn simulate_latency(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

#[async_trait]
impl AuthProvider for MockPortalProvider {
    async fn request_otp(&self, phone: &str, role: Role) -> PortalResult<OtpRequestResponse> {
        self.simulate_latency().await;

        if PhoneNumber::parse(phone).is_err() {
            return Ok(OtpRequestResponse::rejected(MSG_INVALID_PHONE));
        }

        let request_id = format!("req_{}_{}_{}", role, phone, unique_suffix());
        tracing::info!("otp issued for {} login", role);
        Ok(OtpRequestResponse::issued(request_id, self.expires_in))
    }

    async fn verify_otp(
        &self,
        request_id: &str,
        otp: &str,
        phone: &str,
        role: Role,
    ) -> PortalResult<OtpVerifyResponse> {
        self.simulate_latency().await;

        if otp != self.accepted_code {
            tracing::info!("otp rejected for request {}", request_id);
            return Ok(OtpVerifyResponse::rejected(MSG_INVALID_OTP));
        }

        match self.find_user(phone, role) {
            Some(user) => Ok(OtpVerifyResponse {
                success: true,
                user_exists: Some(true),
                token: Some(format!("auth_token_{}", unique_suffix())),
                user: Some(user.to_auth_user()),
                message: None,
            }),
            None => Ok(OtpVerifyResponse {
                success: true,
                user_exists: Some(false),
                ..OtpVerifyResponse::default()
            }),
        }
    }

    async fn resend_otp(&self, _request_id: &str) -> PortalResult<OtpRequestResponse> {
        self.simulate_latency().await;

        let request_id = format!("req_resend_{}", unique_suffix());
        Ok(OtpRequestResponse::issued(request_id, self.expires_in))
    }
}

#[async_trait]
impl RegistrationProvider for MockPortalProvider {
    async fn register(&self, role: Role, req: &RegisterReq) -> PortalResult<RegisterResponse> {
        self.simulate_latency().await;

        if PhoneNumber::parse(&req.phone).is_err() {
            return Ok(RegisterResponse {
                success: false,
                message: Some(MSG_INVALID_PHONE.into()),
                ..RegisterResponse::default()
            });
        }

        let user = KnownUser {
            id: format!("user_{}_{}", role, unique_suffix()),
            phone: req.phone.clone(),
            role,
        };

        tracing::info!(
            "registered {} user {} at completion step {}",
            role,
            user.id,
            req.profile_completion_step
        );

        let auth_user = user.to_auth_user();
        {
            let mut users = self
                .users
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            users.retain(|u| !(u.phone == user.phone && u.role == role));
            users.push(user);
        }

        Ok(RegisterResponse {
            success: true,
            token: Some(format!("auth_token_{}", unique_suffix())),
            user: Some(auth_user),
            message: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[tokio::test]
    async fn test_role_helpers_register_under_their_role() {
        let provider = MockPortalProvider::default();
        let req = |phone: &str| RegisterReq {
            phone: phone.into(),
            fields: BTreeMap::new(),
            profile_completion_step: 1,
            documents: Vec::new(),
        };

        let patient = provider.register_patient(&req("9100000001")).await.unwrap();
        let doctor = provider.register_doctor(&req("9100000002")).await.unwrap();
        let lab = provider.register_lab(&req("9100000003")).await.unwrap();

        for (res, role, prefix) in [
            (patient, Role::Patient, "user_patient_"),
            (doctor, Role::Doctor, "user_doctor_"),
            (lab, Role::Lab, "user_lab_"),
        ] {
            let user = res.user.unwrap();
            assert_eq!(user.role, role);
            assert!(user.id.starts_with(prefix), "{} lacks {prefix}", user.id);
        }
    }

    #[tokio::test]
    async fn test_request_otp_rejects_bad_phones_for_every_role() {
        let provider = MockPortalProvider::default();
        for role in Role::ALL {
            for phone in ["", "12345", "98765432101", "98765 4321", "abcdefghij"] {
                let res = provider.request_otp(phone, role).await.unwrap();
                assert!(!res.success, "{phone:?} accepted for {role}");
                assert_eq!(res.message.as_deref(), Some(MSG_INVALID_PHONE));
                assert!(res.request_id.is_none());
            }
        }
    }

    #[tokio::test]
    async fn test_request_otp_issues_request_with_default_expiry() {
        let provider = MockPortalProvider::default();
        let res = provider.request_otp("9000000000", Role::Lab).await.unwrap();
        assert!(res.success);
        assert_eq!(res.expires_in, Some(60));
        assert!(res
            .request_id
            .unwrap()
            .starts_with("req_lab_9000000000_"));
    }

    #[tokio::test]
    async fn test_verify_accepts_only_fixed_code() {
        let provider = MockPortalProvider::default();
        for code in ["000000", "123457", "654321", "12345", "1234567", ""] {
            let res = provider
                .verify_otp("req", code, "9876543210", Role::Patient)
                .await
                .unwrap();
            assert!(!res.success, "{code:?} accepted");
            assert_eq!(res.message.as_deref(), Some(MSG_INVALID_OTP));
        }

        let res = provider
            .verify_otp("req", "123456", "9876543210", Role::Patient)
            .await
            .unwrap();
        assert!(res.success);
    }

    #[tokio::test]
    async fn test_verify_reports_user_existence_per_role() {
        let provider = MockPortalProvider::default();

        let known = provider
            .verify_otp("req", "123456", "9876543211", Role::Doctor)
            .await
            .unwrap();
        assert_eq!(known.user_exists, Some(true));
        assert_eq!(known.user.unwrap().id, "user_doctor_1");
        assert!(known.token.is_some());

        // Same phone, different role: not a known pair.
        let unknown = provider
            .verify_otp("req", "123456", "9876543211", Role::Lab)
            .await
            .unwrap();
        assert!(unknown.success);
        assert_eq!(unknown.user_exists, Some(false));
        assert!(unknown.token.is_none());
    }

    #[tokio::test]
    async fn test_resend_issues_distinct_ids() {
        let provider = MockPortalProvider::default();
        let first = provider.resend_otp("req_a").await.unwrap();
        let second = provider.resend_otp("req_a").await.unwrap();
        assert_ne!(first.request_id, second.request_id);
        assert_eq!(second.expires_in, Some(60));
    }

    #[tokio::test]
    async fn test_registration_makes_user_known() {
        let provider = MockPortalProvider::default();
        let req = RegisterReq {
            phone: "9000000001".into(),
            fields: BTreeMap::from([("labName".to_string(), "Acme Labs".to_string())]),
            profile_completion_step: 1,
            documents: vec![],
        };

        let res = provider.register(Role::Lab, &req).await.unwrap();
        assert!(res.success);
        let user = res.user.unwrap();
        assert!(user.id.starts_with("user_lab_"));

        let verify = provider
            .verify_otp("req", "123456", "9000000001", Role::Lab)
            .await
            .unwrap();
        assert_eq!(verify.user_exists, Some(true));
        assert_eq!(verify.user.unwrap().id, user.id);
    }

    #[tokio::test]
    async fn test_registration_rejects_bad_phone() {
        let provider = MockPortalProvider::default();
        let req = RegisterReq {
            phone: "123".into(),
            fields: BTreeMap::new(),
            profile_completion_step: 1,
            documents: vec![],
        };
        let res = provider.register(Role::Patient, &req).await.unwrap();
        assert!(!res.success);
        assert!(res.user.is_none());
    }
}
