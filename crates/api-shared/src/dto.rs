//! Request and response bodies shared by the providers and the HTTP API.
//!
//! Auth, registration and share bodies use camelCase keys. Test request and report rows keep
//! the snake_case column names of the remote tables they mirror.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

// ============================================================================
// ROLES
// ============================================================================

/// Portal role selected on the login screen.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Patient,
    Doctor,
    Lab,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Patient, Role::Doctor, Role::Lab];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Patient => "patient",
            Role::Doctor => "doctor",
            Role::Lab => "lab",
        }
    }

    /// Route of the role's home screen, e.g. `/doctor-home`.
    pub fn home_route(&self) -> String {
        format!("/{}-home", self.as_str())
    }

    /// Route of the role's registration wizard, e.g. `/register-lab`.
    pub fn register_route(&self) -> String {
        format!("/register-{}", self.as_str())
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "patient" => Ok(Role::Patient),
            "doctor" => Ok(Role::Doctor),
            "lab" => Ok(Role::Lab),
            other => Err(format!("unknown role '{other}' (expected patient, doctor or lab)")),
        }
    }
}

// ============================================================================
// HEALTH
// ============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SuccessRes {
    pub success: bool,
}

// ============================================================================
// AUTH
// ============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RequestOtpReq {
    pub phone: String,
    pub role: Role,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOtpReq {
    pub request_id: String,
    pub otp: String,
    pub phone: String,
    pub role: Role,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResendOtpReq {
    pub request_id: String,
}

/// Result of `requestOtp` and `resendOtp`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OtpRequestResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl OtpRequestResponse {
    pub fn issued(request_id: String, expires_in: u32) -> Self {
        Self {
            success: true,
            request_id: Some(request_id),
            expires_in: Some(expires_in),
            message: None,
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            ..Self::default()
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AuthUser {
    pub id: String,
    pub phone: String,
    pub role: Role,
}

/// Result of `verifyOtp`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OtpVerifyResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_exists: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<AuthUser>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl OtpVerifyResponse {
    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            ..Self::default()
        }
    }
}

// ============================================================================
// REGISTRATION
// ============================================================================

/// A registration submission as sent by a wizard.
///
/// `fields` only carries values the user filled in; `profile_completion_step` records how
/// far through the wizard they got.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterReq {
    pub phone: String,
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
    pub profile_completion_step: u8,
    #[serde(default)]
    pub documents: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<AuthUser>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

// ============================================================================
// SHARE PROFILE
// ============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QrCodeData {
    pub qr_id: String,
    pub patient_id: String,
    pub token: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl QrCodeData {
    /// Whether `now` is past `expires_at`. Nothing enforces expiry; callers may check.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShareProfileRes {
    pub qr_data: QrCodeData,
    pub qr_url: String,
    pub share_link: String,
}

// ============================================================================
// LAB TEST REQUESTS
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TestRequestStatus {
    Pending,
    Processing,
    Completed,
}

impl TestRequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestRequestStatus::Pending => "pending",
            TestRequestStatus::Processing => "processing",
            TestRequestStatus::Completed => "completed",
        }
    }
}

impl std::str::FromStr for TestRequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TestRequestStatus::Pending),
            "processing" => Ok(TestRequestStatus::Processing),
            "completed" => Ok(TestRequestStatus::Completed),
            other => Err(format!("unknown status '{other}'")),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Normal,
}

/// Dashboard list filter. `All` omits the status filter entirely.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    Pending,
    Completed,
    #[default]
    All,
}

impl StatusFilter {
    /// The status to filter on, or `None` for `All`.
    pub fn status(&self) -> Option<TestRequestStatus> {
        match self {
            StatusFilter::Pending => Some(TestRequestStatus::Pending),
            StatusFilter::Completed => Some(TestRequestStatus::Completed),
            StatusFilter::All => None,
        }
    }
}

impl std::str::FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(StatusFilter::Pending),
            "completed" => Ok(StatusFilter::Completed),
            "all" => Ok(StatusFilter::All),
            other => Err(format!("unknown filter '{other}' (expected pending, completed or all)")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TestRequest {
    pub id: String,
    pub patient_name: String,
    pub patient_id: String,
    pub doctor_name: String,
    pub hospital_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tests: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub doctor_note: String,
    pub status: TestRequestStatus,
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Nullable columns come back as `null`; read them as the empty value.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ReportFileType {
    Pdf,
    Image,
}

impl std::str::FromStr for ReportFileType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pdf" => Ok(ReportFileType::Pdf),
            "image" => Ok(ReportFileType::Image),
            other => Err(format!("unknown file type '{other}' (expected pdf or image)")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TestReport {
    pub id: String,
    pub request_id: String,
    pub file_name: String,
    pub file_type: ReportFileType,
    pub file_url: String,
    pub file_size: u64,
    pub uploaded_at: DateTime<Utc>,
}

/// Insert payload for `test_reports`; the store assigns `id` and `uploaded_at`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct NewTestReport {
    pub request_id: String,
    pub file_name: String,
    pub file_type: ReportFileType,
    pub file_url: String,
    pub file_size: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadReportReq {
    pub file_name: String,
    pub file_type: ReportFileType,
    pub file_url: String,
    pub file_size: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UpdateStatusReq {
    pub status: TestRequestStatus,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DashboardStats {
    pub pending: usize,
    pub completed: usize,
    pub total: usize,
}
