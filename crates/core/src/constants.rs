//! Constants used throughout the MedPortal core crate.
//!
//! Default configuration values and the user-facing strings shown inline on screens live
//! here so the REST API, the CLI and the tests all agree on them.

/// OTP code accepted by the mock auth provider.
pub const MOCK_OTP_CODE: &str = "123456";

/// Number of input cells on the OTP entry screen.
pub const OTP_LENGTH: usize = 6;

/// Default OTP countdown in seconds.
pub const DEFAULT_OTP_EXPIRY_SECS: u32 = 60;

/// Lifetime of a share token. Advisory only.
pub const SHARE_TOKEN_TTL_DAYS: i64 = 7;

/// Length of the random token embedded in a share link.
pub const SHARE_TOKEN_LEN: usize = 32;

/// Length of the random part of a QR id (`qr_` prefix excluded).
pub const QR_ID_LEN: usize = 16;

/// Default base URL for patient share links.
pub const DEFAULT_SHARE_BASE_URL: &str = "https://medicalrecords.app/profile";

/// Default third-party QR image renderer.
pub const DEFAULT_QR_IMAGE_URL: &str = "https://api.qrserver.com/v1/create-qr-code/";

/// Default file backing the local key-value settings store.
pub const DEFAULT_THEME_FILE: &str = "medportal-settings.json";

/// Key holding the theme preference in the settings store.
pub const THEME_STORAGE_KEY: &str = "theme";

/// Remote table holding lab test requests.
pub const TEST_REQUESTS_TABLE: &str = "test_requests";

/// Remote table holding uploaded test reports.
pub const TEST_REPORTS_TABLE: &str = "test_reports";

pub const MSG_INVALID_PHONE: &str = "Please enter a valid 10-digit mobile number.";
pub const MSG_INVALID_OTP: &str = "Invalid OTP. Please try again.";
pub const MSG_NETWORK_ERROR: &str = "Network error. Please try again.";
pub const MSG_NETWORK_ERROR_CONNECTION: &str = "Network error. Please check your connection.";
pub const MSG_RESEND_FAILED: &str = "Failed to resend OTP. Please try again.";
pub const MSG_REGISTRATION_FAILED: &str = "Registration failed. Please try again.";
pub const MSG_GENERIC_FAILURE: &str = "Something went wrong. Please try again.";

/// Timeout for calls to remote services.
pub const REMOTE_TIMEOUT_SECS: u64 = 10;
