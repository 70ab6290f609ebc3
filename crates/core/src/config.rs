//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into core services. The
//! intent is to avoid reading process-wide environment variables during request handling,
//! which can lead to inconsistent behaviour in multi-threaded runtimes and test harnesses.

use crate::constants::{
    DEFAULT_OTP_EXPIRY_SECS, DEFAULT_QR_IMAGE_URL, DEFAULT_SHARE_BASE_URL, DEFAULT_THEME_FILE,
};
use crate::{PortalError, PortalResult};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Connection details for the remote `test_requests` / `test_reports` tables.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteTableConfig {
    pub base_url: String,
    pub api_key: String,
}

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    otp_expiry_secs: u32,
    share_base_url: String,
    qr_image_url: String,
    theme_file: PathBuf,
    seed_file: Option<PathBuf>,
    remote_table: Option<RemoteTableConfig>,
    mock_delay: Duration,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            otp_expiry_secs: DEFAULT_OTP_EXPIRY_SECS,
            share_base_url: DEFAULT_SHARE_BASE_URL.into(),
            qr_image_url: DEFAULT_QR_IMAGE_URL.into(),
            theme_file: PathBuf::from(DEFAULT_THEME_FILE),
            seed_file: None,
            remote_table: None,
            mock_delay: Duration::ZERO,
        }
    }
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns `PortalError::InvalidInput` if the OTP expiry is zero or either URL is not an
    /// absolute `http(s)` URL.
    pub fn new(
        otp_expiry_secs: u32,
        share_base_url: String,
        qr_image_url: String,
        theme_file: PathBuf,
    ) -> PortalResult<Self> {
        if otp_expiry_secs == 0 {
            return Err(PortalError::InvalidInput(
                "otp expiry must be at least one second".into(),
            ));
        }
        validate_http_url("share base url", &share_base_url)?;
        validate_http_url("qr image url", &qr_image_url)?;

        Ok(Self {
            otp_expiry_secs,
            share_base_url: share_base_url.trim_end_matches('/').to_string(),
            qr_image_url,
            theme_file,
            ..Self::default()
        })
    }

    /// Resolve configuration from the process environment.
    ///
    /// Call this once in `main`, after `dotenvy::dotenv()`; services take the resulting value
    /// rather than reading the environment themselves.
    pub fn from_env() -> PortalResult<Self> {
        let var = |name: &str| std::env::var(name).ok();

        let cfg = Self::new(
            otp_expiry_from_env_value(var("MEDPORTAL_OTP_EXPIRY_SECS"))?,
            var("MEDPORTAL_SHARE_BASE_URL").unwrap_or_else(|| DEFAULT_SHARE_BASE_URL.into()),
            var("MEDPORTAL_QR_IMAGE_URL").unwrap_or_else(|| DEFAULT_QR_IMAGE_URL.into()),
            var("MEDPORTAL_THEME_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_THEME_FILE)),
        )?
        .with_seed_file(var("MEDPORTAL_SEED_FILE").map(PathBuf::from))
        .with_remote_table(remote_table_from_env_values(
            var("SUPABASE_URL"),
            var("SUPABASE_KEY"),
        )?)
        .with_mock_delay(mock_delay_from_env_value(var("MEDPORTAL_MOCK_DELAY_MS"))?);

        Ok(cfg)
    }

    pub fn with_seed_file(mut self, seed_file: Option<PathBuf>) -> Self {
        self.seed_file = seed_file;
        self
    }

    pub fn with_remote_table(mut self, remote_table: Option<RemoteTableConfig>) -> Self {
        self.remote_table = remote_table;
        self
    }

    pub fn with_mock_delay(mut self, mock_delay: Duration) -> Self {
        self.mock_delay = mock_delay;
        self
    }

    pub fn otp_expiry_secs(&self) -> u32 {
        self.otp_expiry_secs
    }

    pub fn share_base_url(&self) -> &str {
        &self.share_base_url
    }

    pub fn qr_image_url(&self) -> &str {
        &self.qr_image_url
    }

    pub fn theme_file(&self) -> &Path {
        &self.theme_file
    }

    pub fn seed_file(&self) -> Option<&Path> {
        self.seed_file.as_deref()
    }

    pub fn remote_table(&self) -> Option<&RemoteTableConfig> {
        self.remote_table.as_ref()
    }

    pub fn mock_delay(&self) -> Duration {
        self.mock_delay
    }
}

fn validate_http_url(what: &str, value: &str) -> PortalResult<()> {
    let url = reqwest::Url::parse(value)
        .map_err(|e| PortalError::InvalidInput(format!("{what} is not a valid URL: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(PortalError::InvalidInput(format!(
            "{what} must use http or https"
        )));
    }
    Ok(())
}

/// Parse the OTP expiry from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns [`DEFAULT_OTP_EXPIRY_SECS`].
pub fn otp_expiry_from_env_value(value: Option<String>) -> PortalResult<u32> {
    match value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
        None => Ok(DEFAULT_OTP_EXPIRY_SECS),
        Some(v) => v.parse::<u32>().map_err(|_| {
            PortalError::InvalidInput(format!("MEDPORTAL_OTP_EXPIRY_SECS is not a number: '{v}'"))
        }),
    }
}

/// Parse the simulated provider latency in milliseconds. Missing means no delay.
pub fn mock_delay_from_env_value(value: Option<String>) -> PortalResult<Duration> {
    match value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
        None => Ok(Duration::ZERO),
        Some(v) => v.parse::<u64>().map(Duration::from_millis).map_err(|_| {
            PortalError::InvalidInput(format!("MEDPORTAL_MOCK_DELAY_MS is not a number: '{v}'"))
        }),
    }
}

/// Build the remote table config. Both values must be present, or neither.
pub fn remote_table_from_env_values(
    url: Option<String>,
    key: Option<String>,
) -> PortalResult<Option<RemoteTableConfig>> {
    let url = url.filter(|v| !v.trim().is_empty());
    let key = key.filter(|v| !v.trim().is_empty());

    match (url, key) {
        (None, None) => Ok(None),
        (Some(base_url), Some(api_key)) => {
            validate_http_url("SUPABASE_URL", &base_url)?;
            Ok(Some(RemoteTableConfig {
                base_url: base_url.trim_end_matches('/').to_string(),
                api_key,
            }))
        }
        _ => Err(PortalError::InvalidInput(
            "SUPABASE_URL and SUPABASE_KEY must be set together".into(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_zero_expiry() {
        let result = CoreConfig::new(
            0,
            DEFAULT_SHARE_BASE_URL.into(),
            DEFAULT_QR_IMAGE_URL.into(),
            PathBuf::from("x.json"),
        );
        assert!(matches!(result, Err(PortalError::InvalidInput(_))));
    }

    #[test]
    fn test_new_rejects_non_http_share_url() {
        let result = CoreConfig::new(
            60,
            "ftp://example.org/profile".into(),
            DEFAULT_QR_IMAGE_URL.into(),
            PathBuf::from("x.json"),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_new_strips_trailing_slash_from_share_url() {
        let cfg = CoreConfig::new(
            60,
            "https://medicalrecords.app/profile/".into(),
            DEFAULT_QR_IMAGE_URL.into(),
            PathBuf::from("x.json"),
        )
        .unwrap();
        assert_eq!(cfg.share_base_url(), "https://medicalrecords.app/profile");
    }

    #[test]
    fn test_otp_expiry_from_env_value() {
        assert_eq!(otp_expiry_from_env_value(None).unwrap(), 60);
        assert_eq!(otp_expiry_from_env_value(Some("  ".into())).unwrap(), 60);
        assert_eq!(otp_expiry_from_env_value(Some("30".into())).unwrap(), 30);
        assert!(otp_expiry_from_env_value(Some("soon".into())).is_err());
    }

    #[test]
    fn test_remote_table_requires_both_values() {
        assert_eq!(remote_table_from_env_values(None, None).unwrap(), None);
        assert!(remote_table_from_env_values(Some("https://x.supabase.co".into()), None).is_err());

        let cfg = remote_table_from_env_values(
            Some("https://x.supabase.co/".into()),
            Some("anon".into()),
        )
        .unwrap()
        .unwrap();
        assert_eq!(cfg.base_url, "https://x.supabase.co");
    }

    #[test]
    fn test_mock_delay_from_env_value() {
        assert_eq!(mock_delay_from_env_value(None).unwrap(), Duration::ZERO);
        assert_eq!(
            mock_delay_from_env_value(Some("1200".into())).unwrap(),
            Duration::from_millis(1200)
        );
    }
}
