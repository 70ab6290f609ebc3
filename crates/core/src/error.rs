use crate::constants::{MSG_GENERIC_FAILURE, MSG_INVALID_PHONE, MSG_NETWORK_ERROR};

#[derive(Debug, thiserror::Error)]
pub enum PortalError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid phone number: {0}")]
    InvalidPhone(#[from] portal_types::PhoneError),
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("unknown field for {role} registration: {field}")]
    UnknownField { role: crate::Role, field: String },

    #[error("remote call failed: {0}")]
    RemoteCallFailure(String),
    #[error("not found: {0}")]
    NotFound(String),

    #[error("resend is locked for another {remaining} seconds")]
    ResendLocked { remaining: u32 },
    #[error("a verification is already in flight")]
    VerificationInFlight,
    #[error("operation `{operation}` is not valid in state {state}")]
    InvalidTransition {
        operation: &'static str,
        state: &'static str,
    },
    #[error("registration already submitted at step {0}")]
    AlreadySubmitted(u8),

    #[error("failed to read settings file: {0}")]
    SettingsRead(std::io::Error),
    #[error("failed to write settings file: {0}")]
    SettingsWrite(std::io::Error),
    #[error("failed to serialize: {0}")]
    Serialization(serde_json::Error),
    #[error("failed to deserialize: {0}")]
    Deserialization(serde_json::Error),
    #[error("failed to render QR code: {0}")]
    QrRender(qrcode::types::QrError),
}

impl PortalError {
    /// The single inline message a screen shows for this error.
    ///
    /// Every remote failure collapses to the same generic string; callers never learn
    /// whether it was a timeout, a server error or a malformed response.
    pub fn user_message(&self) -> String {
        match self {
            PortalError::InvalidPhone(_) => MSG_INVALID_PHONE.into(),
            PortalError::MissingField(field) => format!("Please enter {field} to continue."),
            PortalError::InvalidInput(msg) => msg.clone(),
            PortalError::RemoteCallFailure(_) => MSG_NETWORK_ERROR.into(),
            PortalError::ResendLocked { remaining } => {
                format!("Resend OTP in {remaining} seconds.")
            }
            _ => MSG_GENERIC_FAILURE.into(),
        }
    }
}

impl From<reqwest::Error> for PortalError {
    fn from(err: reqwest::Error) -> Self {
        PortalError::RemoteCallFailure(err.to_string())
    }
}

pub type PortalResult<T> = std::result::Result<T, PortalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_failures_share_one_message() {
        let timeout = PortalError::RemoteCallFailure("timed out".into());
        let server = PortalError::RemoteCallFailure("status 500".into());
        assert_eq!(timeout.user_message(), server.user_message());
        assert_eq!(timeout.user_message(), MSG_NETWORK_ERROR);
    }

    #[test]
    fn test_phone_error_maps_to_phone_message() {
        let err = PortalError::from(portal_types::PhoneError::NonNumeric);
        assert_eq!(err.user_message(), MSG_INVALID_PHONE);
    }

    #[test]
    fn test_missing_field_message_names_field() {
        let err = PortalError::MissingField("name");
        assert_eq!(err.user_message(), "Please enter name to continue.");
    }
}
