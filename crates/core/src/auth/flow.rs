//! OTP login state machine.
//!
//! ```text
//! Idle ──request_otp──▶ Requesting ──▶ AwaitingCode ──verify──▶ Verifying ──▶ Success
//!  ▲                        │            │    ▲                     │
//!  └──── rejected/failed ───┘            │    └── wrong code / ─────┘
//!                                        │        network error
//!                                        └──resend (countdown at 0)──▶ AwaitingCode
//! ```
//!
//! A rejected or failed verification is retryable: the flow returns to `AwaitingCode` with the
//! six cells cleared and an inline error message, keeping the same request id and countdown.

use super::AuthProvider;
use crate::constants::{
    DEFAULT_OTP_EXPIRY_SECS, MSG_GENERIC_FAILURE, MSG_INVALID_OTP, MSG_NETWORK_ERROR,
    MSG_NETWORK_ERROR_CONNECTION, MSG_RESEND_FAILED, OTP_LENGTH,
};
use crate::validation::validate_phone;
use crate::{PortalError, PortalResult};
use api_shared::{AuthUser, OtpRequestResponse, Role};
use portal_types::PhoneNumber;
use std::sync::Arc;

// ============================================================================
// COUNTDOWN
// ============================================================================

/// Seconds left before "resend" unlocks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Countdown {
    remaining: u32,
}

impl Countdown {
    pub fn start(secs: u32) -> Self {
        Self { remaining: secs }
    }

    /// One second passes.
    pub fn tick(&mut self) {
        self.elapse(1);
    }

    /// `secs` seconds pass. Saturates at zero.
    pub fn elapse(&mut self, secs: u32) {
        self.remaining = self.remaining.saturating_sub(secs);
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn is_finished(&self) -> bool {
        self.remaining == 0
    }
}

// ============================================================================
// CODE ENTRY
// ============================================================================

/// The six single-digit input cells of the OTP screen.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OtpCells([Option<char>; OTP_LENGTH]);

impl OtpCells {
    /// Puts `digit` into cell `index`.
    pub fn set(&mut self, index: usize, digit: char) -> PortalResult<()> {
        if index >= OTP_LENGTH {
            return Err(PortalError::InvalidInput(format!(
                "otp cell index {index} out of range"
            )));
        }
        if !digit.is_ascii_digit() {
            return Err(PortalError::InvalidInput(
                "otp cells accept digits only".into(),
            ));
        }
        self.0[index] = Some(digit);
        Ok(())
    }

    /// Empties cell `index`. Out-of-range indexes are ignored.
    pub fn clear_cell(&mut self, index: usize) {
        if let Some(cell) = self.0.get_mut(index) {
            *cell = None;
        }
    }

    /// Fills all cells from a pasted code. Leaves the cells untouched if `code` is not
    /// exactly six digits.
    pub fn fill(&mut self, code: &str) -> PortalResult<()> {
        let digits: Vec<char> = code.chars().collect();
        if digits.len() != OTP_LENGTH || !digits.iter().all(|c| c.is_ascii_digit()) {
            return Err(PortalError::InvalidInput(format!(
                "otp must be {OTP_LENGTH} digits"
            )));
        }
        for (cell, digit) in self.0.iter_mut().zip(digits) {
            *cell = Some(digit);
        }
        Ok(())
    }

    pub fn clear(&mut self) {
        self.0 = [None; OTP_LENGTH];
    }

    pub fn is_complete(&self) -> bool {
        self.0.iter().all(Option::is_some)
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(Option::is_none)
    }

    /// The joined code, once every cell is filled.
    pub fn code(&self) -> Option<String> {
        self.0.iter().copied().collect()
    }
}

// ============================================================================
// SESSION AND OUTCOMES
// ============================================================================

/// One in-flight login attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthSession {
    pub phone: PhoneNumber,
    pub role: Role,
    pub request_id: String,
    pub otp_expiry_secs: u32,
    countdown: Countdown,
}

impl AuthSession {
    pub fn countdown(&self) -> Countdown {
        self.countdown
    }
}

/// Where a verified login goes next.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoginOutcome {
    /// Known (phone, role) pair.
    Home {
        role: Role,
        user: Option<AuthUser>,
        token: Option<String>,
    },
    /// Unknown pair: the role's registration wizard, carrying the phone forward.
    Register { role: Role, phone: PhoneNumber },
}

impl LoginOutcome {
    pub fn role(&self) -> Role {
        match self {
            LoginOutcome::Home { role, .. } | LoginOutcome::Register { role, .. } => *role,
        }
    }

    pub fn user_exists(&self) -> bool {
        matches!(self, LoginOutcome::Home { .. })
    }

    pub fn route(&self) -> String {
        match self {
            LoginOutcome::Home { role, .. } => role.home_route(),
            LoginOutcome::Register { role, .. } => role.register_route(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VerifyOutcome {
    Verified(LoginOutcome),
    /// Wrong code. The flow is back in `AwaitingCode` with empty cells.
    Rejected { message: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OtpState {
    Idle,
    Requesting,
    AwaitingCode(AuthSession),
    Verifying(AuthSession),
    Success(LoginOutcome),
}

impl OtpState {
    pub fn name(&self) -> &'static str {
        match self {
            OtpState::Idle => "Idle",
            OtpState::Requesting => "Requesting",
            OtpState::AwaitingCode(_) => "AwaitingCode",
            OtpState::Verifying(_) => "Verifying",
            OtpState::Success(_) => "Success",
        }
    }
}

// ============================================================================
// FLOW
// ============================================================================

/// Drives one login attempt against an [`AuthProvider`].
///
/// The flow owns at most one [`AuthSession`]; it is created by a successful `request_otp` and
/// dropped on success or [`reset`](OtpFlow::reset).
pub struct OtpFlow {
    provider: Arc<dyn AuthProvider>,
    state: OtpState,
    cells: OtpCells,
    error: Option<String>,
}

impl OtpFlow {
    pub fn new(provider: Arc<dyn AuthProvider>) -> Self {
        Self {
            provider,
            state: OtpState::Idle,
            cells: OtpCells::default(),
            error: None,
        }
    }

    pub fn state(&self) -> &OtpState {
        &self.state
    }

    pub fn session(&self) -> Option<&AuthSession> {
        match &self.state {
            OtpState::AwaitingCode(s) | OtpState::Verifying(s) => Some(s),
            _ => None,
        }
    }

    pub fn cells(&self) -> &OtpCells {
        &self.cells
    }

    /// The inline message for the last failed action, if any.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn remaining_secs(&self) -> Option<u32> {
        self.session().map(|s| s.countdown.remaining())
    }

    pub fn can_resend(&self) -> bool {
        matches!(&self.state, OtpState::AwaitingCode(s) if s.countdown.is_finished())
    }

    fn invalid(&self, operation: &'static str) -> PortalError {
        PortalError::InvalidTransition {
            operation,
            state: self.state.name(),
        }
    }

    /// Leaves the screen: drops any session and returns to `Idle`.
    pub fn reset(&mut self) {
        self.state = OtpState::Idle;
        self.cells.clear();
        self.error = None;
    }

    /// Validates the phone locally, then asks the provider for a code.
    ///
    /// # Errors
    ///
    /// - `InvalidPhone` if `phone` is not ten digits (the provider is not called)
    /// - `InvalidInput` if the provider rejected the request
    /// - `RemoteCallFailure` if the provider could not be reached
    ///
    /// In every error case the flow is `Idle` afterwards and [`error`](OtpFlow::error) holds
    /// the inline message.
    pub async fn request_otp(&mut self, phone: &str, role: Role) -> PortalResult<()> {
        if !matches!(self.state, OtpState::Idle) {
            return Err(self.invalid("request_otp"));
        }
        self.error = None;

        let phone = match validate_phone(phone) {
            Ok(phone) => phone,
            Err(e) => {
                self.error = Some(e.user_message());
                return Err(e);
            }
        };

        self.state = OtpState::Requesting;
        let result = self.provider.request_otp(phone.as_str(), role).await;

        match result {
            Ok(OtpRequestResponse {
                success: true,
                request_id: Some(request_id),
                expires_in,
                ..
            }) => {
                let secs = expires_in.unwrap_or(DEFAULT_OTP_EXPIRY_SECS);
                self.cells.clear();
                self.state = OtpState::AwaitingCode(AuthSession {
                    phone,
                    role,
                    request_id,
                    otp_expiry_secs: secs,
                    countdown: Countdown::start(secs),
                });
                Ok(())
            }
            Ok(resp) => {
                self.state = OtpState::Idle;
                let message = resp.message.unwrap_or_else(|| MSG_GENERIC_FAILURE.into());
                self.error = Some(message.clone());
                Err(PortalError::InvalidInput(message))
            }
            Err(e) => {
                tracing::error!("request otp failed: {:?}", e);
                self.state = OtpState::Idle;
                self.error = Some(MSG_NETWORK_ERROR_CONNECTION.into());
                Err(e)
            }
        }
    }

    /// Types `digit` into cell `index`. Returns `true` once all six cells are filled.
    pub fn enter_digit(&mut self, index: usize, digit: char) -> PortalResult<bool> {
        if !matches!(self.state, OtpState::AwaitingCode(_)) {
            return Err(self.invalid("enter_digit"));
        }
        self.cells.set(index, digit)?;
        self.error = None;
        Ok(self.cells.is_complete())
    }

    /// Backspace over cell `index`.
    pub fn erase_digit(&mut self, index: usize) -> PortalResult<()> {
        if !matches!(self.state, OtpState::AwaitingCode(_)) {
            return Err(self.invalid("erase_digit"));
        }
        self.cells.clear_cell(index);
        Ok(())
    }

    /// Pastes a full code into the cells.
    pub fn enter_code(&mut self, code: &str) -> PortalResult<()> {
        if !matches!(self.state, OtpState::AwaitingCode(_)) {
            return Err(self.invalid("enter_code"));
        }
        self.cells.fill(code)?;
        self.error = None;
        Ok(())
    }

    /// One second of the resend countdown passes.
    pub fn tick(&mut self) {
        self.elapse(1);
    }

    pub fn elapse(&mut self, secs: u32) {
        if let OtpState::AwaitingCode(session) = &mut self.state {
            session.countdown.elapse(secs);
        }
    }

    /// Reissues the code once the countdown has reached zero.
    ///
    /// On success the session gets a new request id, the countdown restarts and the cells are
    /// cleared. On failure the session is left as it was.
    pub async fn resend(&mut self) -> PortalResult<()> {
        let (request_id, remaining) = match &self.state {
            OtpState::AwaitingCode(s) => (s.request_id.clone(), s.countdown.remaining()),
            _ => return Err(self.invalid("resend")),
        };
        if remaining > 0 {
            return Err(PortalError::ResendLocked { remaining });
        }
        self.error = None;

        match self.provider.resend_otp(&request_id).await {
            Ok(OtpRequestResponse {
                success: true,
                request_id: Some(new_id),
                expires_in,
                ..
            }) => {
                let secs = expires_in.unwrap_or(DEFAULT_OTP_EXPIRY_SECS);
                if let OtpState::AwaitingCode(session) = &mut self.state {
                    session.request_id = new_id;
                    session.otp_expiry_secs = secs;
                    session.countdown = Countdown::start(secs);
                }
                self.cells.clear();
                Ok(())
            }
            Ok(resp) => {
                let message = resp.message.unwrap_or_else(|| MSG_RESEND_FAILED.into());
                self.error = Some(message.clone());
                Err(PortalError::InvalidInput(message))
            }
            Err(e) => {
                tracing::error!("resend otp failed: {:?}", e);
                self.error = Some(MSG_RESEND_FAILED.into());
                Err(e)
            }
        }
    }

    /// Submits the code in the cells.
    ///
    /// # Errors
    ///
    /// - `VerificationInFlight` if a previous verification never completed
    /// - `InvalidTransition` outside `AwaitingCode`
    /// - `InvalidInput` if not all six cells are filled
    /// - `RemoteCallFailure` if the provider could not be reached (flow back in `AwaitingCode`)
    pub async fn verify(&mut self) -> PortalResult<VerifyOutcome> {
        let session = match &self.state {
            OtpState::AwaitingCode(s) => s.clone(),
            OtpState::Verifying(_) => return Err(PortalError::VerificationInFlight),
            _ => return Err(self.invalid("verify")),
        };
        let Some(code) = self.cells.code() else {
            return Err(PortalError::InvalidInput(format!(
                "enter all {OTP_LENGTH} digits"
            )));
        };

        self.error = None;
        self.state = OtpState::Verifying(session.clone());

        let result = self
            .provider
            .verify_otp(&session.request_id, &code, session.phone.as_str(), session.role)
            .await;

        match result {
            Ok(resp) if resp.success => {
                let outcome = if resp.user_exists.unwrap_or(false) {
                    LoginOutcome::Home {
                        role: session.role,
                        user: resp.user,
                        token: resp.token,
                    }
                } else {
                    LoginOutcome::Register {
                        role: session.role,
                        phone: session.phone,
                    }
                };
                tracing::info!("otp verified, routing to {}", outcome.route());
                self.cells.clear();
                self.state = OtpState::Success(outcome.clone());
                Ok(VerifyOutcome::Verified(outcome))
            }
            Ok(resp) => {
                let message = resp.message.unwrap_or_else(|| MSG_INVALID_OTP.into());
                self.state = OtpState::AwaitingCode(session);
                self.cells.clear();
                self.error = Some(message.clone());
                Ok(VerifyOutcome::Rejected { message })
            }
            Err(e) => {
                tracing::error!("verify otp failed: {:?}", e);
                self.state = OtpState::AwaitingCode(session);
                self.cells.clear();
                self.error = Some(MSG_NETWORK_ERROR.into());
                Err(e)
            }
        }
    }
}

/// An [`OtpFlow`] shared between tasks, e.g. an auto-submit on the sixth digit racing a tap
/// on the verify button.
///
/// [`verify`](SharedOtpFlow::verify) never waits: if another task holds the flow it returns
/// `VerificationInFlight` and the provider is not called.
#[derive(Clone)]
pub struct SharedOtpFlow {
    inner: Arc<tokio::sync::Mutex<OtpFlow>>,
}

impl SharedOtpFlow {
    pub fn new(flow: OtpFlow) -> Self {
        Self {
            inner: Arc::new(tokio::sync::Mutex::new(flow)),
        }
    }

    pub async fn lock(&self) -> tokio::sync::MutexGuard<'_, OtpFlow> {
        self.inner.lock().await
    }

    pub async fn verify(&self) -> PortalResult<VerifyOutcome> {
        let mut flow = self
            .inner
            .try_lock()
            .map_err(|_| PortalError::VerificationInFlight)?;
        flow.verify().await
    }
}
