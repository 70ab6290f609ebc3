//! # MedPortal Core
//!
//! Domain logic for the patient / doctor / lab portal.
//!
//! This crate contains the client-side state machines and the services behind them:
//! - Phone + OTP login ([`auth::OtpFlow`]) over an injectable [`auth::AuthProvider`]
//! - Role-specific registration wizards ([`registration::RegistrationWizard`])
//! - The light/dark preference ([`theme::ThemeContext`])
//! - Patient share links and QR codes ([`share::ShareService`])
//! - The lab test request dashboard ([`test_requests::TestRequestService`])
//!
//! **No transport concerns**: HTTP routing belongs in `api-rest`, wire types in `api-shared`.

pub mod auth;
pub mod config;
pub mod constants;
pub mod error;
pub mod registration;
pub mod services;
pub mod share;
pub mod test_requests;
pub mod theme;
pub mod validation;

pub use api_shared::Role;
pub use config::{CoreConfig, RemoteTableConfig};
pub use error::{PortalError, PortalResult};
pub use services::PortalServices;
