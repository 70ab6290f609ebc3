use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_shared::{NewTestReport, ReportFileType, Role, StatusFilter, TestRequestStatus};
use medportal_core::auth::{
    AuthProvider, HttpAuthProvider, LoginOutcome, OtpFlow, RegistrationProvider, VerifyOutcome,
};
use medportal_core::constants::REMOTE_TIMEOUT_SECS;
use medportal_core::registration::{RegistrationWizard, WizardState};
use medportal_core::theme::{JsonFileSettings, ThemeContext, ThemePreference};
use medportal_core::{CoreConfig, PortalResult, PortalServices};
use portal_types::PhoneNumber;

#[derive(Parser)]
#[command(name = "medportal")]
#[command(about = "MedPortal patient / doctor / lab portal CLI")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in with a phone number and OTP
    Login {
        /// 10-digit mobile number
        phone: String,
        /// patient, doctor or lab
        #[arg(long, default_value = "patient")]
        role: Role,
        /// The OTP received
        #[arg(long)]
        otp: String,
        /// Wait out the countdown and request a new code before verifying
        #[arg(long)]
        resend: bool,
    },
    /// Register a new user
    Register {
        /// patient, doctor or lab
        role: Role,
        /// 10-digit mobile number
        phone: String,
        /// Profile field as key=value (repeatable)
        #[arg(long = "field", value_parser = parse_key_val)]
        fields: Vec<(String, String)>,
        /// Uploaded document reference (repeatable)
        #[arg(long = "document")]
        documents: Vec<String>,
        /// Stop at this step and submit what has been filled in
        #[arg(long)]
        skip_at: Option<u8>,
    },
    /// Generate a share link and QR code for a patient profile
    Share {
        /// Patient identifier
        patient_id: String,
        /// Also write the QR code as SVG to this file
        #[arg(long)]
        svg: Option<PathBuf>,
    },
    /// Show or change the theme preference
    Theme {
        /// `toggle`, `light` or `dark`; omit to show the current value
        action: Option<String>,
    },
    /// List lab test requests
    Requests {
        /// pending, completed or all
        #[arg(long, default_value = "all")]
        status: StatusFilter,
    },
    /// Show lab dashboard counts
    Stats,
    /// Show one test request
    Request {
        /// Test request id
        id: String,
    },
    /// Set a test request's status
    SetStatus {
        /// Test request id
        id: String,
        /// pending, processing or completed
        status: TestRequestStatus,
    },
    /// List the reports uploaded for a test request
    Reports {
        /// Test request id
        request_id: String,
    },
    /// Record an uploaded report for a test request
    UploadReport {
        /// Test request id
        request_id: String,
        #[arg(long)]
        file_name: String,
        /// pdf or image
        #[arg(long)]
        file_type: ReportFileType,
        #[arg(long)]
        file_url: String,
        /// Size in bytes
        #[arg(long, default_value_t = 0)]
        file_size: u64,
    },
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{s}'"))?;
    if key.trim().is_empty() {
        return Err(format!("empty field name in '{s}'"));
    }
    Ok((key.trim().to_string(), value.to_string()))
}

/// Auth goes to `MEDPORTAL_AUTH_URL` when set, otherwise to the in-process mock.
fn auth_providers(
    services: &PortalServices,
) -> anyhow::Result<(Arc<dyn AuthProvider>, Arc<dyn RegistrationProvider>)> {
    match std::env::var("MEDPORTAL_AUTH_URL") {
        Ok(url) if !url.trim().is_empty() => {
            let http = Arc::new(HttpAuthProvider::new(
                &url,
                Duration::from_secs(REMOTE_TIMEOUT_SECS),
            )?);
            Ok((http.clone(), http))
        }
        _ => Ok((services.auth.clone(), services.registration.clone())),
    }
}

async fn login(
    provider: Arc<dyn AuthProvider>,
    phone: &str,
    role: Role,
    otp: &str,
    resend: bool,
) -> PortalResult<VerifyOutcome> {
    let mut flow = OtpFlow::new(provider);
    flow.request_otp(phone, role).await?;
    if let Some(secs) = flow.remaining_secs() {
        println!("OTP sent. Resend available in {secs}s.");
    }

    if resend {
        if let Some(secs) = flow.remaining_secs() {
            flow.elapse(secs);
        }
        flow.resend().await?;
        println!("OTP resent.");
    }

    flow.enter_code(otp)?;
    flow.verify().await
}

/// Walks the wizard forward, submitting at `skip_at` or completing on the last step.
async fn register(
    wizard: &mut RegistrationWizard,
    fields: &[(String, String)],
    documents: &[String],
    skip_at: Option<u8>,
    provider: &dyn RegistrationProvider,
) -> PortalResult<api_shared::RegisterResponse> {
    for (name, value) in fields {
        wizard.set_field(name, value)?;
    }
    for document in documents {
        wizard.add_document(document.clone())?;
    }

    let target = skip_at.unwrap_or(wizard.total_steps());
    while wizard.current_step() < target.min(wizard.total_steps()) {
        wizard.next()?;
    }

    if skip_at.is_some_and(|step| step <= wizard.total_steps()) {
        wizard.skip(provider).await
    } else {
        wizard.complete(provider).await
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let cfg = Arc::new(CoreConfig::from_env()?);

    match cli.command {
        Some(Commands::Login {
            phone,
            role,
            otp,
            resend,
        }) => {
            let services = PortalServices::from_config(cfg)?;
            let (auth, _) = auth_providers(&services)?;
            match login(auth, &phone, role, &otp, resend).await {
                Ok(VerifyOutcome::Verified(LoginOutcome::Home { user, token, .. })) => {
                    let id = user.map(|u| u.id).unwrap_or_default();
                    println!("Welcome back {id}.");
                    if let Some(token) = token {
                        println!("Token: {token}");
                    }
                    println!("Route: {}", role.home_route());
                }
                Ok(VerifyOutcome::Verified(outcome @ LoginOutcome::Register { .. })) => {
                    println!("New {role} user. Continue registration at {}", outcome.route());
                }
                Ok(VerifyOutcome::Rejected { message }) => eprintln!("{message}"),
                Err(e) => eprintln!("{}", e.user_message()),
            }
        }
        Some(Commands::Register {
            role,
            phone,
            fields,
            documents,
            skip_at,
        }) => {
            let services = PortalServices::from_config(cfg)?;
            let (_, registration) = auth_providers(&services)?;
            let phone = PhoneNumber::parse(&phone)
                .map_err(|e| anyhow::anyhow!("{}", medportal_core::PortalError::from(e).user_message()))?;
            let mut wizard = RegistrationWizard::new(role, phone);

            match register(&mut wizard, &fields, &documents, skip_at, registration.as_ref()).await
            {
                Ok(resp) => match wizard.state() {
                    WizardState::Submitted { step } => {
                        let id = resp.user.map(|u| u.id).unwrap_or_default();
                        println!("Registered {role} user {id} (profile step {step}).");
                        println!("Route: {}", role.home_route());
                    }
                    WizardState::Draft { step } => {
                        eprintln!(
                            "Step {step}: {}",
                            wizard.error().unwrap_or("registration was not accepted")
                        );
                    }
                },
                Err(e) => eprintln!(
                    "Step {}: {}",
                    wizard.current_step(),
                    wizard.error().map(str::to_string).unwrap_or_else(|| e.to_string())
                ),
            }
        }
        Some(Commands::Share { patient_id, svg }) => {
            let services = PortalServices::from_config(cfg)?;
            let res = services.share.regenerate(&patient_id)?;
            println!("Share link: {}", res.share_link);
            println!("QR image:   {}", res.qr_url);
            println!("Expires:    {}", res.qr_data.expires_at);
            if let Some(path) = svg {
                let rendered = services.share.render_svg(&res.share_link)?;
                std::fs::write(&path, rendered)
                    .with_context(|| format!("writing {}", path.display()))?;
                println!("QR code written to {}", path.display());
            }
        }
        Some(Commands::Theme { action }) => {
            let ctx = ThemeContext::load(Arc::new(JsonFileSettings::new(cfg.theme_file())));
            match action.as_deref() {
                None => {}
                Some("toggle") => {
                    ctx.toggle()?;
                }
                Some(value) => ctx.set(value.parse::<ThemePreference>()?)?,
            }
            println!("Theme: {}", ctx.preference());
            ctx.shutdown()?;
        }
        Some(Commands::Requests { status }) => {
            let services = PortalServices::from_config(cfg)?;
            let requests = services.test_requests.get_test_requests(status).await?;
            if requests.is_empty() {
                println!("No test requests found.");
            }
            for r in requests {
                println!(
                    "{} [{}] {} for {} ({}), {}",
                    r.id,
                    r.status.as_str(),
                    r.tests.join(", "),
                    r.patient_name,
                    r.doctor_name,
                    r.created_at.format("%Y-%m-%d %H:%M")
                );
            }
        }
        Some(Commands::Stats) => {
            let services = PortalServices::from_config(cfg)?;
            let stats = services.test_requests.get_dashboard_stats().await?;
            println!(
                "Pending: {}  Completed: {}  Total: {}",
                stats.pending, stats.completed, stats.total
            );
        }
        Some(Commands::Request { id }) => {
            let services = PortalServices::from_config(cfg)?;
            match services.test_requests.get_test_request_by_id(&id).await? {
                Some(request) => print_json(&request)?,
                None => eprintln!("Test request {id} not found."),
            }
        }
        Some(Commands::SetStatus { id, status }) => {
            let services = PortalServices::from_config(cfg)?;
            services
                .test_requests
                .update_request_status(&id, status)
                .await?;
            println!("Test request {id} is now {}.", status.as_str());
        }
        Some(Commands::Reports { request_id }) => {
            let services = PortalServices::from_config(cfg)?;
            let reports = services
                .test_requests
                .get_reports_by_request_id(&request_id)
                .await?;
            print_json(&reports)?;
        }
        Some(Commands::UploadReport {
            request_id,
            file_name,
            file_type,
            file_url,
            file_size,
        }) => {
            let services = PortalServices::from_config(cfg)?;
            let stored = services
                .test_requests
                .upload_test_report(NewTestReport {
                    request_id,
                    file_name,
                    file_type,
                    file_url,
                    file_size,
                })
                .await?;
            println!("Uploaded report {} for {}.", stored.id, stored.request_id);
        }
        None => {
            println!("Use --help to see available commands");
        }
    }

    Ok(())
}
