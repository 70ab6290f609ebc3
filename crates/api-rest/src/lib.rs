//! # API REST
//!
//! REST API implementation for MedPortal.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON serialization, CORS)
//!
//! Uses `api-shared` for the wire types and `medportal-core` for the providers behind them.

#![warn(rust_2018_idioms)]

mod handlers;

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use medportal_core::PortalServices;

/// Application state for the REST API server
///
/// Holds the providers and services every handler reaches through.
#[derive(Clone)]
pub struct AppState {
    pub services: PortalServices,
}

impl AppState {
    pub fn new(services: PortalServices) -> Self {
        Self { services }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::request_otp,
        handlers::verify_otp,
        handlers::resend_otp,
        handlers::register,
        handlers::share_profile,
        handlers::share_qr_svg,
        handlers::list_test_requests,
        handlers::get_test_request,
        handlers::update_test_request_status,
        handlers::list_reports,
        handlers::upload_report,
        handlers::dashboard_stats,
    ),
    components(schemas(
        api_shared::HealthRes,
        api_shared::SuccessRes,
        api_shared::Role,
        api_shared::RequestOtpReq,
        api_shared::VerifyOtpReq,
        api_shared::ResendOtpReq,
        api_shared::OtpRequestResponse,
        api_shared::OtpVerifyResponse,
        api_shared::AuthUser,
        api_shared::RegisterReq,
        api_shared::RegisterResponse,
        api_shared::QrCodeData,
        api_shared::ShareProfileRes,
        api_shared::TestRequestStatus,
        api_shared::Priority,
        api_shared::StatusFilter,
        api_shared::TestRequest,
        api_shared::ReportFileType,
        api_shared::TestReport,
        api_shared::UploadReportReq,
        api_shared::UpdateStatusReq,
        api_shared::DashboardStats,
    ))
)]
pub struct ApiDoc;

/// Builds the full router: API routes, Swagger UI and permissive CORS.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/auth/otp/request", post(handlers::request_otp))
        .route("/auth/otp/verify", post(handlers::verify_otp))
        .route("/auth/otp/resend", post(handlers::resend_otp))
        .route("/register/:role", post(handlers::register))
        .route("/patients/:id/share", get(handlers::share_profile))
        .route("/patients/:id/share/qr.svg", get(handlers::share_qr_svg))
        .route("/lab/test-requests", get(handlers::list_test_requests))
        .route("/lab/test-requests/:id", get(handlers::get_test_request))
        .route(
            "/lab/test-requests/:id/status",
            put(handlers::update_test_request_status),
        )
        .route(
            "/lab/test-requests/:id/reports",
            get(handlers::list_reports).post(handlers::upload_report),
        )
        .route("/lab/dashboard/stats", get(handlers::dashboard_stats))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use api_shared::{
        DashboardStats, OtpRequestResponse, OtpVerifyResponse, Priority, RegisterResponse,
        ShareProfileRes, TestReport, TestRequest, TestRequestStatus,
    };
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use http_body_util::BodyExt;
    use medportal_core::auth::{AuthProvider, HttpAuthProvider, MockPortalProvider};
    use medportal_core::test_requests::{MemoryTestRequestStore, TestRequestStore};
    use medportal_core::{CoreConfig, Role};
    use serde::de::DeserializeOwned;
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    fn ts(day: u32) -> String {
        format!("2024-03-{day:02}T09:00:00Z")
    }

    fn request_row(id: &str, status: TestRequestStatus, day: u32) -> TestRequest {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "patient_name": "Asha Verma",
            "patient_id": "patient_1",
            "doctor_name": "Dr. Rao",
            "hospital_name": "City Hospital",
            "tests": ["CBC", "Lipid Profile"],
            "doctor_note": "Fasting sample",
            "status": status,
            "priority": Priority::High,
            "created_at": ts(day),
            "updated_at": ts(day),
        }))
        .unwrap()
    }

    fn app() -> Router {
        let store: Arc<dyn TestRequestStore> = Arc::new(MemoryTestRequestStore::new(vec![
            request_row("r1", TestRequestStatus::Pending, 1),
            request_row("r2", TestRequestStatus::Completed, 2),
            request_row("r3", TestRequestStatus::Processing, 3),
        ]));
        let mock = Arc::new(MockPortalProvider::default());
        let services = PortalServices::with_providers(
            Arc::new(CoreConfig::default()),
            mock.clone(),
            mock,
            store,
        );
        router(AppState::new(services))
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, body.to_vec())
    }

    async fn get_json<T: DeserializeOwned>(app: Router, uri: &str) -> (StatusCode, Option<T>) {
        let (status, body) = send(
            app,
            Request::builder().uri(uri).body(Body::empty()).unwrap(),
        )
        .await;
        (status, serde_json::from_slice(&body).ok())
    }

    async fn send_json<T: DeserializeOwned>(
        app: Router,
        method: &str,
        uri: &str,
        body: serde_json::Value,
    ) -> (StatusCode, Option<T>) {
        let (status, body) = send(
            app,
            Request::builder()
                .method(method)
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await;
        (status, serde_json::from_slice(&body).ok())
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = get_json::<api_shared::HealthRes>(app(), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.unwrap().ok);
    }

    #[tokio::test]
    async fn test_request_otp_returns_provider_response() {
        let (status, body) = send_json::<OtpRequestResponse>(
            app(),
            "POST",
            "/auth/otp/request",
            serde_json::json!({"phone": "98765", "role": "patient"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let body = body.unwrap();
        assert!(!body.success);
        assert_eq!(
            body.message.as_deref(),
            Some("Please enter a valid 10-digit mobile number.")
        );

        let (_, body) = send_json::<OtpRequestResponse>(
            app(),
            "POST",
            "/auth/otp/request",
            serde_json::json!({"phone": "9876543210", "role": "doctor"}),
        )
        .await;
        let body = body.unwrap();
        assert!(body.success);
        assert_eq!(body.expires_in, Some(60));
    }

    #[tokio::test]
    async fn test_verify_otp_wrong_and_right_code() {
        let (status, body) = send_json::<OtpVerifyResponse>(
            app(),
            "POST",
            "/auth/otp/verify",
            serde_json::json!({
                "requestId": "req_1", "otp": "000000", "phone": "9876543210", "role": "patient"
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(!body.unwrap().success);

        let (_, body) = send_json::<OtpVerifyResponse>(
            app(),
            "POST",
            "/auth/otp/verify",
            serde_json::json!({
                "requestId": "req_1", "otp": "123456", "phone": "9876543210", "role": "patient"
            }),
        )
        .await;
        let body = body.unwrap();
        assert_eq!(body.user_exists, Some(true));
        assert_eq!(body.user.unwrap().id, "user_patient_1");
    }

    #[tokio::test]
    async fn test_unknown_role_is_bad_request() {
        let (status, _) = send_json::<RegisterResponse>(
            app(),
            "POST",
            "/register/admin",
            serde_json::json!({"phone": "9000000000", "fields": {}, "profileCompletionStep": 1}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_register_lab() {
        let (status, body) = send_json::<RegisterResponse>(
            app(),
            "POST",
            "/register/lab",
            serde_json::json!({
                "phone": "9000000000",
                "fields": {"labName": "Acme", "ownerName": "A. Kumar", "address": "1 Main St"},
                "profileCompletionStep": 1
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.unwrap().user.unwrap().id.starts_with("user_lab_"));
    }

    #[tokio::test]
    async fn test_share_profile_and_svg() {
        let (status, body) = get_json::<ShareProfileRes>(app(), "/patients/patient_1/share").await;
        assert_eq!(status, StatusCode::OK);
        let body = body.unwrap();
        assert!(body
            .share_link
            .starts_with("https://medicalrecords.app/profile/patient_1?qr=qr_"));
        assert!(body.qr_url.starts_with("https://api.qrserver.com/v1/create-qr-code/?size=400x400&data="));

        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/patients/patient_1/share/qr.svg")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/svg+xml");

        let (status, _) = get_json::<ShareProfileRes>(app(), "/patients/bad%20id/share").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_list_and_filter_requests() {
        let (_, all) = get_json::<Vec<TestRequest>>(app(), "/lab/test-requests").await;
        let ids: Vec<_> = all.unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, ["r3", "r2", "r1"]);

        let (_, pending) =
            get_json::<Vec<TestRequest>>(app(), "/lab/test-requests?status=pending").await;
        assert_eq!(pending.unwrap().len(), 1);

        let (status, _) =
            get_json::<Vec<TestRequest>>(app(), "/lab/test-requests?status=urgent").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_get_request_by_id() {
        let (status, body) = get_json::<TestRequest>(app(), "/lab/test-requests/r2").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.unwrap().tests, ["CBC", "Lipid Profile"]);

        let (status, _) = get_json::<TestRequest>(app(), "/lab/test-requests/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_status_update_and_stats() {
        let app = app();

        let (_, stats) = get_json::<DashboardStats>(app.clone(), "/lab/dashboard/stats").await;
        assert_eq!(
            stats.unwrap(),
            DashboardStats {
                pending: 1,
                completed: 1,
                total: 3
            }
        );

        let (status, _) = send_json::<api_shared::SuccessRes>(
            app.clone(),
            "PUT",
            "/lab/test-requests/r1/status",
            serde_json::json!({"status": "completed"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, stats) = get_json::<DashboardStats>(app.clone(), "/lab/dashboard/stats").await;
        assert_eq!(
            stats.unwrap(),
            DashboardStats {
                pending: 0,
                completed: 2,
                total: 3
            }
        );

        let (status, _) = send_json::<api_shared::SuccessRes>(
            app,
            "PUT",
            "/lab/test-requests/missing/status",
            serde_json::json!({"status": "completed"}),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_upload_and_list_reports() {
        let app = app();
        let (status, body) = send_json::<api_shared::SuccessRes>(
            app.clone(),
            "POST",
            "/lab/test-requests/r3/reports",
            serde_json::json!({
                "fileName": "cbc.pdf",
                "fileType": "pdf",
                "fileUrl": "https://files.example/cbc.pdf",
                "fileSize": 2048
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.unwrap().success);

        let (_, reports) =
            get_json::<Vec<TestReport>>(app.clone(), "/lab/test-requests/r3/reports").await;
        let reports = reports.unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].file_name, "cbc.pdf");

        let (status, _) = send_json::<api_shared::SuccessRes>(
            app,
            "POST",
            "/lab/test-requests/r3/reports",
            serde_json::json!({
                "fileName": "",
                "fileType": "image",
                "fileUrl": "https://files.example/x.png",
                "fileSize": 1
            }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_http_provider_against_served_router() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            axum::serve(listener, app()).await.unwrap();
        });

        let provider =
            HttpAuthProvider::new(&format!("http://{addr}"), Duration::from_secs(5)).unwrap();
        let issued = provider
            .request_otp("9876543212", Role::Lab)
            .await
            .unwrap();
        assert!(issued.success);

        let verified = provider
            .verify_otp(
                &issued.request_id.unwrap(),
                "123456",
                "9876543212",
                Role::Lab,
            )
            .await
            .unwrap();
        assert_eq!(verified.user_exists, Some(true));

        server.abort();
    }
    struct OfflineStore;

    #[async_trait::async_trait]
    impl TestRequestStore for OfflineStore {
        async fn list(
            &self,
            _status: Option<TestRequestStatus>,
        ) -> medportal_core::PortalResult<Vec<TestRequest>> {
            Err(medportal_core::PortalError::RemoteCallFailure("offline".into()))
        }
        async fn statuses(&self) -> medportal_core::PortalResult<Vec<TestRequestStatus>> {
            Err(medportal_core::PortalError::RemoteCallFailure("offline".into()))
        }
        async fn get(&self, _id: &str) -> medportal_core::PortalResult<Option<TestRequest>> {
            Err(medportal_core::PortalError::RemoteCallFailure("offline".into()))
        }
        async fn update_status(
            &self,
            _id: &str,
            _status: TestRequestStatus,
            _updated_at: chrono::DateTime<chrono::Utc>,
        ) -> medportal_core::PortalResult<()> {
            Err(medportal_core::PortalError::RemoteCallFailure("offline".into()))
        }
        async fn insert_report(
            &self,
            _report: api_shared::NewTestReport,
        ) -> medportal_core::PortalResult<TestReport> {
            Err(medportal_core::PortalError::RemoteCallFailure("offline".into()))
        }
        async fn reports_for(
            &self,
            _request_id: &str,
        ) -> medportal_core::PortalResult<Vec<TestReport>> {
            Err(medportal_core::PortalError::RemoteCallFailure("offline".into()))
        }
    }

    #[tokio::test]
    async fn test_store_failure_is_bad_gateway_with_generic_message() {
        let mock = Arc::new(MockPortalProvider::default());
        let services = PortalServices::with_providers(
            Arc::new(CoreConfig::default()),
            mock.clone(),
            mock,
            Arc::new(OfflineStore),
        );
        let (status, body) = send(
            router(AppState::new(services)),
            Request::builder()
                .uri("/lab/dashboard/stats")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body, b"Network error. Please try again.");
    }
}
