//! Route handlers.
//!
//! Provider responses are returned as-is: business failures (bad phone, wrong code) are
//! `200` with `success: false`. Only errors change the status code, see [`error_response`].

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::AppState;
use api_shared::{
    DashboardStats, HealthRes, HealthService, NewTestReport, OtpRequestResponse,
    OtpVerifyResponse, RegisterReq, RegisterResponse, RequestOtpReq, ResendOtpReq, Role,
    ShareProfileRes, StatusFilter, SuccessRes, TestReport, TestRequest, UpdateStatusReq,
    UploadReportReq, VerifyOtpReq,
};
use medportal_core::constants::MSG_NETWORK_ERROR;
use medportal_core::PortalError;

pub(crate) type ApiError = (StatusCode, &'static str);

/// Logs `e` and maps it to a status code and a short body.
///
/// Remote failures become `502` with the same generic message every screen shows.
fn error_response(context: &str, e: PortalError) -> ApiError {
    tracing::error!("{}: {:?}", context, e);
    match e {
        PortalError::InvalidInput(_)
        | PortalError::InvalidPhone(_)
        | PortalError::MissingField(_)
        | PortalError::UnknownField { .. } => (StatusCode::BAD_REQUEST, "Bad request"),
        PortalError::NotFound(_) => (StatusCode::NOT_FOUND, "Not found"),
        PortalError::RemoteCallFailure(_) => (StatusCode::BAD_GATEWAY, MSG_NETWORK_ERROR),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "Internal error"),
    }
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for the REST API
pub(crate) async fn health() -> Json<HealthRes> {
    Json(HealthService::check_health())
}

#[utoipa::path(
    post,
    path = "/auth/otp/request",
    request_body = RequestOtpReq,
    responses(
        (status = 200, description = "OTP issued, or rejected with a message", body = OtpRequestResponse),
        (status = 502, description = "Auth provider unreachable")
    )
)]
/// Request an OTP for a phone number and role
#[axum::debug_handler]
pub(crate) async fn request_otp(
    State(state): State<AppState>,
    Json(req): Json<RequestOtpReq>,
) -> Result<Json<OtpRequestResponse>, ApiError> {
    state
        .services
        .auth
        .request_otp(&req.phone, req.role)
        .await
        .map(Json)
        .map_err(|e| error_response("Request OTP error", e))
}

#[utoipa::path(
    post,
    path = "/auth/otp/verify",
    request_body = VerifyOtpReq,
    responses(
        (status = 200, description = "Verification result", body = OtpVerifyResponse),
        (status = 502, description = "Auth provider unreachable")
    )
)]
/// Verify an OTP
///
/// On success `userExists` tells the client whether to route home or to registration.
#[axum::debug_handler]
pub(crate) async fn verify_otp(
    State(state): State<AppState>,
    Json(req): Json<VerifyOtpReq>,
) -> Result<Json<OtpVerifyResponse>, ApiError> {
    state
        .services
        .auth
        .verify_otp(&req.request_id, &req.otp, &req.phone, req.role)
        .await
        .map(Json)
        .map_err(|e| error_response("Verify OTP error", e))
}

#[utoipa::path(
    post,
    path = "/auth/otp/resend",
    request_body = ResendOtpReq,
    responses(
        (status = 200, description = "New OTP issued", body = OtpRequestResponse),
        (status = 502, description = "Auth provider unreachable")
    )
)]
/// Resend an OTP, issuing a new request id
#[axum::debug_handler]
pub(crate) async fn resend_otp(
    State(state): State<AppState>,
    Json(req): Json<ResendOtpReq>,
) -> Result<Json<OtpRequestResponse>, ApiError> {
    state
        .services
        .auth
        .resend_otp(&req.request_id)
        .await
        .map(Json)
        .map_err(|e| error_response("Resend OTP error", e))
}

#[utoipa::path(
    post,
    path = "/register/{role}",
    request_body = RegisterReq,
    params(
        ("role" = Role, Path, description = "patient, doctor or lab")
    ),
    responses(
        (status = 200, description = "Registration result", body = RegisterResponse),
        (status = 400, description = "Unknown role or malformed body"),
        (status = 502, description = "Registration provider unreachable")
    )
)]
/// Submit a registration for a role
#[axum::debug_handler]
pub(crate) async fn register(
    State(state): State<AppState>,
    Path(role): Path<Role>,
    Json(req): Json<RegisterReq>,
) -> Result<Json<RegisterResponse>, ApiError> {
    let registration = &state.services.registration;
    let result = match role {
        Role::Patient => registration.register_patient(&req).await,
        Role::Doctor => registration.register_doctor(&req).await,
        Role::Lab => registration.register_lab(&req).await,
    };
    result
        .map(Json)
        .map_err(|e| error_response("Register error", e))
}

#[utoipa::path(
    get,
    path = "/patients/{id}/share",
    params(
        ("id" = String, Path, description = "Patient identifier")
    ),
    responses(
        (status = 200, description = "Fresh share link and QR image URL", body = ShareProfileRes),
        (status = 400, description = "Patient id is empty or not URL-safe")
    )
)]
/// Generate a fresh share link for a patient profile
///
/// Every call draws a new token. Earlier links are not revoked.
#[axum::debug_handler]
pub(crate) async fn share_profile(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ShareProfileRes>, ApiError> {
    state
        .services
        .share
        .regenerate(&id)
        .map(Json)
        .map_err(|e| error_response("Share profile error", e))
}

#[utoipa::path(
    get,
    path = "/patients/{id}/share/qr.svg",
    params(
        ("id" = String, Path, description = "Patient identifier")
    ),
    responses(
        (status = 200, description = "QR code for a fresh share link", content_type = "image/svg+xml", body = String),
        (status = 400, description = "Patient id is empty or not URL-safe")
    )
)]
/// Render a fresh share link as an SVG QR code
#[axum::debug_handler]
pub(crate) async fn share_qr_svg(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let share = &state.services.share;
    let svg = share
        .regenerate(&id)
        .and_then(|res| share.render_svg(&res.share_link))
        .map_err(|e| error_response("Share QR error", e))?;

    Ok(([(header::CONTENT_TYPE, "image/svg+xml")], svg))
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub(crate) struct ListRequestsQuery {
    /// `pending`, `completed` or `all` (default)
    #[serde(default)]
    status: StatusFilter,
}

#[utoipa::path(
    get,
    path = "/lab/test-requests",
    params(ListRequestsQuery),
    responses(
        (status = 200, description = "Test requests, newest first", body = [TestRequest]),
        (status = 400, description = "Unknown status filter"),
        (status = 502, description = "Store unreachable")
    )
)]
/// List test requests, optionally filtered by status
#[axum::debug_handler]
pub(crate) async fn list_test_requests(
    State(state): State<AppState>,
    Query(query): Query<ListRequestsQuery>,
) -> Result<Json<Vec<TestRequest>>, ApiError> {
    state
        .services
        .test_requests
        .get_test_requests(query.status)
        .await
        .map(Json)
        .map_err(|e| error_response("List test requests error", e))
}

#[utoipa::path(
    get,
    path = "/lab/test-requests/{id}",
    params(
        ("id" = String, Path, description = "Test request identifier")
    ),
    responses(
        (status = 200, description = "The test request", body = TestRequest),
        (status = 404, description = "No such test request"),
        (status = 502, description = "Store unreachable")
    )
)]
/// Fetch one test request
#[axum::debug_handler]
pub(crate) async fn get_test_request(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TestRequest>, ApiError> {
    match state.services.test_requests.get_test_request_by_id(&id).await {
        Ok(Some(request)) => Ok(Json(request)),
        Ok(None) => Err((StatusCode::NOT_FOUND, "Not found")),
        Err(e) => Err(error_response("Get test request error", e)),
    }
}

#[utoipa::path(
    put,
    path = "/lab/test-requests/{id}/status",
    request_body = UpdateStatusReq,
    params(
        ("id" = String, Path, description = "Test request identifier")
    ),
    responses(
        (status = 200, description = "Status updated", body = SuccessRes),
        (status = 404, description = "No such test request"),
        (status = 502, description = "Store unreachable")
    )
)]
/// Set a test request's status
#[axum::debug_handler]
pub(crate) async fn update_test_request_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateStatusReq>,
) -> Result<Json<SuccessRes>, ApiError> {
    state
        .services
        .test_requests
        .update_request_status(&id, req.status)
        .await
        .map(|()| Json(SuccessRes { success: true }))
        .map_err(|e| error_response("Update test request status error", e))
}

#[utoipa::path(
    get,
    path = "/lab/test-requests/{id}/reports",
    params(
        ("id" = String, Path, description = "Test request identifier")
    ),
    responses(
        (status = 200, description = "Reports, newest first", body = [TestReport]),
        (status = 502, description = "Store unreachable")
    )
)]
/// List the reports uploaded for a test request
#[axum::debug_handler]
pub(crate) async fn list_reports(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<TestReport>>, ApiError> {
    state
        .services
        .test_requests
        .get_reports_by_request_id(&id)
        .await
        .map(Json)
        .map_err(|e| error_response("List reports error", e))
}

#[utoipa::path(
    post,
    path = "/lab/test-requests/{id}/reports",
    request_body = UploadReportReq,
    params(
        ("id" = String, Path, description = "Test request identifier")
    ),
    responses(
        (status = 200, description = "Report recorded", body = SuccessRes),
        (status = 400, description = "Empty file name or URL"),
        (status = 404, description = "No such test request"),
        (status = 502, description = "Store unreachable")
    )
)]
/// Record an uploaded report file against a test request
#[axum::debug_handler]
pub(crate) async fn upload_report(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UploadReportReq>,
) -> Result<Json<SuccessRes>, ApiError> {
    let report = NewTestReport {
        request_id: id,
        file_name: req.file_name,
        file_type: req.file_type,
        file_url: req.file_url,
        file_size: req.file_size,
    };
    state
        .services
        .test_requests
        .upload_test_report(report)
        .await
        .map(|_| Json(SuccessRes { success: true }))
        .map_err(|e| error_response("Upload report error", e))
}

#[utoipa::path(
    get,
    path = "/lab/dashboard/stats",
    responses(
        (status = 200, description = "Counts by status", body = DashboardStats),
        (status = 502, description = "Store unreachable")
    )
)]
/// Pending, completed and total test request counts
#[axum::debug_handler]
pub(crate) async fn dashboard_stats(
    State(state): State<AppState>,
) -> Result<Json<DashboardStats>, ApiError> {
    state
        .services
        .test_requests
        .get_dashboard_stats()
        .await
        .map(Json)
        .map_err(|e| error_response("Dashboard stats error", e))
}
