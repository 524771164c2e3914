//! OTP endpoints: send, verify, resend, and verifier refresh.
//!
//! Each attempt produces exactly one success or one failure response; rate
//! limits are enforced before any verifier or provider work.

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use tracing::error;

use super::rate_limit::{RateLimitAction, RateLimitDecision};
use super::state::OtpState;
use super::types::{MessageResponse, SendCodeRequest, SendCodeResponse, VerifyCodeRequest};
use super::utils::extract_client_ip;
use crate::challenge::Purpose;
use crate::error::Error;
use crate::verifier::{VerifierHandle, WidgetCallbacks};

/// Request a one-time code for the identifier.
#[utoipa::path(
    post,
    path = "/v1/otp/send",
    request_body = SendCodeRequest,
    responses(
        (status = 200, description = "Code requested", body = SendCodeResponse),
        (status = 400, description = "Invalid identifier", body = String),
        (status = 409, description = "Widget conflict, refresh required", body = String),
        (status = 429, description = "Rate limited", body = String),
        (status = 502, description = "Delivery failed", body = String)
    ),
    tag = "otp"
)]
pub async fn send_code(
    headers: HeaderMap,
    state: Extension<Arc<OtpState>>,
    payload: Option<Json<SendCodeRequest>>,
) -> Response {
    let Some(Json(request)) = payload else {
        return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response();
    };

    if let Some(limited) = rate_limited(&state, &headers, &request.identifier, RateLimitAction::SendCode)
    {
        return limited;
    }

    let handle = match acquire_handle(&state, request.purpose, false).await {
        Ok(handle) => handle,
        Err(response) => return response,
    };

    match state
        .client()
        .send_code(&request.identifier, request.purpose, handle.as_ref())
        .await
    {
        Ok(session) => (
            StatusCode::OK,
            Json(SendCodeResponse {
                message: send_message(request.purpose).to_string(),
                marker: session.marker().to_string(),
                code_length: session.code_length(),
                issued_at: session.issued_at_unix(),
            }),
        )
            .into_response(),
        Err(err) => {
            error!("Failed to send code: {err}");
            error_response(&err)
        }
    }
}

/// Confirm a submitted one-time code.
#[utoipa::path(
    post,
    path = "/v1/otp/verify",
    request_body = VerifyCodeRequest,
    responses(
        (status = 204, description = "Code verified"),
        (status = 400, description = "Malformed code", body = String),
        (status = 401, description = "Code rejected", body = String),
        (status = 429, description = "Rate limited", body = String)
    ),
    tag = "otp"
)]
pub async fn verify_code(
    headers: HeaderMap,
    state: Extension<Arc<OtpState>>,
    payload: Option<Json<VerifyCodeRequest>>,
) -> Response {
    let Some(Json(request)) = payload else {
        return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response();
    };

    if let Some(limited) = rate_limited(
        &state,
        &headers,
        &request.identifier,
        RateLimitAction::VerifyCode,
    ) {
        return limited;
    }

    match state
        .client()
        .verify_code(&request.identifier, request.purpose, &request.code)
        .await
    {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            error!("Failed to verify code: {err}");
            error_response(&err)
        }
    }
}

/// Re-issue the code for an identifier; supersedes the previous one.
#[utoipa::path(
    post,
    path = "/v1/otp/resend",
    request_body = SendCodeRequest,
    responses(
        (status = 200, description = "Code resent", body = MessageResponse),
        (status = 400, description = "Invalid identifier", body = String),
        (status = 429, description = "Rate limited", body = String),
        (status = 502, description = "Delivery failed", body = String)
    ),
    tag = "otp"
)]
pub async fn resend_code(
    headers: HeaderMap,
    state: Extension<Arc<OtpState>>,
    payload: Option<Json<SendCodeRequest>>,
) -> Response {
    let Some(Json(request)) = payload else {
        return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response();
    };

    if let Some(limited) = rate_limited(
        &state,
        &headers,
        &request.identifier,
        RateLimitAction::ResendCode,
    ) {
        return limited;
    }

    let handle = match acquire_handle(&state, request.purpose, false).await {
        Ok(handle) => handle,
        Err(response) => return response,
    };

    match state
        .client()
        .resend_code(&request.identifier, request.purpose, handle.as_ref())
        .await
    {
        Ok(()) => (
            StatusCode::OK,
            Json(MessageResponse {
                message: resend_message(request.purpose).to_string(),
            }),
        )
            .into_response(),
        Err(err) => {
            error!("Failed to resend code: {err}");
            error_response(&err)
        }
    }
}

/// Tear down and recreate the verifier, bypassing reuse. For callers that
/// want to retry past a widget error.
#[utoipa::path(
    post,
    path = "/v1/otp/refresh",
    responses(
        (status = 200, description = "Verifier recreated", body = MessageResponse),
        (status = 409, description = "Widget conflict, refresh required", body = String),
        (status = 429, description = "Rate limited", body = String)
    ),
    tag = "otp"
)]
pub async fn refresh_verifier(
    headers: HeaderMap,
    state: Extension<Arc<OtpState>>,
) -> Response {
    let client_ip = extract_client_ip(&headers);
    if state
        .rate_limiter()
        .check_ip(client_ip.as_deref(), RateLimitAction::RefreshVerifier)
        == RateLimitDecision::Limited
    {
        return (StatusCode::TOO_MANY_REQUESTS, "Rate limited".to_string()).into_response();
    }

    match acquire_handle(&state, Purpose::Signin, true).await {
        Ok(_handle) => (
            StatusCode::OK,
            Json(MessageResponse {
                message: "Verifier Refreshed".to_string(),
            }),
        )
            .into_response(),
        Err(response) => response,
    }
}

/// Run both rate-limit checks; `Some` is the refusal response.
fn rate_limited(
    state: &OtpState,
    headers: &HeaderMap,
    identifier: &str,
    action: RateLimitAction,
) -> Option<Response> {
    let client_ip = extract_client_ip(headers);
    if state.rate_limiter().check_ip(client_ip.as_deref(), action) == RateLimitDecision::Limited {
        return Some((StatusCode::TOO_MANY_REQUESTS, "Rate limited".to_string()).into_response());
    }
    if state.rate_limiter().check_identifier(identifier, action) == RateLimitDecision::Limited {
        return Some((StatusCode::TOO_MANY_REQUESTS, "Rate limited".to_string()).into_response());
    }
    None
}

/// Get a verifier handle when the purpose needs presence proof.
///
/// `force` bypasses reuse. Returns the ready error response on failure so
/// handlers surface exactly one message.
async fn acquire_handle(
    state: &OtpState,
    purpose: Purpose,
    force: bool,
) -> Result<Option<VerifierHandle>, Response> {
    let needs_handle = purpose.requires_presence_proof() && !state.client().bypasses_verification();
    if !needs_handle && !force {
        return Ok(None);
    }

    let config = state.config();
    let result = if force {
        state
            .manager()
            .force_refresh(
                config.container_key(),
                config.presentation_mode(),
                WidgetCallbacks::new(),
            )
            .await
    } else {
        state
            .manager()
            .get_or_create(
                config.container_key(),
                config.presentation_mode(),
                WidgetCallbacks::new(),
            )
            .await
    };

    match result {
        Ok(handle) => Ok(Some(handle)),
        Err(err) => {
            error!("Failed to prepare verifier: {err}");
            Err(error_response(&err))
        }
    }
}

fn send_message(purpose: Purpose) -> &'static str {
    match purpose {
        Purpose::Recovery => "Reset Link Sent",
        Purpose::Signup | Purpose::Signin => "Code Sent",
    }
}

fn resend_message(purpose: Purpose) -> &'static str {
    match purpose {
        Purpose::Recovery => "Reset Link Sent",
        Purpose::Signup | Purpose::Signin => "Code Resent",
    }
}

fn error_response(err: &Error) -> Response {
    let status = match err {
        Error::InvalidCodeFormat | Error::InvalidIdentifier(_) => StatusCode::BAD_REQUEST,
        Error::VerificationFailed(_) => StatusCode::UNAUTHORIZED,
        Error::Conflict => StatusCode::CONFLICT,
        Error::VerifierNotReady => StatusCode::UNPROCESSABLE_ENTITY,
        Error::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
        Error::Transient(_) | Error::SendFailed(_) => StatusCode::BAD_GATEWAY,
    };
    (status, err.to_string()).into_response()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::super::rate_limit::{DenyAllRateLimiter, NoopRateLimiter, RateLimiter};
    use super::super::state::{OtpConfig, OtpState};
    use super::super::types::{SendCodeRequest, VerifyCodeRequest};
    use super::{refresh_verifier, resend_code, send_code, verify_code};
    use crate::challenge::{ChallengeClient, Purpose};
    use crate::provider::testing::{FakeProvider, FakeState};
    use crate::provider::{ContainerHost, InMemoryHost, ProviderError};
    use crate::verifier::{ManagerConfig, VerifierManager};
    use axum::extract::Extension;
    use axum::http::{HeaderMap, StatusCode};
    use axum::response::IntoResponse;
    use axum::Json;
    use std::sync::Arc;

    fn otp_state(rate_limiter: Arc<dyn RateLimiter>) -> (Arc<OtpState>, Arc<FakeState>) {
        let (provider, state) = FakeProvider::new();
        let host = Arc::new(InMemoryHost::new());
        let manager = Arc::new(VerifierManager::new(
            provider.clone(),
            host as Arc<dyn ContainerHost>,
            ManagerConfig::new()
                .with_teardown_settle_ms(0)
                .with_mount_settle_ms(0),
        ));
        let client = ChallengeClient::new(provider);
        let config = OtpConfig::new("https://app.presenza.dev".to_string());
        (
            Arc::new(OtpState::new(config, manager, client, rate_limiter)),
            state,
        )
    }

    #[tokio::test]
    async fn send_missing_payload_is_bad_request() {
        let (state, _fake) = otp_state(Arc::new(NoopRateLimiter));
        let response = send_code(HeaderMap::new(), Extension(state), None)
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn send_renders_verifier_and_delivers() {
        let (state, fake) = otp_state(Arc::new(NoopRateLimiter));
        let response = send_code(
            HeaderMap::new(),
            Extension(state),
            Some(Json(SendCodeRequest {
                identifier: "+911234567890".to_string(),
                purpose: Purpose::Signin,
            })),
        )
        .await
        .into_response();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(fake.render_count(), 1);
        assert_eq!(fake.sends.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn verify_malformed_code_is_rejected_locally() {
        let (state, fake) = otp_state(Arc::new(NoopRateLimiter));
        let response = verify_code(
            HeaderMap::new(),
            Extension(state),
            Some(Json(VerifyCodeRequest {
                identifier: "+911234567890".to_string(),
                purpose: Purpose::Signin,
                code: "12a45".to_string(),
            })),
        )
        .await
        .into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(fake.confirm_count(), 0);
    }

    #[tokio::test]
    async fn verify_success_is_no_content() {
        let (state, fake) = otp_state(Arc::new(NoopRateLimiter));
        let response = verify_code(
            HeaderMap::new(),
            Extension(state),
            Some(Json(VerifyCodeRequest {
                identifier: "+911234567890".to_string(),
                purpose: Purpose::Signin,
                code: "123456".to_string(),
            })),
        )
        .await
        .into_response();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(fake.confirm_count(), 1);
    }

    #[tokio::test]
    async fn rate_limited_requests_never_reach_the_provider() {
        let (state, fake) = otp_state(Arc::new(DenyAllRateLimiter));
        let response = send_code(
            HeaderMap::new(),
            Extension(state),
            Some(Json(SendCodeRequest {
                identifier: "+911234567890".to_string(),
                purpose: Purpose::Signin,
            })),
        )
        .await
        .into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(fake.render_count(), 0);
        assert_eq!(fake.sends.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn widget_conflict_maps_to_conflict_status() {
        let (state, fake) = otp_state(Arc::new(NoopRateLimiter));
        fake.fail_next_render(ProviderError::AlreadyRendered(
            "presenza-verifier".to_string(),
        ));

        let response = send_code(
            HeaderMap::new(),
            Extension(state.clone()),
            Some(Json(SendCodeRequest {
                identifier: "+911234567890".to_string(),
                purpose: Purpose::Signin,
            })),
        )
        .await
        .into_response();

        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert!(!state.manager().is_ready());
    }

    #[tokio::test]
    async fn recovery_send_skips_the_verifier() {
        let (state, fake) = otp_state(Arc::new(NoopRateLimiter));
        let response = send_code(
            HeaderMap::new(),
            Extension(state),
            Some(Json(SendCodeRequest {
                identifier: "alice@example.com".to_string(),
                purpose: Purpose::Recovery,
            })),
        )
        .await
        .into_response();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(fake.render_count(), 0);
        assert_eq!(fake.sends.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn resend_reports_resent_message() {
        let (state, fake) = otp_state(Arc::new(NoopRateLimiter));
        let response = resend_code(
            HeaderMap::new(),
            Extension(state),
            Some(Json(SendCodeRequest {
                identifier: "+911234567890".to_string(),
                purpose: Purpose::Signin,
            })),
        )
        .await
        .into_response();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(fake.sends.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn refresh_always_rerenders() {
        let (state, fake) = otp_state(Arc::new(NoopRateLimiter));

        let first = refresh_verifier(HeaderMap::new(), Extension(state.clone()))
            .await
            .into_response();
        assert_eq!(first.status(), StatusCode::OK);

        let second = refresh_verifier(HeaderMap::new(), Extension(state))
            .await
            .into_response();
        assert_eq!(second.status(), StatusCode::OK);
        assert_eq!(fake.render_count(), 2);
    }
}
