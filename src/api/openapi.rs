//! `OpenAPI` document for the OTP endpoints.

use utoipa::OpenApi;

use super::handlers;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health::health,
        handlers::otp::send_code,
        handlers::otp::verify_code,
        handlers::otp::resend_code,
        handlers::otp::refresh_verifier,
    ),
    components(schemas(
        handlers::health::Health,
        handlers::types::SendCodeRequest,
        handlers::types::SendCodeResponse,
        handlers::types::VerifyCodeRequest,
        handlers::types::MessageResponse,
        crate::challenge::Purpose,
    )),
    tags(
        (name = "otp", description = "One-time code delivery and confirmation"),
        (name = "health", description = "Service health")
    )
)]
pub struct ApiDoc;

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

#[cfg(test)]
mod tests {
    use super::openapi;

    #[test]
    fn document_lists_every_otp_route() {
        let doc = openapi();
        for path in [
            "/health",
            "/v1/otp/send",
            "/v1/otp/verify",
            "/v1/otp/resend",
            "/v1/otp/refresh",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
