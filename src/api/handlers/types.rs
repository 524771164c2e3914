//! Request/response types for OTP endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::challenge::Purpose;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SendCodeRequest {
    pub identifier: String,
    pub purpose: Purpose,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SendCodeResponse {
    pub message: String,
    pub marker: String,
    pub code_length: usize,
    pub issued_at: u64,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct VerifyCodeRequest {
    pub identifier: String,
    pub purpose: Purpose,
    pub code: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct MessageResponse {
    pub message: String,
}
