// teamseat-service/src/models/mod.rs
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use chrono::{DateTime, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use serde_json::json;

pub mod billing;
pub use billing::*;

pub mod team;
pub use team::*;

pub mod invitations;
pub use invitations::*;

// Dashboard view of one of a leader's teams
#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct TeamOverview {
    pub id: String,
    pub access_type: AccessType,
    pub seat_limit: u32,
    pub seats_used: u32,
    pub seats_remaining: u32,
    pub status: TeamStatus,
    pub course_space_id: Option<String>,
    pub converted_from_individual: bool,
    pub invite_link: Option<String>,
    pub members: Vec<MemberOverview>,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct MemberOverview {
    pub email: String,
    pub invite_status: InviteStatus,
    pub joined_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct DashboardResponse {
    pub teams: Vec<TeamOverview>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct DashboardQuery {
    pub email: Option<String>,
}

// Custom error types
#[derive(Debug, Display, PartialEq)]
pub enum ServiceError {
    #[display(fmt = "Internal Server Error")]
    InternalServerError,
    #[display(fmt = "BadRequest: {}", _0)]
    BadRequest(String),
    #[display(fmt = "Unauthorized: {}", _0)]
    Unauthorized(String),
    #[display(fmt = "Not Found: {}", _0)]
    NotFound(String),
    #[display(fmt = "Conflict: {}", _0)]
    Conflict(String),
    #[display(fmt = "Inactive: {}", _0)]
    Inactive(String),
    #[display(fmt = "Upstream Unavailable: {}", _0)]
    UpstreamUnavailable(String),
}

impl std::error::Error for ServiceError {}

impl ResponseError for ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
            ServiceError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServiceError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Conflict(_) => StatusCode::CONFLICT,
            ServiceError::Inactive(_) => StatusCode::GONE,
            ServiceError::UpstreamUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            ServiceError::InternalServerError => "Internal Server Error".to_string(),
            ServiceError::BadRequest(msg)
            | ServiceError::Unauthorized(msg)
            | ServiceError::NotFound(msg)
            | ServiceError::Conflict(msg)
            | ServiceError::Inactive(msg)
            | ServiceError::UpstreamUnavailable(msg) => msg.clone(),
        };
        HttpResponse::build(self.status_code()).json(json!({ "error": message }))
    }
}
