// teamseat-service/src/utils/mod.rs
use crate::models::ServiceError;
use lazy_static::lazy_static;
use rand::Rng;
use regex::Regex;

pub mod config;
pub mod ledger;
pub mod signature;

pub use config::AppConfig;
pub use ledger::Ledger;

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
}

// E-mail helpers
pub mod email {
    use super::*;

    // Lower-case and trim an e-mail for storage and comparison
    pub fn normalize(email: &str) -> String {
        email.trim().to_lowercase()
    }

    // Normalize an optional request field, rejecting blanks and malformed addresses
    pub fn require(email: Option<&str>) -> Result<String, ServiceError> {
        let email = match email.map(normalize) {
            Some(email) if !email.is_empty() => email,
            _ => return Err(ServiceError::BadRequest("Email is required".to_string())),
        };

        if !EMAIL_RE.is_match(&email) {
            return Err(ServiceError::BadRequest(format!("Invalid email: {}", email)));
        }

        Ok(email)
    }
}

// Invite token helpers
pub mod tokens {
    use super::*;

    const TOKEN_CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
    const TOKEN_LEN: usize = 16;

    pub fn generate_token() -> String {
        let mut rng = rand::thread_rng();
        (0..TOKEN_LEN)
            .map(|_| TOKEN_CHARS[rng.gen_range(0..TOKEN_CHARS.len())] as char)
            .collect()
    }

    // Join URL handed out on the dashboard
    pub fn join_link(site_url: &str, token: &str) -> String {
        format!("{}/join?token={}", site_url.trim_end_matches('/'), token)
    }
}

// Pull a required, non-blank string field out of a request body
pub fn require_field(value: Option<&str>, name: &str) -> Result<String, ServiceError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(ServiceError::BadRequest(format!("{} is required", name))),
    }
}
