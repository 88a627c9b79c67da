// teamseat-service/src/models/invitations.rs
use crate::models::InviteStatus;
use chrono::{DateTime, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};

// Whether a token survives its first successful admission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum TokenPolicy {
    #[serde(rename = "single_use")]
    #[display(fmt = "single-use")]
    SingleUse,
    #[serde(rename = "shareable")]
    #[display(fmt = "shareable")]
    Shareable,
}

// Capability for joining exactly one team
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct InviteToken {
    pub token: String,
    pub team_id: String,
    pub policy: TokenPolicy,
    pub used: bool,
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl InviteToken {
    pub fn new(token: String, team_id: String, policy: TokenPolicy) -> Self {
        Self {
            token,
            team_id,
            policy,
            used: false,
            used_at: None,
            created_at: Utc::now(),
        }
    }

    // A used token can no longer admit anyone
    pub fn is_redeemable(&self) -> bool {
        !self.used
    }

    pub fn consume(&mut self) {
        if self.policy == TokenPolicy::SingleUse {
            self.used = true;
            self.used_at = Some(Utc::now());
        }
    }
}

// Request to join a team through an invite link
#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AdmitRequest {
    pub token: Option<String>,
    pub member_email: Option<String>,
    #[serde(default)]
    pub added_by_leader: bool,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AdmitResponse {
    pub success: bool,
    pub message: String,
    pub invite_status: InviteStatus,
}

// Someone opened the join page for a token
#[derive(Serialize, Deserialize, Debug)]
pub struct InviteViewRequest {
    pub token: Option<String>,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RemoveMemberRequest {
    pub team_id: Option<String>,
    pub member_email: Option<String>,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatusRequest {
    pub team_id: Option<String>,
}
