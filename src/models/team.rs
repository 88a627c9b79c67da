// teamseat-service/src/models/team.rs
use chrono::{DateTime, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};

// Which member tag a team hands out on admission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum AccessType {
    #[serde(rename = "subscription")]
    #[display(fmt = "subscription")]
    Subscription,
    #[serde(rename = "course")]
    #[display(fmt = "course")]
    Course,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum TeamStatus {
    #[serde(rename = "active")]
    #[display(fmt = "active")]
    Active,
    #[serde(rename = "revoked")]
    #[display(fmt = "revoked")]
    Revoked,
}

// One team per paying leader subscription
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Team {
    pub id: String,
    pub leader_email: String,
    pub billing_customer_ref: String,
    pub billing_subscription_ref: String,
    pub access_type: AccessType,
    pub seat_limit: u32,
    pub status: TeamStatus,
    pub course_space_id: Option<String>,
    pub converted_from_individual: bool,
    pub converted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Team {
    pub fn is_active(&self) -> bool {
        self.status == TeamStatus::Active
    }
}

// Coarse membership flag, drives seat counting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum MemberStatus {
    #[serde(rename = "active")]
    #[display(fmt = "active")]
    Active,
    #[serde(rename = "revoked")]
    #[display(fmt = "revoked")]
    Revoked,
}

/// Onboarding funnel state of a team member.
///
/// Advances `Invited -> Viewed -> Opened -> Active`. `Revoked` can be reached
/// from any state and is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum InviteStatus {
    #[serde(rename = "invited")]
    #[display(fmt = "invited")]
    Invited,
    #[serde(rename = "viewed")]
    #[display(fmt = "viewed")]
    Viewed,
    #[serde(rename = "opened")]
    #[display(fmt = "opened")]
    Opened,
    #[serde(rename = "active")]
    #[display(fmt = "active")]
    Active,
    #[serde(rename = "revoked")]
    #[display(fmt = "revoked")]
    Revoked,
}

impl InviteStatus {
    fn rank(self) -> u8 {
        match self {
            InviteStatus::Invited => 0,
            InviteStatus::Viewed => 1,
            InviteStatus::Opened => 2,
            InviteStatus::Active => 3,
            InviteStatus::Revoked => 4,
        }
    }

    /// True when moving to `next` goes strictly forward in the funnel.
    pub fn can_advance_to(self, next: InviteStatus) -> bool {
        if self == InviteStatus::Revoked {
            return false;
        }
        next == InviteStatus::Revoked || next.rank() > self.rank()
    }
}

// One row per admission attempt; revocations keep the row
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TeamMember {
    pub id: String,
    pub team_id: String,
    pub member_email: String,
    pub member_external_ref: Option<String>,
    pub status: MemberStatus,
    pub invite_status: InviteStatus,
    // Set until the community platform confirms the team's access tag
    #[serde(default)]
    pub tag_pending: bool,
    pub joined_at: DateTime<Utc>,
}

impl TeamMember {
    pub fn new(
        team_id: &str,
        member_email: &str,
        member_external_ref: Option<String>,
        invite_status: InviteStatus,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            team_id: team_id.to_string(),
            member_email: member_email.to_string(),
            member_external_ref,
            status: MemberStatus::Active,
            invite_status,
            tag_pending: true,
            joined_at: Utc::now(),
        }
    }

    pub fn holds_seat(&self) -> bool {
        self.status != MemberStatus::Revoked
    }

    // Onboarding or tagging still needs the status sync
    pub fn needs_sync(&self) -> bool {
        self.holds_seat() && (self.invite_status != InviteStatus::Active || self.tag_pending)
    }
}
