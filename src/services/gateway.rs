// teamseat-service/src/services/gateway.rs
//! Tag/access gateway to the community platform.
//!
//! [`TagGateway`] is the only way the rest of the service touches member tags.
//! The platform answers the same question in different shapes depending on the
//! endpoint (`records` vs `community_members`, several confirmation fields);
//! those are folded into [`MemberRef`] here and nowhere else.
use crate::utils::config::CircleConfig;
use async_trait::async_trait;
use derive_more::Display;
use log::{debug, info, warn};
use reqwest::{Client, Method, StatusCode};
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::time::Duration;

pub type TagId = u64;

// What the platform tells us about a member's onboarding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExternalStatus {
    Confirmed,
    InvitationAccepted,
    NoSignal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemberRef {
    pub id: String,
    pub email: String,
    pub tag_ids: Vec<TagId>,
    pub status: ExternalStatus,
}

#[derive(Debug, Clone, PartialEq, Display)]
pub enum GatewayError {
    #[display(fmt = "community platform unreachable: {}", _0)]
    Unavailable(String),
    #[display(fmt = "community platform rate limit hit")]
    RateLimited,
    #[display(fmt = "member {} not found on community platform", _0)]
    MemberMissing(String),
    #[display(fmt = "unexpected community platform response: {}", _0)]
    UnexpectedResponse(String),
}

impl std::error::Error for GatewayError {}

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Member and tag operations on the community platform.
///
/// Every method reports failure as a [`GatewayError`]; callers decide whether
/// the failure matters.
#[async_trait]
pub trait TagGateway: Send + Sync {
    async fn find_member_by_email(&self, email: &str) -> GatewayResult<Option<MemberRef>>;

    /// Add tags, keeping whatever the member already has.
    async fn add_tags(&self, member_id: &str, tags: &[TagId]) -> GatewayResult<()>;

    /// Remove one tag, keeping the others. No-op when absent.
    async fn remove_tag(&self, member_id: &str, tag: TagId) -> GatewayResult<()>;

    /// Overwrite the member's whole tag set. Unrelated tags are lost.
    async fn replace_all_tags(&self, member_id: &str, tags: &[TagId]) -> GatewayResult<()>;

    /// Returns the member and whether it existed before this call.
    async fn invite_or_fetch_member(&self, email: &str) -> GatewayResult<(MemberRef, bool)>;

    async fn delete_member(&self, member_id: &str) -> GatewayResult<()>;
}

// Response shape normalization

fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

fn present(member: &Value, field: &str) -> bool {
    match member.get(field) {
        None | Some(Value::Null) | Some(Value::Bool(false)) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}

pub fn classify(member: &Value) -> ExternalStatus {
    if present(member, "confirmed_at") || present(member, "profile_confirmed_at") {
        ExternalStatus::Confirmed
    } else if present(member, "accepted_invitation") {
        ExternalStatus::InvitationAccepted
    } else {
        ExternalStatus::NoSignal
    }
}

/// Build a [`MemberRef`] from a single member object, or from a wrapper that
/// nests it under `community_member`.
pub fn parse_member(body: &Value) -> Option<MemberRef> {
    let member = body.get("community_member").unwrap_or(body);
    let id = member.get("id").and_then(id_string)?;

    let tag_ids = member
        .get("member_tags")
        .and_then(Value::as_array)
        .map(|tags| {
            tags.iter()
                .filter_map(|tag| tag.get("id").and_then(Value::as_u64).or_else(|| tag.as_u64()))
                .collect()
        })
        .or_else(|| {
            member
                .get("member_tag_ids")
                .and_then(Value::as_array)
                .map(|ids| ids.iter().filter_map(Value::as_u64).collect())
        })
        .unwrap_or_default();

    Some(MemberRef {
        id,
        email: member
            .get("email")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_lowercase(),
        tag_ids,
        status: classify(member),
    })
}

/// Pick the member matching `email` out of a search response, whichever list
/// key the endpoint used.
pub fn parse_search(body: &Value, email: &str) -> Option<MemberRef> {
    let list = ["records", "community_members", "data"]
        .iter()
        .find_map(|key| body.get(*key).and_then(Value::as_array))?;

    let members: Vec<MemberRef> = list.iter().filter_map(parse_member).collect();
    let wanted = email.trim().to_lowercase();

    members
        .iter()
        .find(|m| m.email == wanted)
        .cloned()
        // Search is already filtered by email; some shapes omit the field
        .or_else(|| members.into_iter().find(|m| m.email.is_empty()))
}

fn merged(existing: &[TagId], extra: &[TagId]) -> Option<Vec<TagId>> {
    let current: BTreeSet<TagId> = existing.iter().copied().collect();
    let wanted: BTreeSet<TagId> = current.iter().chain(extra.iter()).copied().collect();
    if wanted == current {
        None
    } else {
        Some(wanted.into_iter().collect())
    }
}

fn without(existing: &[TagId], tag: TagId) -> Option<Vec<TagId>> {
    if existing.contains(&tag) {
        Some(existing.iter().copied().filter(|t| *t != tag).collect())
    } else {
        None
    }
}

// Gateway backed by the community platform's admin REST API
pub struct CircleGateway {
    client: Client,
    config: CircleConfig,
}

impl CircleGateway {
    pub fn new(config: CircleConfig, timeout_secs: u64) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| GatewayError::Unavailable(e.to_string()))?;
        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.api_base.trim_end_matches('/'), path)
    }

    async fn send(&self, method: Method, path: &str, query: &[(&str, String)], body: Option<Value>) -> GatewayResult<Option<Value>> {
        let mut request = self
            .client
            .request(method.clone(), self.url(path))
            .bearer_auth(&self.config.api_token)
            .query(query);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| GatewayError::Unavailable(e.to_string()))?;

        let status = response.status();
        debug!("Community platform {} {} -> {}", method, path, status);

        match status {
            StatusCode::NOT_FOUND => Ok(None),
            StatusCode::TOO_MANY_REQUESTS => Err(GatewayError::RateLimited),
            s if s.is_server_error() => Err(GatewayError::Unavailable(format!("status {}", s))),
            s if !s.is_success() => Err(GatewayError::UnexpectedResponse(format!("status {}", s))),
            _ => {
                let text = response
                    .text()
                    .await
                    .map_err(|e| GatewayError::Unavailable(e.to_string()))?;
                if text.trim().is_empty() {
                    return Ok(Some(Value::Null));
                }
                serde_json::from_str(&text)
                    .map(Some)
                    .map_err(|e| GatewayError::UnexpectedResponse(e.to_string()))
            }
        }
    }

    fn community(&self) -> (&'static str, String) {
        ("community_id", self.config.community_id.to_string())
    }

    async fn fetch_member(&self, member_id: &str) -> GatewayResult<MemberRef> {
        let body = self
            .send(Method::GET, &format!("community_members/{}", member_id), &[self.community()], None)
            .await?
            .ok_or_else(|| GatewayError::MemberMissing(member_id.to_string()))?;
        parse_member(&body).ok_or_else(|| GatewayError::UnexpectedResponse("member without id".to_string()))
    }

    // The platform's tag update replaces the whole set
    async fn write_tags(&self, member_id: &str, tags: &[TagId]) -> GatewayResult<()> {
        let body = json!({
            "community_id": self.config.community_id,
            "member_tag_ids": tags,
        });
        self.send(Method::PATCH, &format!("community_members/{}", member_id), &[], Some(body))
            .await?
            .ok_or_else(|| GatewayError::MemberMissing(member_id.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl TagGateway for CircleGateway {
    async fn find_member_by_email(&self, email: &str) -> GatewayResult<Option<MemberRef>> {
        let query = [("email", email.to_string()), self.community()];
        let body = self.send(Method::GET, "community_members", &query, None).await?;
        Ok(body.and_then(|body| parse_search(&body, email)))
    }

    async fn add_tags(&self, member_id: &str, tags: &[TagId]) -> GatewayResult<()> {
        let member = self.fetch_member(member_id).await?;
        match merged(&member.tag_ids, tags) {
            Some(all) => {
                self.write_tags(member_id, &all).await?;
                info!("🏷️ Added tags {:?} to member {}", tags, member_id);
            }
            None => debug!("Tags {:?} already present on member {}", tags, member_id),
        }
        Ok(())
    }

    async fn remove_tag(&self, member_id: &str, tag: TagId) -> GatewayResult<()> {
        let member = self.fetch_member(member_id).await?;
        match without(&member.tag_ids, tag) {
            Some(rest) => {
                self.write_tags(member_id, &rest).await?;
                info!("🏷️ Removed tag {} from member {}", tag, member_id);
            }
            None => debug!("Tag {} not on member {}", tag, member_id),
        }
        Ok(())
    }

    async fn replace_all_tags(&self, member_id: &str, tags: &[TagId]) -> GatewayResult<()> {
        self.write_tags(member_id, tags).await?;
        info!("🏷️ Replaced all tags of member {} with {:?}", member_id, tags);
        Ok(())
    }

    async fn invite_or_fetch_member(&self, email: &str) -> GatewayResult<(MemberRef, bool)> {
        if let Some(existing) = self.find_member_by_email(email).await? {
            return Ok((existing, true));
        }

        let body = json!({
            "community_id": self.config.community_id,
            "email": email,
            "skip_invitation": false,
        });
        let created = self
            .send(Method::POST, "community_members", &[], Some(body))
            .await?
            .and_then(|body| parse_member(&body))
            .ok_or_else(|| GatewayError::UnexpectedResponse("invite returned no member".to_string()))?;

        info!("📧 Invited {} to the community as member {}", email, created.id);
        Ok((created, false))
    }

    async fn delete_member(&self, member_id: &str) -> GatewayResult<()> {
        match self
            .send(Method::DELETE, &format!("community_members/{}", member_id), &[self.community()], None)
            .await?
        {
            Some(_) => info!("🗑️ Deleted community member {}", member_id),
            None => warn!("Community member {} already gone", member_id),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_reads_records_shape() {
        let body = json!({
            "records": [
                { "id": 77, "email": "Other@x.com", "member_tags": [] },
                { "id": 78, "email": "Jane@X.com", "member_tags": [{ "id": 5 }, { "id": 9 }],
                  "profile_confirmed_at": "2024-01-01T00:00:00Z" }
            ]
        });
        let member = parse_search(&body, "jane@x.com").unwrap();
        assert_eq!(member.id, "78");
        assert_eq!(member.tag_ids, vec![5, 9]);
        assert_eq!(member.status, ExternalStatus::Confirmed);
    }

    #[test]
    fn search_reads_community_members_shape() {
        let body = json!({
            "community_members": [
                { "id": "abc", "email": "jane@x.com", "accepted_invitation": "2024-01-01" }
            ]
        });
        let member = parse_search(&body, "jane@x.com").unwrap();
        assert_eq!(member.id, "abc");
        assert_eq!(member.status, ExternalStatus::InvitationAccepted);
    }

    #[test]
    fn search_without_match_is_none() {
        assert!(parse_search(&json!({ "records": [] }), "a@x.com").is_none());
        assert!(parse_search(&json!({ "unexpected": true }), "a@x.com").is_none());
        let body = json!({ "records": [{ "id": 1, "email": "b@x.com" }] });
        assert!(parse_search(&body, "a@x.com").is_none());
    }

    #[test]
    fn create_response_nests_member() {
        let body = json!({ "community_member": { "id": 12, "email": "a@x.com", "confirmed_at": null } });
        let member = parse_member(&body).unwrap();
        assert_eq!(member.id, "12");
        assert_eq!(member.status, ExternalStatus::NoSignal);
    }

    #[test]
    fn merge_keeps_unrelated_tags() {
        assert_eq!(merged(&[1, 2], &[3]), Some(vec![1, 2, 3]));
        assert_eq!(merged(&[1, 3], &[3]), None);
        assert_eq!(without(&[1, 2, 3], 2), Some(vec![1, 3]));
        assert_eq!(without(&[1, 3], 2), None);
    }
}
