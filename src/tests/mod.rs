// Shared fakes and fixtures for the service tests
use crate::models::{AccessType, InviteToken, Team, TeamStatus, TokenPolicy};
use crate::services::customers::CustomerDirectory;
use crate::services::gateway::{ExternalStatus, GatewayError, GatewayResult, MemberRef, TagGateway, TagId};
use crate::services::AppContext;
use crate::utils::config::{BillingConfig, CircleConfig, DowngradePolicy, TagConfig};
use crate::utils::{AppConfig, Ledger};
use actix_web::web;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};


pub const LEADER_TAG: TagId = 10;
pub const FREE_TAG: TagId = 20;
pub const SUBSCRIPTION_TAG: TagId = 30;
pub const COURSE_TAG: TagId = 40;
pub const TEAM_PRODUCT: &str = "prod_team";
pub const WEBHOOK_SECRET: &str = "whsec_test";

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Find(String),
    AddTags(String, Vec<TagId>),
    RemoveTag(String, TagId),
    ReplaceAll(String, Vec<TagId>),
    InviteOrFetch(String),
    Delete(String),
}

#[derive(Default)]
struct GatewayState {
    members: HashMap<String, MemberRef>,
    calls: Vec<Call>,
    next_id: u64,
    unreachable: bool,
    failing: HashSet<String>,
    on_invite: Option<Box<dyn FnOnce() + Send>>,
}

// In-memory community platform that records every call
#[derive(Default)]
pub struct FakeGateway {
    state: Mutex<GatewayState>,
}

impl FakeGateway {
    pub fn add_member(&self, email: &str, status: ExternalStatus, tags: &[TagId]) -> String {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = format!("ext-{}", state.next_id);
        state.members.insert(
            email.to_string(),
            MemberRef {
                id: id.clone(),
                email: email.to_string(),
                tag_ids: tags.to_vec(),
                status,
            },
        );
        id
    }

    pub fn set_status(&self, email: &str, status: ExternalStatus) {
        let mut state = self.state.lock().unwrap();
        state.members.get_mut(email).unwrap().status = status;
    }

    pub fn set_unreachable(&self, unreachable: bool) {
        self.state.lock().unwrap().unreachable = unreachable;
    }

    // Fail every call keyed by this e-mail or member id
    pub fn fail_for(&self, key: &str) {
        self.state.lock().unwrap().failing.insert(key.to_string());
    }

    pub fn stop_failing(&self, key: &str) {
        self.state.lock().unwrap().failing.remove(key);
    }

    // Runs once, inside the next invite_or_fetch_member call
    pub fn on_next_invite(&self, hook: impl FnOnce() + Send + 'static) {
        self.state.lock().unwrap().on_invite = Some(Box::new(hook));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    pub fn member(&self, email: &str) -> Option<MemberRef> {
        self.state.lock().unwrap().members.get(email).cloned()
    }

    pub fn tags_of(&self, email: &str) -> Vec<TagId> {
        let mut tags = self.member(email).map(|m| m.tag_ids).unwrap_or_default();
        tags.sort();
        tags
    }

    fn record(&self, call: Call, key: &str) -> GatewayResult<std::sync::MutexGuard<'_, GatewayState>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        if state.unreachable || state.failing.contains(key) {
            return Err(GatewayError::Unavailable("fake outage".to_string()));
        }
        Ok(state)
    }

    fn by_id<'a>(state: &'a mut GatewayState, member_id: &str) -> GatewayResult<&'a mut MemberRef> {
        state
            .members
            .values_mut()
            .find(|m| m.id == member_id)
            .ok_or_else(|| GatewayError::MemberMissing(member_id.to_string()))
    }
}

#[async_trait]
impl TagGateway for FakeGateway {
    async fn find_member_by_email(&self, email: &str) -> GatewayResult<Option<MemberRef>> {
        let state = self.record(Call::Find(email.to_string()), email)?;
        Ok(state.members.get(email).cloned())
    }

    async fn add_tags(&self, member_id: &str, tags: &[TagId]) -> GatewayResult<()> {
        let mut state = self.record(Call::AddTags(member_id.to_string(), tags.to_vec()), member_id)?;
        let member = Self::by_id(&mut state, member_id)?;
        for tag in tags {
            if !member.tag_ids.contains(tag) {
                member.tag_ids.push(*tag);
            }
        }
        Ok(())
    }

    async fn remove_tag(&self, member_id: &str, tag: TagId) -> GatewayResult<()> {
        let mut state = self.record(Call::RemoveTag(member_id.to_string(), tag), member_id)?;
        let member = Self::by_id(&mut state, member_id)?;
        member.tag_ids.retain(|t| *t != tag);
        Ok(())
    }

    async fn replace_all_tags(&self, member_id: &str, tags: &[TagId]) -> GatewayResult<()> {
        let mut state = self.record(Call::ReplaceAll(member_id.to_string(), tags.to_vec()), member_id)?;
        let member = Self::by_id(&mut state, member_id)?;
        member.tag_ids = tags.to_vec();
        Ok(())
    }

    async fn invite_or_fetch_member(&self, email: &str) -> GatewayResult<(MemberRef, bool)> {
        let mut state = self.record(Call::InviteOrFetch(email.to_string()), email)?;
        if let Some(hook) = state.on_invite.take() {
            hook();
        }
        if let Some(existing) = state.members.get(email) {
            return Ok((existing.clone(), true));
        }
        state.next_id += 1;
        let created = MemberRef {
            id: format!("ext-{}", state.next_id),
            email: email.to_string(),
            tag_ids: Vec::new(),
            status: ExternalStatus::NoSignal,
        };
        state.members.insert(email.to_string(), created.clone());
        Ok((created, false))
    }

    async fn delete_member(&self, member_id: &str) -> GatewayResult<()> {
        let mut state = self.record(Call::Delete(member_id.to_string()), member_id)?;
        state.members.retain(|_, m| m.id != member_id);
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeDirectory {
    emails: Mutex<HashMap<String, String>>,
    unreachable: Mutex<bool>,
}

impl FakeDirectory {
    pub fn add(&self, customer: &str, email: &str) {
        self.emails.lock().unwrap().insert(customer.to_string(), email.to_string());
    }

    pub fn set_unreachable(&self, unreachable: bool) {
        *self.unreachable.lock().unwrap() = unreachable;
    }
}

#[async_trait]
impl CustomerDirectory for FakeDirectory {
    async fn customer_email(&self, customer_ref: &str) -> Result<Option<String>, String> {
        if *self.unreachable.lock().unwrap() {
            return Err("fake billing outage".to_string());
        }
        Ok(self.emails.lock().unwrap().get(customer_ref).cloned())
    }
}

pub fn test_config() -> AppConfig {
    AppConfig {
        bind_address: "127.0.0.1:0".to_string(),
        storage_dir: PathBuf::from("./storage-test"),
        site_url: "https://site.test".to_string(),
        http_timeout_secs: 5,
        default_seat_limit: 5,
        token_policy: TokenPolicy::Shareable,
        downgrade_policy: DowngradePolicy::ReplaceWithFreeTier,
        tags: TagConfig {
            leader: LEADER_TAG,
            free_access: FREE_TAG,
            subscription_member: SUBSCRIPTION_TAG,
            course_member: COURSE_TAG,
        },
        circle: CircleConfig {
            api_base: "http://circle.invalid".to_string(),
            api_token: "token".to_string(),
            community_id: 1,
        },
        billing: BillingConfig {
            webhook_secret: WEBHOOK_SECRET.to_string(),
            webhook_tolerance_secs: 300,
            secret_key: "sk_test".to_string(),
            api_base: "http://billing.invalid".to_string(),
            team_product_id: TEAM_PRODUCT.to_string(),
        },
    }
}

pub struct Harness {
    pub ctx: web::Data<AppContext>,
    pub gateway: Arc<FakeGateway>,
    pub customers: Arc<FakeDirectory>,
}

pub fn harness_with(config: AppConfig) -> Harness {
    harness_with_ledger(config, Ledger::in_memory())
}

pub fn harness_with_ledger(config: AppConfig, ledger: Ledger) -> Harness {
    let gateway = Arc::new(FakeGateway::default());
    let customers = Arc::new(FakeDirectory::default());
    let ctx = web::Data::new(AppContext::new(
        config,
        ledger,
        gateway.clone(),
        customers.clone(),
    ));
    Harness {
        ctx,
        gateway,
        customers,
    }
}

pub fn harness() -> Harness {
    harness_with(test_config())
}

// Active team with one invite token, straight into the ledger
pub fn seed_team(h: &Harness, leader: &str, seat_limit: u32, access_type: AccessType) -> (Team, String) {
    let team = Team {
        id: uuid::Uuid::new_v4().to_string(),
        leader_email: leader.to_string(),
        billing_customer_ref: "cus_seed".to_string(),
        billing_subscription_ref: format!("sub_{}", uuid::Uuid::new_v4()),
        access_type,
        seat_limit,
        status: TeamStatus::Active,
        course_space_id: None,
        converted_from_individual: false,
        converted_at: None,
        created_at: Utc::now(),
    };
    let token = crate::utils::tokens::generate_token();
    h.ctx
        .ledger
        .create_team(
            team.clone(),
            InviteToken::new(token.clone(), team.id.clone(), h.ctx.config.token_policy),
        )
        .unwrap();
    (team, token)
}
