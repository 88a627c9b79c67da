// teamseat-service/src/services/subscription_service.rs
//! Billing webhook reconciliation.
//!
//! Deliveries are at-least-once and may arrive out of order, so every handler
//! checks the ledger first and turns repeats into no-ops. The ledger always
//! advances; community platform calls are best effort and left to the status
//! sync when they fail.
use crate::models::{
    AccessType, BillingEvent, InviteToken, ServiceError, Subscription, Team, TeamStatus,
    SUBSCRIPTION_CREATED, SUBSCRIPTION_DELETED, SUBSCRIPTION_UPDATED,
};
use crate::services::invite_service;
use crate::services::AppContext;
use crate::utils::ledger::TeamCreation;
use crate::utils::{email, signature, tokens};
use chrono::Utc;
use log::{debug, error, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum EventOutcome {
    Ignored,
    TeamCreated(String),
    AlreadyProvisioned(String),
    TeamRevoked { team_id: String, members: usize },
    NoTeam,
}

/// Verify a raw webhook delivery and apply it.
pub async fn handle_webhook(
    ctx: &AppContext,
    payload: &[u8],
    signature_header: Option<&str>,
) -> Result<EventOutcome, ServiceError> {
    signature::verify(
        payload,
        signature_header,
        &ctx.config.billing.webhook_secret,
        ctx.config.billing.webhook_tolerance_secs,
        Utc::now().timestamp(),
    )?;

    let event: BillingEvent = serde_json::from_slice(payload).map_err(|e| {
        error!("❌ Signed webhook payload is not an event: {:?}", e);
        ServiceError::BadRequest("Malformed event payload".to_string())
    })?;

    handle_event(ctx, &event).await
}

pub async fn handle_event(ctx: &AppContext, event: &BillingEvent) -> Result<EventOutcome, ServiceError> {
    info!("📨 Billing event {} ({})", event.id, event.kind);

    let outcome = match event.kind.as_str() {
        SUBSCRIPTION_CREATED => subscription_created(ctx, &subscription_of(event)?).await?,
        SUBSCRIPTION_DELETED => subscription_deleted(ctx, &subscription_of(event)?).await?,
        SUBSCRIPTION_UPDATED => {
            let previous_product = event.data.previous_product();
            subscription_updated(ctx, &subscription_of(event)?, previous_product.as_deref()).await?
        }
        other => {
            debug!("Ignoring billing event type {}", other);
            EventOutcome::Ignored
        }
    };

    info!("✅ Billing event {} handled: {:?}", event.id, outcome);
    Ok(outcome)
}

fn subscription_of(event: &BillingEvent) -> Result<Subscription, ServiceError> {
    serde_json::from_value(event.data.object.clone()).map_err(|e| {
        error!("❌ Event {} does not carry a subscription: {:?}", event.id, e);
        ServiceError::BadRequest("Event object is not a subscription".to_string())
    })
}

fn is_team_product(ctx: &AppContext, subscription: &Subscription) -> bool {
    subscription.product_id() == Some(ctx.config.billing.team_product_id.as_str())
}

pub async fn subscription_created(ctx: &AppContext, subscription: &Subscription) -> Result<EventOutcome, ServiceError> {
    if !is_team_product(ctx, subscription) {
        debug!("Subscription {} is not a team product", subscription.id);
        return Ok(EventOutcome::Ignored);
    }
    provision_team(ctx, subscription, false).await
}

/// A live team subscription with no team yet. It counts as a conversion only
/// when the update moved the subscription off another product; otherwise it
/// is a team subscription whose `created` event has not been handled yet.
pub async fn subscription_updated(
    ctx: &AppContext,
    subscription: &Subscription,
    previous_product: Option<&str>,
) -> Result<EventOutcome, ServiceError> {
    if !is_team_product(ctx, subscription) || !subscription.is_live() {
        return Ok(EventOutcome::Ignored);
    }
    let converted = previous_product.map_or(false, |product| product != ctx.config.billing.team_product_id);
    provision_team(ctx, subscription, converted).await
}

async fn provision_team(
    ctx: &AppContext,
    subscription: &Subscription,
    converted: bool,
) -> Result<EventOutcome, ServiceError> {
    // Subscription refs are never reused, so a revoked team also means "handled"
    if let Some(existing) = ctx.ledger.latest_team_by_subscription(&subscription.id)? {
        debug!(
            "Subscription {} already has team {} ({})",
            subscription.id, existing.id, existing.status
        );
        return Ok(EventOutcome::AlreadyProvisioned(existing.id));
    }

    let leader_email = match ctx
        .customers
        .customer_email(&subscription.customer)
        .await
        .map_err(|e| {
            error!("❌ Billing customer lookup failed for {}: {}", subscription.customer, e);
            ServiceError::UpstreamUnavailable("Billing customer lookup failed".to_string())
        })? {
        Some(address) => email::normalize(&address),
        None => {
            error!(
                "❌ Billing customer {} has no email, cannot create team for {}",
                subscription.customer, subscription.id
            );
            return Ok(EventOutcome::Ignored);
        }
    };

    let access_type = match subscription.metadata.get("access_type").map(String::as_str) {
        Some("course") => AccessType::Course,
        _ => AccessType::Subscription,
    };

    let now = Utc::now();
    let team = Team {
        id: uuid::Uuid::new_v4().to_string(),
        leader_email: leader_email.clone(),
        billing_customer_ref: subscription.customer.clone(),
        billing_subscription_ref: subscription.id.clone(),
        access_type,
        seat_limit: ctx.config.default_seat_limit,
        status: TeamStatus::Active,
        course_space_id: subscription.metadata.get("course_space_id").cloned(),
        converted_from_individual: converted,
        converted_at: if converted { Some(now) } else { None },
        created_at: now,
    };
    let token = InviteToken::new(tokens::generate_token(), team.id.clone(), ctx.config.token_policy);

    let team = match ctx.ledger.create_team(team, token)? {
        TeamCreation::Created(team) => team,
        TeamCreation::AlreadyExists(existing) => return Ok(EventOutcome::AlreadyProvisioned(existing.id)),
    };

    info!(
        "📝 Team {} created for {} ({} seats{})",
        team.id,
        leader_email,
        team.seat_limit,
        if converted { ", converted from individual" } else { "" }
    );

    tag_leader(ctx, &leader_email).await;
    Ok(EventOutcome::TeamCreated(team.id))
}

async fn tag_leader(ctx: &AppContext, leader_email: &str) {
    match ctx.gateway.find_member_by_email(leader_email).await {
        Ok(Some(leader)) => {
            if let Err(e) = ctx.gateway.add_tags(&leader.id, &[ctx.config.tags.leader]).await {
                warn!("⚠️ Could not tag team leader {}: {}", leader_email, e);
            }
        }
        Ok(None) => info!("Team leader {} is not a community member yet", leader_email),
        Err(e) => warn!("⚠️ Could not look up team leader {}: {}", leader_email, e),
    }
}

pub async fn subscription_deleted(ctx: &AppContext, subscription: &Subscription) -> Result<EventOutcome, ServiceError> {
    let team = match ctx.ledger.find_active_team_by_subscription(&subscription.id)? {
        Some(team) => team,
        None => {
            debug!("No active team for subscription {}", subscription.id);
            return Ok(EventOutcome::NoTeam);
        }
    };

    let members = ctx.ledger.active_members(&team.id)?;
    let mut unconfirmed = 0;
    for member in &members {
        if !invite_service::degrade_access(ctx, &team, member).await {
            unconfirmed += 1;
        }
    }
    if unconfirmed > 0 {
        warn!(
            "⚠️ {} of {} members of team {} were not downgraded on the community platform",
            unconfirmed,
            members.len(),
            team.id
        );
    }

    let revoked = ctx.ledger.revoke_team(&team.id)?;
    info!("🗑️ Team {} revoked, {} members downgraded", team.id, revoked);

    Ok(EventOutcome::TeamRevoked {
        team_id: team.id,
        members: revoked,
    })
}
