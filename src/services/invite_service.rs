// teamseat-service/src/services/invite_service.rs
//! Invite lifecycle: viewing an invite link, joining a team, leaving it.
//!
//! Admission writes the ledger before granting the access tag, so a crash in
//! between leaves an untagged member that the status sync can repair.
//! Revocation degrades external access before releasing the seat, so a crash
//! in between leaves a paying seat rather than free paid access.
use crate::models::{AccessType, InviteStatus, ServiceError, Team, TeamMember};
use crate::services::gateway::TagId;
use crate::services::AppContext;
use crate::utils::config::DowngradePolicy;
use crate::utils::email;
use crate::utils::ledger::{Admission, Rejection};
use log::{debug, error, info, warn};

pub fn access_tag(ctx: &AppContext, access_type: AccessType) -> TagId {
    match access_type {
        AccessType::Subscription => ctx.config.tags.subscription_member,
        AccessType::Course => ctx.config.tags.course_member,
    }
}

/// Someone opened the join page. The token does not say who, so every member
/// of the team still at `invited` moves to `viewed`.
pub fn record_view(ctx: &AppContext, token: &str) -> Result<usize, ServiceError> {
    let invite = match ctx.ledger.find_token(token)? {
        Some(invite) => invite,
        None => {
            warn!("❌ Invite view for unknown token");
            return Err(ServiceError::NotFound("Invalid token".to_string()));
        }
    };

    let updated = ctx.ledger.mark_invited_as_viewed(&invite.team_id)?;
    debug!("Invite viewed for team {}, {} members marked viewed", invite.team_id, updated);
    Ok(updated)
}

/// Admit `member_email` into the team behind `token`.
///
/// All rejections happen before the community platform is contacted.
pub async fn admit(
    ctx: &AppContext,
    token: &str,
    member_email: &str,
    added_by_leader: bool,
) -> Result<TeamMember, ServiceError> {
    let member_email = email::normalize(member_email);

    let team = ctx.ledger.check_admission(token, &member_email).map_err(|e| {
        info!("❌ Admission of {} refused: {}", member_email, e);
        e
    })?;

    let external = match ctx.gateway.invite_or_fetch_member(&member_email).await {
        Ok(found) => Some(found),
        Err(e) => {
            warn!("⚠️ Could not reach community platform for {}: {}", member_email, e);
            None
        }
    };

    let invite_status = match &external {
        Some((_, true)) => InviteStatus::Active,
        _ if added_by_leader => InviteStatus::Invited,
        _ => InviteStatus::Active,
    };

    let member = TeamMember::new(
        &team.id,
        &member_email,
        external.as_ref().map(|(m, _)| m.id.clone()),
        invite_status,
    );

    let mut member = match ctx.ledger.admit_member(token, member)? {
        Admission::Admitted(member) => member,
        Admission::Refused(rejection) => {
            // Another admission got in first. A duplicate may be relying on the
            // same external member, so only unwind when the seat itself was lost.
            if let Some((created, false)) = &external {
                if rejection != Rejection::DuplicateMember {
                    unwind_external_member(ctx, &created.id).await;
                }
            }
            info!("❌ Admission of {} refused: {}", member_email, rejection);
            return Err(rejection.into());
        }
    };

    match &external {
        Some((external_member, _)) => {
            let tag = access_tag(ctx, team.access_type);
            match ctx.gateway.add_tags(&external_member.id, &[tag]).await {
                // Tagging is idempotent; a lost marker only means sync tags again
                Ok(()) => match ctx.ledger.mark_tagged(&member.id) {
                    Ok(()) => member.tag_pending = false,
                    Err(e) => warn!("⚠️ Tagged {} but could not record it: {}", member_email, e),
                },
                Err(e) => warn!("⚠️ Admitted {} but could not tag them, sync will retry: {}", member_email, e),
            }
        }
        None => warn!("⚠️ Admitted {} without a community member, sync will retry", member_email),
    }

    info!("✅ {} joined team {} as {}", member_email, team.id, member.invite_status);
    Ok(member)
}

async fn unwind_external_member(ctx: &AppContext, member_id: &str) {
    match ctx.gateway.delete_member(member_id).await {
        Ok(()) => info!("↩️ Removed community member {} created for a refused admission", member_id),
        Err(e) => error!("❌ Could not remove community member {}: {}", member_id, e),
    }
}

/// Take a member's seat away. External access is degraded first; if that
/// fails the seat is still released.
pub async fn revoke(ctx: &AppContext, team_id: &str, member_email: &str) -> Result<TeamMember, ServiceError> {
    let member_email = email::normalize(member_email);

    let member = match ctx.ledger.find_active_member(team_id, &member_email)? {
        Some(member) => member,
        None => {
            warn!("❌ No active member {} on team {}", member_email, team_id);
            return Err(ServiceError::NotFound("Member not found".to_string()));
        }
    };

    let team = match ctx.ledger.find_team(team_id)? {
        Some(team) => team,
        None => return Err(ServiceError::NotFound(format!("Team not found: {}", team_id))),
    };

    degrade_access(ctx, &team, &member).await;

    let revoked = ctx.ledger.revoke_member(&member.id)?;
    info!("✅ Removed {} from team {}", member_email, team_id);
    Ok(revoked)
}

/// Apply the configured downgrade to one member. Returns whether the
/// community platform confirmed it.
pub async fn degrade_access(ctx: &AppContext, team: &Team, member: &TeamMember) -> bool {
    let member_id = match &member.member_external_ref {
        Some(id) => id.clone(),
        None => match ctx.gateway.find_member_by_email(&member.member_email).await {
            Ok(Some(found)) => found.id,
            Ok(None) => {
                info!("Community member not found for {}, nothing to downgrade", member.member_email);
                return true;
            }
            Err(e) => {
                warn!("⚠️ Lookup of {} failed during downgrade: {}", member.member_email, e);
                return false;
            }
        },
    };

    let result = match ctx.config.downgrade_policy {
        DowngradePolicy::ReplaceWithFreeTier => {
            ctx.gateway
                .replace_all_tags(&member_id, &[ctx.config.tags.free_access])
                .await
        }
        DowngradePolicy::RemoveTeamTag => {
            ctx.gateway
                .remove_tag(&member_id, access_tag(ctx, team.access_type))
                .await
        }
    };

    match result {
        Ok(()) => {
            info!("⬇️ Downgraded {} ({})", member.member_email, member_id);
            true
        }
        Err(e) => {
            warn!("⚠️ Could not downgrade {} ({}): {}", member.member_email, member_id, e);
            false
        }
    }
}
