// teamseat-service/src/services/sync_service.rs
use crate::models::{InviteStatus, ServiceError};
use crate::services::gateway::ExternalStatus;
use crate::services::invite_service::access_tag;
use crate::services::AppContext;
use log::{debug, info, warn};

// Local invite status implied by what the platform reports
fn target_status(external: ExternalStatus) -> Option<InviteStatus> {
    match external {
        ExternalStatus::Confirmed => Some(InviteStatus::Active),
        ExternalStatus::InvitationAccepted => Some(InviteStatus::Opened),
        ExternalStatus::NoSignal => None,
    }
}

/// Bring the invite status of a team's unconfirmed members in line with the
/// community platform, and grant any access tag admission failed to apply.
/// Returns how many members' invite status moved forward.
///
/// The platform sends no webhook when someone confirms their account, so this
/// is the only way `invited` members ever reach `active`. Per-member lookup
/// failures are skipped; re-running picks them up.
pub async fn sync_team(ctx: &AppContext, team_id: &str) -> Result<usize, ServiceError> {
    let team = match ctx.ledger.find_team(team_id)? {
        Some(team) => team,
        None => return Err(ServiceError::NotFound(format!("Team not found: {}", team_id))),
    };

    let pending = ctx.ledger.pending_members(team_id)?;
    info!("🔄 Syncing {} pending members of team {}", pending.len(), team_id);

    let mut updated = 0;
    for member in pending {
        let found = match ctx.gateway.find_member_by_email(&member.member_email).await {
            Ok(Some(found)) => found,
            Ok(None) => {
                debug!("{} not on the community platform yet", member.member_email);
                continue;
            }
            Err(e) => {
                warn!("⚠️ Skipping {} this round: {}", member.member_email, e);
                continue;
            }
        };

        // Admission could not reach the platform or could not tag; finish what it started
        if member.member_external_ref.is_none() {
            ctx.ledger.set_external_ref(&member.id, &found.id)?;
        }
        if member.tag_pending && team.is_active() {
            let tag = access_tag(ctx, team.access_type);
            match ctx.gateway.add_tags(&found.id, &[tag]).await {
                Ok(()) => {
                    ctx.ledger.mark_tagged(&member.id)?;
                    info!("🏷️ Repaired access tag for {}", member.member_email);
                }
                Err(e) => warn!("⚠️ Could not tag {} during sync: {}", member.member_email, e),
            }
        }

        if let Some(next) = target_status(found.status) {
            if ctx.ledger.advance_invite_status(&member.id, next)? {
                info!("✅ {} is now {}", member.member_email, next);
                updated += 1;
            }
        }
    }

    Ok(updated)
}
