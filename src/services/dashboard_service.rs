// teamseat-service/src/services/dashboard_service.rs
use crate::models::{DashboardResponse, MemberOverview, ServiceError, TeamOverview};
use crate::services::AppContext;
use crate::utils::tokens;
use log::info;

// Read-only view of a leader's active teams
pub fn leader_dashboard(ctx: &AppContext, leader_email: &str) -> Result<DashboardResponse, ServiceError> {
    let teams = ctx.ledger.active_teams_for_leader(leader_email)?;

    if teams.is_empty() {
        return Err(ServiceError::NotFound("No active teams found for this email".to_string()));
    }

    let mut overviews = Vec::with_capacity(teams.len());
    for team in teams {
        let members = ctx.ledger.active_members(&team.id)?;
        let invite_link = ctx
            .ledger
            .redeemable_token_for_team(&team.id)?
            .map(|invite| tokens::join_link(&ctx.config.site_url, &invite.token));
        let seats_used = members.len() as u32;

        overviews.push(TeamOverview {
            id: team.id,
            access_type: team.access_type,
            seat_limit: team.seat_limit,
            seats_used,
            seats_remaining: team.seat_limit.saturating_sub(seats_used),
            status: team.status,
            course_space_id: team.course_space_id,
            converted_from_individual: team.converted_from_individual,
            invite_link,
            members: members
                .into_iter()
                .map(|m| MemberOverview {
                    email: m.member_email,
                    invite_status: m.invite_status,
                    joined_at: m.joined_at,
                })
                .collect(),
        });
    }

    info!("📋 Dashboard for {}: {} teams", leader_email, overviews.len());
    Ok(DashboardResponse { teams: overviews })
}
