// teamseat-service/src/routes/team_routes.rs
use crate::models::{DashboardQuery, RemoveMemberRequest, ServiceError, SyncStatusRequest};
use crate::services::{dashboard_service, invite_service, sync_service, AppContext};
use crate::utils::{email, require_field};
use actix_web::{get, post, web, HttpResponse};
use log::info;
use serde_json::json;

// Remove a member from a team
#[post("/remove-member")]
async fn remove_member(
    ctx: web::Data<AppContext>,
    data: web::Json<RemoveMemberRequest>,
) -> Result<HttpResponse, ServiceError> {
    let team_id = require_field(data.team_id.as_deref(), "Team ID")?;
    let member_email = email::require(data.member_email.as_deref())?;

    info!("🗑️ Removing {} from team {}", member_email, team_id);

    invite_service::revoke(&ctx, &team_id, &member_email).await?;

    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}

// Pull confirmation state for a team's pending members
#[post("/sync-status")]
async fn sync_status(
    ctx: web::Data<AppContext>,
    data: web::Json<SyncStatusRequest>,
) -> Result<HttpResponse, ServiceError> {
    let team_id = require_field(data.team_id.as_deref(), "Team ID")?;

    let updated = sync_service::sync_team(&ctx, &team_id).await?;

    info!("✅ Sync for team {} updated {} members", team_id, updated);
    Ok(HttpResponse::Ok().json(json!({ "updated": updated })))
}

// Leader dashboard
#[get("/dashboard")]
async fn dashboard(
    ctx: web::Data<AppContext>,
    query: web::Query<DashboardQuery>,
) -> Result<HttpResponse, ServiceError> {
    let leader_email = email::require(query.email.as_deref())?;

    let response = dashboard_service::leader_dashboard(&ctx, &leader_email)?;

    Ok(HttpResponse::Ok().json(response))
}

// Register all team routes
pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(remove_member)
        .service(sync_status)
        .service(dashboard);
}
