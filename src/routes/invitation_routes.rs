// teamseat-service/src/routes/invitation_routes.rs
use crate::models::{AdmitRequest, AdmitResponse, InviteStatus, InviteViewRequest, ServiceError};
use crate::services::{invite_service, AppContext};
use crate::utils::{email, require_field};
use actix_web::{post, web, HttpResponse};
use log::info;
use serde_json::json;

// Join a team through an invite link
#[post("/invite")]
async fn admit_member(
    ctx: web::Data<AppContext>,
    data: web::Json<AdmitRequest>,
) -> Result<HttpResponse, ServiceError> {
    let token = require_field(data.token.as_deref(), "Token")?;
    let member_email = email::require(data.member_email.as_deref())?;

    info!(
        "📧 Admission request for {} (added by leader: {})",
        member_email, data.added_by_leader
    );

    let member = invite_service::admit(&ctx, &token, &member_email, data.added_by_leader).await?;

    let message = match member.invite_status {
        InviteStatus::Invited => "Invitation sent. They will get an email to join the community.",
        _ => "You have been added to the team!",
    };

    Ok(HttpResponse::Ok().json(AdmitResponse {
        success: true,
        message: message.to_string(),
        invite_status: member.invite_status,
    }))
}

// The join page was opened for a token
#[post("/invite-view")]
async fn invite_view(
    ctx: web::Data<AppContext>,
    data: web::Json<InviteViewRequest>,
) -> Result<HttpResponse, ServiceError> {
    let token = require_field(data.token.as_deref(), "Token")?;

    let updated = invite_service::record_view(&ctx, &token)?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "updated": updated
    })))
}

// Register all invitation routes
pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(admit_member).service(invite_view);
}
