// teamseat-service/src/routes/webhook_routes.rs
use crate::models::ServiceError;
use crate::services::{subscription_service, AppContext};
use actix_web::{post, web, HttpRequest, HttpResponse};
use serde_json::json;

const SIGNATURE_HEADER: &str = "Stripe-Signature";

// Billing provider webhook; the raw body is needed to check the signature
#[post("/webhook")]
async fn billing_webhook(
    ctx: web::Data<AppContext>,
    req: HttpRequest,
    body: web::Bytes,
) -> Result<HttpResponse, ServiceError> {
    let signature = req
        .headers()
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    subscription_service::handle_webhook(&ctx, &body, signature).await?;

    Ok(HttpResponse::Ok().json(json!({ "received": true })))
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(billing_webhook);
}
