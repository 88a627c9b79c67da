// src/routes/mod.rs
use actix_web::web;

pub mod invitation_routes;
pub mod team_routes;
pub mod webhook_routes;

// Register every route module
pub fn init_routes(cfg: &mut web::ServiceConfig) {
    webhook_routes::init_routes(cfg);
    invitation_routes::init_routes(cfg);
    team_routes::init_routes(cfg);
}
