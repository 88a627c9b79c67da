//Third-party-dependencies
use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use log::{error, info};
use std::sync::Arc;

use teamseat_service::routes;
use teamseat_service::services::{AppContext, CircleGateway, StripeCustomers};
use teamseat_service::utils::{AppConfig, Ledger};

fn to_io<E: std::fmt::Display>(context: &str) -> impl FnOnce(E) -> std::io::Error + '_ {
    move |e| {
        error!("❌ {}: {}", context, e);
        std::io::Error::new(std::io::ErrorKind::Other, format!("{}: {}", context, e))
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::from_env().map_err(to_io("Invalid configuration"))?;
    let ledger = Ledger::open(&config.storage_dir).map_err(to_io("Failed to open ledger"))?;
    let gateway = CircleGateway::new(config.circle.clone(), config.http_timeout_secs)
        .map_err(to_io("Failed to build community client"))?;
    let customers = StripeCustomers::new(&config.billing, config.http_timeout_secs)
        .map_err(to_io("Failed to build billing client"))?;

    let address = config.bind_address.clone();
    info!(
        "Server started at {} (invite tokens: {}, downgrade: {:?})",
        address, config.token_policy, config.downgrade_policy
    );

    let ctx = web::Data::new(AppContext::new(
        config,
        ledger,
        Arc::new(gateway),
        Arc::new(customers),
    ));

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allowed_methods(vec!["GET", "POST", "OPTIONS"])
            .allowed_header(actix_web::http::header::CONTENT_TYPE);

        App::new()
            .wrap(cors)
            .wrap(Logger::default())
            .app_data(ctx.clone())
            .configure(routes::init_routes)
    })
    .bind(address)?
    .run()
    .await
}
