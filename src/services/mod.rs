// teamseat-service/src/services/mod.rs
use crate::utils::{AppConfig, Ledger};
use std::sync::Arc;

pub mod customers;
pub mod dashboard_service;
pub mod gateway;
pub mod invite_service;
pub mod subscription_service;
pub mod sync_service;

pub use customers::{CustomerDirectory, StripeCustomers};
pub use gateway::{CircleGateway, TagGateway};

// Everything a request handler needs, shared through web::Data
pub struct AppContext {
    pub config: AppConfig,
    pub ledger: Ledger,
    pub gateway: Arc<dyn TagGateway>,
    pub customers: Arc<dyn CustomerDirectory>,
}

impl AppContext {
    pub fn new(
        config: AppConfig,
        ledger: Ledger,
        gateway: Arc<dyn TagGateway>,
        customers: Arc<dyn CustomerDirectory>,
    ) -> Self {
        Self {
            config,
            ledger,
            gateway,
            customers,
        }
    }
}
