use std::sync::Arc;

use crate::admin::AdminService;
use crate::db::Database;
use crate::instance::InstanceService;
use crate::order::{Provisioner, PurchaseService};
use crate::provider::ProviderRegistry;
use crate::user_auth::{TokenManager, UserAuthService};

/// Shared gateway state
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    /// JWT issue/verify
    pub tokens: Arc<TokenManager>,
    pub user_auth: Arc<UserAuthService>,
    /// Adapters for active providers, keyed by provider code
    pub providers: Arc<ProviderRegistry>,
    pub purchases: Arc<PurchaseService>,
    pub instances: Arc<InstanceService>,
    pub admin: Arc<AdminService>,
}

impl AppState {
    pub fn new(db: Database, tokens: Arc<TokenManager>, providers: Arc<ProviderRegistry>) -> Self {
        let pool = db.pool().clone();
        let provisioner = Provisioner::new(pool.clone(), providers.clone());
        Self {
            user_auth: Arc::new(UserAuthService::new(pool.clone(), tokens.clone())),
            purchases: Arc::new(PurchaseService::new(pool.clone(), provisioner)),
            instances: Arc::new(InstanceService::new(pool.clone(), providers.clone())),
            admin: Arc::new(AdminService::new(pool)),
            db,
            tokens,
            providers,
        }
    }

    /// Same wiring, but purchases stay `paid` until provisioned by hand
    pub fn without_auto_provision(mut self) -> Self {
        let pool = self.db.pool().clone();
        let provisioner = Provisioner::new(pool.clone(), self.providers.clone());
        self.purchases = Arc::new(PurchaseService::new(pool, provisioner).without_auto_provision());
        self
    }
}
