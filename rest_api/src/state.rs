// rest_api/src/state.rs

use std::sync::Arc;

use lib::booking::BookingEngine;
use lib::catalog::Catalog;
use lib::config::LabConfig;
use lib::notifications::Notifier;
use lib::storage_engine::LabStorageEngine;
use security::IdentityService;

// Shared state for the Axum application
#[derive(Clone)]
pub struct AppState {
    pub identities: IdentityService,
    pub bookings: BookingEngine,
}

impl AppState {
    pub fn new(
        storage: Arc<dyn LabStorageEngine>,
        notifier: Arc<dyn Notifier>,
        config: &LabConfig,
    ) -> Self {
        Self {
            identities: IdentityService::new(
                storage.clone(),
                notifier.clone(),
                &config.auth,
                config.notifications.frontend_url.clone(),
            ),
            bookings: BookingEngine::new(storage, notifier, config.notifications.public_base_url.clone()),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        self.bookings.catalog()
    }
}
