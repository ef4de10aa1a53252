use std::sync::Arc;

use crate::application::ports::document_store::DocumentStore;
use crate::application::ports::object_storage::ObjectStorage;
use crate::bootstrap::config::Config;

#[derive(Clone)]
pub struct AppContext {
    pub cfg: Config,
    services: Arc<AppServices>,
}

#[derive(Clone)]
pub struct AppServices {
    document_store: Arc<dyn DocumentStore>,
    object_storage: Arc<dyn ObjectStorage>,
}

impl AppServices {
    pub fn new(
        document_store: Arc<dyn DocumentStore>,
        object_storage: Arc<dyn ObjectStorage>,
    ) -> Self {
        Self {
            document_store,
            object_storage,
        }
    }
}

impl AppContext {
    pub fn new(cfg: Config, services: AppServices) -> Self {
        Self {
            cfg,
            services: Arc::new(services),
        }
    }

    pub fn document_store(&self) -> Arc<dyn DocumentStore> {
        self.services.document_store.clone()
    }

    pub fn object_storage(&self) -> Arc<dyn ObjectStorage> {
        self.services.object_storage.clone()
    }
}
