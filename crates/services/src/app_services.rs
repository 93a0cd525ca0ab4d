use std::sync::Arc;

use storage::repository::Storage;

use crate::Clock;
use crate::catalog::{CatalogSource, PlanCatalog};
use crate::error::AppServicesError;
use crate::persistence::ProgressPersistence;
use crate::progress_store::ProgressStore;

/// Assembles the catalog and progress store for the app.
pub struct AppServices {
    catalog: PlanCatalog,
    catalog_source: Arc<dyn CatalogSource>,
    progress: ProgressStore,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// The catalog starts out pending; call [`AppServices::refresh_catalog`]
    /// (or spawn it) to load it.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        catalog_source: Arc<dyn CatalogSource>,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::with_storage(&storage, clock, catalog_source).await)
    }

    /// Build services on top of an existing `Storage`.
    pub async fn with_storage(
        storage: &Storage,
        clock: Clock,
        catalog_source: Arc<dyn CatalogSource>,
    ) -> Self {
        let catalog = PlanCatalog::new();
        let persistence = ProgressPersistence::new(Arc::clone(&storage.progress_slots));
        let progress = ProgressStore::open(clock, catalog.clone(), persistence).await;
        Self {
            catalog,
            catalog_source,
            progress,
        }
    }

    /// Fetch the catalog once from the configured source. Returns whether it loaded.
    pub async fn refresh_catalog(&self) -> bool {
        self.catalog.load_from(self.catalog_source.as_ref()).await
    }

    #[must_use]
    pub fn catalog(&self) -> PlanCatalog {
        self.catalog.clone()
    }

    #[must_use]
    pub fn catalog_source(&self) -> Arc<dyn CatalogSource> {
        Arc::clone(&self.catalog_source)
    }

    #[must_use]
    pub fn progress(&self) -> &ProgressStore {
        &self.progress
    }

    pub fn progress_mut(&mut self) -> &mut ProgressStore {
        &mut self.progress
    }
}
