use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use plans_core::model::{PlanId, ReadingPlan, ReadingPlanDraft};
use reqwest::Client;

use crate::config::CatalogConfig;
use crate::error::CatalogError;

//
// ─── SOURCES ───────────────────────────────────────────────────────────────────
//

/// Supplies the ordered list of reading plans.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Fetch the full catalog.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if the catalog cannot be fetched or decoded.
    async fn fetch_plans(&self) -> Result<Vec<ReadingPlan>, CatalogError>;
}

/// Fetches the catalog from an HTTP endpoint returning a JSON array of plans.
#[derive(Clone)]
pub struct HttpCatalogSource {
    client: Client,
    config: CatalogConfig,
}

impl HttpCatalogSource {
    #[must_use]
    pub fn new(config: CatalogConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }
}

#[async_trait]
impl CatalogSource for HttpCatalogSource {
    async fn fetch_plans(&self) -> Result<Vec<ReadingPlan>, CatalogError> {
        let response = self
            .client
            .get(self.config.plans_url.clone())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(CatalogError::HttpStatus(response.status()));
        }

        let drafts: Vec<ReadingPlanDraft> = response.json().await?;
        Ok(validate_plans(drafts))
    }
}

/// Serves a fixed set of plans, e.g. bundled with the binary or read from disk.
#[derive(Clone, Debug, Default)]
pub struct StaticCatalogSource {
    plans: Vec<ReadingPlan>,
}

impl StaticCatalogSource {
    #[must_use]
    pub fn new(plans: Vec<ReadingPlan>) -> Self {
        Self { plans }
    }

    /// Build a source from a JSON array of plans.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Decode` if the JSON is not an array of plans.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let drafts: Vec<ReadingPlanDraft> = serde_json::from_str(json)?;
        Ok(Self::new(validate_plans(drafts)))
    }

    /// Build a source from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Io` if the file cannot be read, or
    /// `CatalogError::Decode` if its contents are malformed.
    pub fn from_file(path: &Path) -> Result<Self, CatalogError> {
        let json = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }
}

#[async_trait]
impl CatalogSource for StaticCatalogSource {
    async fn fetch_plans(&self) -> Result<Vec<ReadingPlan>, CatalogError> {
        Ok(self.plans.clone())
    }
}

/// Validates catalog entries, skipping invalid plans and repeated ids.
fn validate_plans(drafts: Vec<ReadingPlanDraft>) -> Vec<ReadingPlan> {
    let mut seen = HashSet::new();
    let mut plans = Vec::with_capacity(drafts.len());
    for draft in drafts {
        match draft.validate() {
            Ok(plan) if seen.insert(plan.id().clone()) => plans.push(plan),
            Ok(plan) => tracing::warn!(plan_id = %plan.id(), "skipping duplicate catalog plan"),
            Err(err) => tracing::warn!(error = %err, "skipping invalid catalog plan"),
        }
    }
    plans
}

//
// ─── SHARED CATALOG ────────────────────────────────────────────────────────────
//

/// Load state of the catalog as seen by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogStatus {
    Pending,
    Loaded { plans: usize },
    Unavailable,
}

#[derive(Debug, Default)]
enum CatalogState {
    #[default]
    Pending,
    Loaded(Vec<ReadingPlan>),
    Unavailable(String),
}

/// Shared, cloneable handle to the loaded plan catalog.
///
/// Lookups never block on the fetch: until a load finishes (or after one
/// fails) they behave as if the catalog were empty.
#[derive(Clone, Default)]
pub struct PlanCatalog {
    state: Arc<RwLock<CatalogState>>,
}

impl PlanCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A catalog that is already loaded with `plans`.
    #[must_use]
    pub fn loaded(plans: Vec<ReadingPlan>) -> Self {
        Self {
            state: Arc::new(RwLock::new(CatalogState::Loaded(plans))),
        }
    }

    /// Fetch from `source` once and replace the catalog. No retry.
    ///
    /// On failure the error is logged and the catalog becomes unavailable,
    /// unless an earlier load succeeded, in which case those plans are kept.
    /// Returns whether the fetch succeeded.
    pub async fn load_from(&self, source: &dyn CatalogSource) -> bool {
        match source.fetch_plans().await {
            Ok(plans) => {
                tracing::info!(plans = plans.len(), "reading plan catalog loaded");
                self.replace(plans);
                true
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to load reading plans");
                let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
                if !matches!(*state, CatalogState::Loaded(_)) {
                    *state = CatalogState::Unavailable(err.to_string());
                }
                false
            }
        }
    }

    /// Replace the whole catalog.
    pub fn replace(&self, plans: Vec<ReadingPlan>) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        *state = CatalogState::Loaded(plans);
    }

    #[must_use]
    pub fn status(&self) -> CatalogStatus {
        match &*self.state.read().unwrap_or_else(PoisonError::into_inner) {
            CatalogState::Pending => CatalogStatus::Pending,
            CatalogState::Loaded(plans) => CatalogStatus::Loaded { plans: plans.len() },
            CatalogState::Unavailable(_) => CatalogStatus::Unavailable,
        }
    }

    /// Reason for the last failed load, while unavailable.
    #[must_use]
    pub fn failure(&self) -> Option<String> {
        match &*self.state.read().unwrap_or_else(PoisonError::into_inner) {
            CatalogState::Unavailable(reason) => Some(reason.clone()),
            _ => None,
        }
    }

    /// All loaded plans in catalog order; empty until loaded.
    #[must_use]
    pub fn plans(&self) -> Vec<ReadingPlan> {
        match &*self.state.read().unwrap_or_else(PoisonError::into_inner) {
            CatalogState::Loaded(plans) => plans.clone(),
            _ => Vec::new(),
        }
    }

    #[must_use]
    pub fn plan(&self, plan_id: &PlanId) -> Option<ReadingPlan> {
        self.with_plan(plan_id, |plan| plan.cloned())
    }

    /// Run `f` against the plan without cloning it.
    pub fn with_plan<R>(&self, plan_id: &PlanId, f: impl FnOnce(Option<&ReadingPlan>) -> R) -> R {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        let plan = match &*state {
            CatalogState::Loaded(plans) => plans.iter().find(|plan| plan.id() == plan_id),
            _ => None,
        };
        f(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"[
        { "id": "genesis-creation", "title": "Genesis", "days": [
            { "title": "Light", "passages": ["Genesis 1:1-5"] },
            { "title": "Firmament", "passages": ["Genesis 1:6-8"] }
        ] },
        { "id": "", "days": [] },
        { "id": "broken", "days": [ { "day": 2 } ] },
        { "id": "genesis-creation", "days": [] },
        { "id": "sermon-mount", "days": [ { "day": 1, "passages": ["Matthew 5:1-12"] } ] }
    ]"#;

    struct FailingSource;

    #[async_trait]
    impl CatalogSource for FailingSource {
        async fn fetch_plans(&self) -> Result<Vec<ReadingPlan>, CatalogError> {
            Err(CatalogError::Decode(
                serde_json::from_str::<Vec<ReadingPlanDraft>>("{").unwrap_err(),
            ))
        }
    }

    fn plan_id(id: &str) -> PlanId {
        PlanId::new(id).unwrap()
    }

    #[test]
    fn static_source_skips_invalid_and_duplicate_plans() {
        let source = StaticCatalogSource::from_json(CATALOG).unwrap();
        let ids: Vec<_> = source.plans.iter().map(|p| p.id().to_string()).collect();
        assert_eq!(ids, ["genesis-creation", "sermon-mount"]);
        assert_eq!(source.plans[0].day_count(), 2);
    }

    #[test]
    fn static_source_rejects_non_array() {
        assert!(matches!(
            StaticCatalogSource::from_json(r#"{"id":"x"}"#),
            Err(CatalogError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn pending_catalog_resolves_nothing() {
        let catalog = PlanCatalog::new();
        assert_eq!(catalog.status(), CatalogStatus::Pending);
        assert!(catalog.plan(&plan_id("genesis-creation")).is_none());
        assert!(catalog.plans().is_empty());

        let source = StaticCatalogSource::from_json(CATALOG).unwrap();
        assert!(catalog.load_from(&source).await);
        assert_eq!(catalog.status(), CatalogStatus::Loaded { plans: 2 });
        assert!(catalog.plan(&plan_id("sermon-mount")).is_some());
    }

    #[tokio::test]
    async fn failed_load_marks_catalog_unavailable() {
        let catalog = PlanCatalog::new();
        assert!(!catalog.load_from(&FailingSource).await);
        assert_eq!(catalog.status(), CatalogStatus::Unavailable);
        assert!(catalog.failure().unwrap().contains("malformed"));
        assert!(catalog.plan(&plan_id("genesis-creation")).is_none());
    }

    #[tokio::test]
    async fn failed_refresh_keeps_loaded_plans() {
        let source = StaticCatalogSource::from_json(CATALOG).unwrap();
        let catalog = PlanCatalog::new();
        catalog.load_from(&source).await;

        assert!(!catalog.load_from(&FailingSource).await);
        assert_eq!(catalog.status(), CatalogStatus::Loaded { plans: 2 });
    }

    #[test]
    fn clones_share_state() {
        let catalog = PlanCatalog::new();
        let view = catalog.clone();
        catalog.replace(StaticCatalogSource::from_json(CATALOG).unwrap().plans);
        assert_eq!(view.status(), CatalogStatus::Loaded { plans: 2 });
    }
}
