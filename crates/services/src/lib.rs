#![forbid(unsafe_code)]

pub mod app_services;
pub mod catalog;
pub mod config;
pub mod error;
pub mod persistence;
pub mod progress_store;

pub use plans_core::Clock;

pub use app_services::AppServices;
pub use catalog::{CatalogSource, CatalogStatus, HttpCatalogSource, PlanCatalog, StaticCatalogSource};
pub use config::CatalogConfig;
pub use error::{AppServicesError, CatalogError, ConfigError, ProgressError};
pub use persistence::{PROGRESS_SLOT_KEY, ProgressPersistence};
pub use progress_store::{PlanSnapshot, ProgressEvent, ProgressStore};
