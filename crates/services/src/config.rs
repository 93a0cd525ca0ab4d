use std::env;

use url::Url;

use crate::error::ConfigError;

/// Environment variable naming the catalog endpoint.
pub const CATALOG_URL_ENV: &str = "PLANS_CATALOG_URL";

/// Where to fetch the reading plan catalog from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CatalogConfig {
    pub plans_url: Url,
}

impl CatalogConfig {
    /// Parse and validate a catalog endpoint.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidCatalogUrl` if the value is not an absolute
    /// `http`/`https` URL.
    pub fn new(raw: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidCatalogUrl {
            raw: raw.to_owned(),
            reason,
        };
        let plans_url = Url::parse(raw.trim()).map_err(|e| invalid(e.to_string()))?;
        if !matches!(plans_url.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme {}", plans_url.scheme())));
        }
        Ok(Self { plans_url })
    }

    /// Read the endpoint from `PLANS_CATALOG_URL`. Unset or blank yields `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the variable is set but invalid.
    pub fn from_env() -> Result<Option<Self>, ConfigError> {
        match env::var(CATALOG_URL_ENV) {
            Ok(raw) if !raw.trim().is_empty() => Self::new(&raw).map(Some),
            _ => Ok(None),
        }
    }
}
