//! Server state shared by all handlers

use std::sync::Arc;

use crate::config::{Config, TrackingConfig};
use crate::query::VisitsQuery;
use crate::script;
use crate::storage::VisitStore;

use super::api::ApiError;

/// Shared state for the HTTP server
///
/// Storage handles are `None` in dev mode or when storage is disabled; the
/// read endpoints answer 404 and the collector only logs.
#[derive(Clone)]
pub struct AppState {
    /// Write side (insert / delete)
    pub store: Option<VisitStore>,
    /// Read side, sharing the store's pool
    pub query: Option<VisitsQuery>,
    /// Collection rules (endpoint, ignored paths)
    pub tracking: Arc<TrackingConfig>,
    /// Name the database is exposed under
    pub binding: Arc<str>,
    /// Pre-rendered client script served at /visits.js
    pub script: Arc<str>,
}

impl AppState {
    /// Build state from config and an optional open store
    pub fn new(config: &Config, store: Option<VisitStore>) -> Self {
        let query = store.as_ref().map(VisitsQuery::from_store);
        let script = script::generate_client_script(
            &config.tracking.ignore_paths,
            &config.tracking.endpoint,
            config.tracking.disable_in_dev(),
        );

        Self {
            store,
            query,
            tracking: Arc::new(config.tracking.clone()),
            binding: Arc::from(config.storage.binding.as_str()),
            script: Arc::from(script),
        }
    }

    /// Write handle, or 404 when storage is off
    pub(crate) fn store(&self) -> Result<&VisitStore, ApiError> {
        self.store
            .as_ref()
            .ok_or_else(|| ApiError::NotFound("Visit storage not available".to_string()))
    }

    /// Query handle, or 404 when storage is off
    pub(crate) fn query(&self) -> Result<&VisitsQuery, ApiError> {
        self.query
            .as_ref()
            .ok_or_else(|| ApiError::NotFound("Visit query interface not available".to_string()))
    }
}
