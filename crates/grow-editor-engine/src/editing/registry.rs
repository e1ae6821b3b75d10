use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::api::{ApiError, EditorApi};
use crate::models::PartialCatalog;
use crate::utility::Deferred;

pub type CatalogResult = Result<Arc<PartialCatalog>, Arc<ApiError>>;

type CatalogDeferred = Deferred<Arc<PartialCatalog>, Arc<ApiError>>;

struct RegistryState {
    deferred: Arc<CatalogDeferred>,
    requested: bool,
}

/// Fetches the partial catalog once and hands the same result to every
/// caller.
///
/// A failed fetch reaches everyone waiting on that attempt; the registry
/// then re-arms so the next call fetches again.
pub struct PartialRegistry {
    api: Arc<dyn EditorApi>,
    state: Mutex<RegistryState>,
}

impl PartialRegistry {
    pub fn new(api: Arc<dyn EditorApi>) -> Self {
        Self {
            api,
            state: Mutex::new(RegistryState {
                deferred: Arc::new(Deferred::new()),
                requested: false,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The catalog, fetching it on first use.
    pub async fn partials(&self) -> CatalogResult {
        let (deferred, fetch) = {
            let mut state = self.lock();
            let fetch = !state.requested;
            state.requested = true;
            (Arc::clone(&state.deferred), fetch)
        };

        if !fetch {
            return deferred.wait().await;
        }

        let guard = FetchGuard {
            registry: self,
            deferred,
        };
        log::debug!("Fetching partial catalog");
        match self.api.get_partials().await {
            Ok(payload) => {
                let catalog = Arc::new(PartialCatalog::from(payload));
                log::info!("Loaded {} partial definitions", catalog.len());
                guard.deferred.resolve(Arc::clone(&catalog));
                Ok(catalog)
            }
            Err(err) => {
                let err = Arc::new(err);
                log::warn!("Failed to load partials: {err}");
                guard.deferred.reject(Arc::clone(&err));
                Err(err)
            }
        }
    }

    fn rearm(&self, settled: &Arc<CatalogDeferred>) {
        let mut state = self.lock();
        if Arc::ptr_eq(&state.deferred, settled) {
            state.deferred = Arc::new(Deferred::new());
            state.requested = false;
        }
    }

    /// The catalog if it has already arrived.
    pub fn peek(&self) -> Option<Arc<PartialCatalog>> {
        self.lock().deferred.peek().and_then(Result::ok)
    }
}

/// Owns the in-flight fetch. Unless the catalog arrived, dropping it settles
/// the attempt for its waiters and re-arms the registry, including when the
/// fetching caller is cancelled mid-request.
struct FetchGuard<'a> {
    registry: &'a PartialRegistry,
    deferred: Arc<CatalogDeferred>,
}

impl Drop for FetchGuard<'_> {
    fn drop(&mut self) {
        let cancelled = ApiError::Other("partial catalog request was cancelled".to_string());
        if self.deferred.reject(Arc::new(cancelled)) {
            log::warn!("Partial catalog request cancelled before it finished");
        }
        if !matches!(self.deferred.peek(), Some(Ok(_))) {
            self.registry.rearm(&self.deferred);
        }
    }
}

impl std::fmt::Debug for PartialRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("PartialRegistry")
            .field("requested", &state.requested)
            .field("settled", &state.deferred.is_settled())
            .finish()
    }
}
