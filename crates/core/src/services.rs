//! Service wiring shared by the binaries.

use crate::auth::{AuthProvider, MockPortalProvider, RegistrationProvider};
use crate::config::CoreConfig;
use crate::constants::REMOTE_TIMEOUT_SECS;
use crate::share::ShareService;
use crate::test_requests::{
    MemoryTestRequestStore, RemoteTableStore, TestRequestService, TestRequestStore,
};
use crate::PortalResult;
use std::sync::Arc;
use std::time::Duration;

/// Every provider and service a portal front end needs.
#[derive(Clone)]
pub struct PortalServices {
    pub cfg: Arc<CoreConfig>,
    pub auth: Arc<dyn AuthProvider>,
    pub registration: Arc<dyn RegistrationProvider>,
    pub share: ShareService,
    pub test_requests: TestRequestService,
}

impl PortalServices {
    /// Builds the default wiring for `cfg`.
    ///
    /// Auth and registration use the mock provider. Test requests come from the remote
    /// tables when configured, otherwise from the seed file, otherwise from an empty store.
    pub fn from_config(cfg: Arc<CoreConfig>) -> PortalResult<Self> {
        let mock = Arc::new(
            MockPortalProvider::default()
                .with_expiry(cfg.otp_expiry_secs())
                .with_delay(cfg.mock_delay()),
        );

        let store: Arc<dyn TestRequestStore> = match (cfg.remote_table(), cfg.seed_file()) {
            (Some(remote), _) => {
                tracing::info!("test requests: remote tables at {}", remote.base_url);
                Arc::new(RemoteTableStore::new(
                    remote,
                    Duration::from_secs(REMOTE_TIMEOUT_SECS),
                )?)
            }
            (None, Some(seed)) => Arc::new(MemoryTestRequestStore::from_seed_file(seed)?),
            (None, None) => {
                tracing::info!("test requests: empty in-memory store");
                Arc::new(MemoryTestRequestStore::default())
            }
        };

        Ok(Self::with_providers(cfg, mock.clone(), mock, store))
    }

    pub fn with_providers(
        cfg: Arc<CoreConfig>,
        auth: Arc<dyn AuthProvider>,
        registration: Arc<dyn RegistrationProvider>,
        store: Arc<dyn TestRequestStore>,
    ) -> Self {
        Self {
            share: ShareService::new(&cfg),
            test_requests: TestRequestService::new(store),
            cfg,
            auth,
            registration,
        }
    }
}
