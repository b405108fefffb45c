use std::sync::Arc;

use tracing::{info, warn};

use geosession_core::{AppError, AppResult, SessionStoreError};
use geosession_domain::{Identity, Place, SessionRecord, SessionTimestamp};

use crate::location_resolver::LocationResolver;
use crate::session_clock::SessionClock;
use crate::session_history_store::SessionHistoryStore;
use crate::session_ports::IdentityDecryptor;


/// Outcome of a recorded session reported back to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    /// Partition the record was stored under.
    pub identity: Identity,
    /// Stored place name, possibly the fallback sentinel.
    pub place: Place,
    /// Sort key of the stored record.
    pub occurred_at: SessionTimestamp,
}

/// Records authentication events: resolve location, stamp, append.
#[derive(Clone)]
pub struct SessionRecorder {
    resolver: LocationResolver,
    store: SessionHistoryStore,
    clock: Arc<dyn SessionClock>,
    identity_decryptor: Option<Arc<dyn IdentityDecryptor>>,
}

impl SessionRecorder {
    /// Creates a recorder from its collaborators.
    #[must_use]
    pub fn new(
        resolver: LocationResolver,
        store: SessionHistoryStore,
        clock: Arc<dyn SessionClock>,
    ) -> Self {
        Self {
            resolver,
            store,
            clock,
            identity_decryptor: None,
        }
    }

    /// Enables opening of encrypted identities.
    #[must_use]
    pub fn with_identity_decryptor(mut self, decryptor: Arc<dyn IdentityDecryptor>) -> Self {
        self.identity_decryptor = Some(decryptor);
        self
    }

    /// Returns the plaintext of an identity submitted in transport form.
    ///
    /// Without a configured decryptor the value is returned as submitted.
    pub fn open_identity(&self, submitted: &str) -> AppResult<String> {
        let Some(decryptor) = self.identity_decryptor.as_ref() else {
            return Ok(submitted.to_owned());
        };

        decryptor.decrypt(submitted).map_err(|error| {
            warn!(error = %error, "failed to open submitted identity");
            match error {
                AppError::Validation(_) => error,
                other => AppError::Validation(format!("identity could not be opened: {other}")),
            }
        })
    }

    /// Records one session for an identity seen at a network address.
    ///
    /// Location resolution never fails; store failures are returned unchanged.
    pub async fn record(
        &self,
        identity: &Identity,
        address: &str,
    ) -> Result<SessionSummary, SessionStoreError> {
        let place = self.resolver.resolve(address).await;
        let occurred_at = self.clock.now();
        let record = SessionRecord::new(identity.clone(), occurred_at, address, place.clone());

        self.store.append(identity, record).await?;

        info!(
            identity = %identity,
            occurred_at = %occurred_at,
            place = %place,
            "session recorded"
        );

        Ok(SessionSummary {
            identity: identity.clone(),
            place,
            occurred_at,
        })
    }
}
