//! Score session controller: owns the current ScoreRecord and drives
//! the two remote calls.
//!
//! RULES:
//!   - At most one remote call in flight. A request arriving while busy
//!     is rejected with `Busy`, never fired alongside.
//!   - The busy flag is set before the call and cleared on every exit
//!     path (BusyGuard drop).
//!   - A record is replaced whole or not at all.
//!   - Fetch failures are "no score yet"; compute failures keep the
//!     previous record and set a user-facing message.
//!   - reset() bumps the generation; a call started before the reset
//!     does not write into the fresh state.

use crate::{
    api::{ScoreRequest, ScoringService},
    chain::AddressMap,
    error::{ClientError, ClientResult},
    score::ScoreRecord,
    types::AccountIdentifier,
};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, Default)]
struct ScoreState {
    record: Option<ScoreRecord>,
    error:  Option<String>,
}

/// Holds a busy flag for its lifetime; clears it when dropped.
pub(crate) struct BusyGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> BusyGuard<'a> {
    /// `None` if the flag is already set.
    pub(crate) fn try_acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

pub struct ScoreController {
    service:    Arc<dyn ScoringService>,
    busy:       AtomicBool,
    generation: AtomicU64,
    state:      Mutex<ScoreState>,
}

impl ScoreController {
    pub fn new(service: Arc<dyn ScoringService>) -> Self {
        Self {
            service,
            busy:       AtomicBool::new(false),
            generation: AtomicU64::new(0),
            state:      Mutex::new(ScoreState::default()),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Current record, if any.
    pub fn score(&self) -> Option<ScoreRecord> {
        self.lock().record.clone()
    }

    /// Message from the last failed compute, cleared on the next call.
    pub fn last_error(&self) -> Option<String> {
        self.lock().error.clone()
    }

    /// Bumped by every reset.
    pub(crate) fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Drop record and error. In-flight results are discarded on arrival.
    pub fn reset(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        *self.lock() = ScoreState::default();
    }

    /// Fetch the last stored score. `Ok(None)` covers both "not found" and
    /// a failed fetch; only `Busy` is reported as an error.
    pub async fn load_existing(
        &self,
        account: &AccountIdentifier,
    ) -> ClientResult<Option<ScoreRecord>> {
        let _guard = self.begin("load_existing")?;
        let generation = self.generation.load(Ordering::Acquire);
        self.lock().error = None;

        match self.service.fetch(account.as_str()).await {
            Ok(Some(record)) => {
                log::info!(
                    "loaded existing score {} for {}",
                    record.total_score,
                    account.short()
                );
                self.commit(generation, |s| s.record = Some(record.clone()));
                Ok(Some(record))
            }
            Ok(None) => {
                log::info!("no stored score yet for {}", account.short());
                Ok(None)
            }
            Err(e) => {
                log::warn!("loading score for {} failed, treating as none: {e}", account.short());
                Ok(None)
            }
        }
    }

    /// Ask the service for a fresh score. No retry; the user re-triggers.
    pub async fn compute_new(&self, addresses: &AddressMap) -> ClientResult<ScoreRecord> {
        let _guard = self.begin("compute_new")?;
        let request = ScoreRequest::from_addresses(addresses).ok_or_else(|| {
            ClientError::Validation { message: "A Stellar address is required".into() }
        })?;
        let generation = self.generation.load(Ordering::Acquire);
        self.lock().error = None;

        match self.service.calculate(&request).await {
            Ok(record) => {
                log::info!(
                    "computed score {} ({}) for {}",
                    record.total_score,
                    record.level(),
                    request.stellar_address
                );
                self.commit(generation, |s| s.record = Some(record.clone()));
                Ok(record)
            }
            Err(source) => {
                log::error!("score calculation failed: {source}");
                let err = ClientError::RemoteCall { operation: "calculate", source };
                let message = err.user_message();
                self.commit(generation, |s| s.error = Some(message));
                Err(err)
            }
        }
    }

    fn begin(&self, operation: &'static str) -> ClientResult<BusyGuard<'_>> {
        BusyGuard::try_acquire(&self.busy).ok_or_else(|| {
            log::debug!("'{operation}' rejected: remote call in flight");
            ClientError::Busy { operation }
        })
    }

    fn commit(&self, generation: u64, apply: impl FnOnce(&mut ScoreState)) {
        let mut state = self.lock();
        if self.generation.load(Ordering::Acquire) != generation {
            log::debug!("session was reset during the call, result dropped");
            return;
        }
        apply(&mut state);
    }

    fn lock(&self) -> MutexGuard<'_, ScoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
