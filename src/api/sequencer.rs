//! Per-user request sequencing
//!
//! A newer request from a user cancels the one still in flight and then
//! waits its turn, so the service never runs two calls for the same user at
//! once.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use tokio_util::sync::CancellationToken;

struct Slot {
    generation: u64,
    cancel: CancellationToken,
    turn: Arc<tokio::sync::Mutex<()>>,
}

#[derive(Default)]
pub struct RequestSequencer {
    slots: Mutex<HashMap<String, Slot>>,
    next_generation: Mutex<u64>,
}

impl RequestSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `work` as the user's latest request.
    ///
    /// Returns `None` if a newer request for the same user arrived before
    /// `work` finished; `work` is dropped at that point.
    pub async fn run<F, T>(&self, user_id: &str, work: F) -> Option<T>
    where
        F: Future<Output = T>,
    {
        let (generation, cancel, turn) = self.claim(user_id);

        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => None,
            out = async {
                let _turn = turn.lock().await;
                work.await
            } => Some(out),
        };

        self.release(user_id, generation);
        result
    }

    /// Number of users with a request in flight
    #[allow(dead_code)] // Used in tests
    pub fn in_flight(&self) -> usize {
        self.lock_slots().len()
    }

    fn claim(&self, user_id: &str) -> (u64, CancellationToken, Arc<tokio::sync::Mutex<()>>) {
        let generation = {
            let mut next = self
                .next_generation
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            *next += 1;
            *next
        };
        let cancel = CancellationToken::new();

        let mut slots = self.lock_slots();
        let turn = match slots.get(user_id) {
            Some(previous) => {
                tracing::debug!(user_id, "Cancelling superseded request");
                previous.cancel.cancel();
                previous.turn.clone()
            }
            None => Arc::new(tokio::sync::Mutex::new(())),
        };
        slots.insert(
            user_id.to_string(),
            Slot {
                generation,
                cancel: cancel.clone(),
                turn: turn.clone(),
            },
        );

        (generation, cancel, turn)
    }

    fn release(&self, user_id: &str, generation: u64) {
        let mut slots = self.lock_slots();
        if slots.get(user_id).is_some_and(|s| s.generation == generation) {
            slots.remove(user_id);
        }
    }

    fn lock_slots(&self) -> std::sync::MutexGuard<'_, HashMap<String, Slot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
