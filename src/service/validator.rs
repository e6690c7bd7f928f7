//! Pre-write admission checks.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::config::AdmissionLimits;
use crate::domain::{
    Event, SongRequest, SongRequestInput, Transaction, TransactionStatus, pricing,
};
use crate::error::AdmissionError;
use crate::persistence::AdmissionStore;

/// Largest tolerated difference between the transaction amount and the
/// computed price, in cents.
const PAYMENT_TOLERANCE_CENTS: i64 = 1;

/// Outcome of validation.
#[derive(Debug)]
pub enum Validation {
    /// All checks passed; proceed to the provisional write. Carries the
    /// event and, when a transaction id was supplied, the verified
    /// transaction.
    Admit {
        /// The active event the request targets.
        event: Event,
        /// Verified payment transaction, if one was attached.
        transaction: Option<Transaction>,
    },
    /// A fresh identical submission was found: return the existing
    /// request unmodified instead of writing anything.
    Echo {
        /// The previously admitted request.
        request: SongRequest,
        /// Its transaction, if it referenced one.
        transaction: Option<Transaction>,
    },
}

/// Ordered, short-circuiting validation pipeline.
///
/// Checks run cheapest first to keep store round-trips low on the common
/// rejection paths: event lookup, rate limit, duplicate lookup, capacity
/// count, payment verification. The first failing check wins.
///
/// The duplicate and capacity checks are read-then-decide with no
/// isolation against concurrent writers; two simultaneous identical
/// submissions can both pass before either writes. The echo path masks
/// the common double-tap. A conditional write keyed by
/// `(event, user, song, artist)` at insert time would close the window.
#[derive(Debug, Clone)]
pub struct AdmissionValidator {
    store: Arc<dyn AdmissionStore>,
    limits: AdmissionLimits,
}

impl AdmissionValidator {
    /// Creates a validator over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn AdmissionStore>, limits: AdmissionLimits) -> Self {
        Self { store, limits }
    }

    /// Runs the full pipeline for one submission.
    ///
    /// # Errors
    ///
    /// Returns the [`AdmissionError`] of the first failing check, or the
    /// catch-all kind if the store fails unexpectedly.
    pub async fn validate(
        &self,
        input: &SongRequestInput,
        now: DateTime<Utc>,
    ) -> Result<Validation, AdmissionError> {
        let event = self
            .store
            .get_event(&input.event_id)
            .await?
            .ok_or_else(|| AdmissionError::EventNotFound {
                event_id: input.event_id.clone(),
            })?;
        if !event.is_active() {
            return Err(AdmissionError::EventNotActive {
                event_id: input.event_id.clone(),
            });
        }

        self.check_rate_limit(&input.user_id, now).await?;

        if let Some(validation) = self.check_duplicate(input, now).await? {
            return Ok(validation);
        }

        self.check_capacity(&event).await?;

        let transaction = match &input.transaction_id {
            Some(transaction_id) => Some(self.verify_payment(&event, input, transaction_id).await?),
            None => None,
        };

        Ok(Validation::Admit { event, transaction })
    }

    /// Sliding-window rate limit over the user's recent submissions,
    /// inclusive of right-now.
    async fn check_rate_limit(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<(), AdmissionError> {
        let since = now - self.limits.rate_limit_window();
        let count = self.store.count_user_requests_since(user_id, since).await?;
        if count >= u64::from(self.limits.rate_limit_max) {
            tracing::debug!(user_id, count, "rate limit hit");
            return Err(AdmissionError::RateLimitExceeded {
                max: self.limits.rate_limit_max,
            });
        }
        Ok(())
    }

    /// Duplicate detection against the user's most recent non-cancelled
    /// request for the same song in this event. A match inside the echo
    /// window is returned idempotently; an older match is a hard failure.
    async fn check_duplicate(
        &self,
        input: &SongRequestInput,
        now: DateTime<Utc>,
    ) -> Result<Option<Validation>, AdmissionError> {
        let existing = self
            .store
            .find_latest_duplicate(
                &input.event_id,
                &input.user_id,
                &input.song_title,
                &input.artist_name,
            )
            .await?;
        let Some(existing) = existing else {
            return Ok(None);
        };

        if now - existing.submitted_at <= self.limits.duplicate_window() {
            let transaction = match &existing.transaction_id {
                Some(id) => self.store.get_transaction(id).await?,
                None => None,
            };
            tracing::info!(
                request_id = %existing.request_id,
                user_id = %input.user_id,
                "echoing recent duplicate submission"
            );
            return Ok(Some(Validation::Echo {
                request: existing,
                transaction,
            }));
        }

        Err(AdmissionError::DuplicateSongRequest)
    }

    /// Live-request count against the event's configured cap.
    async fn check_capacity(&self, event: &Event) -> Result<(), AdmissionError> {
        let live = self.store.count_live_requests(&event.event_id).await?;
        if live >= u64::from(event.settings.max_requests()) {
            tracing::debug!(event_id = %event.event_id, live, "event at capacity");
            return Err(AdmissionError::EventCapacityExceeded);
        }
        Ok(())
    }

    /// Verifies an already-created charge: it must exist, be completed,
    /// match the recomputed price within one cent, and be unused.
    async fn verify_payment(
        &self,
        event: &Event,
        input: &SongRequestInput,
        transaction_id: &str,
    ) -> Result<Transaction, AdmissionError> {
        let transaction = self
            .store
            .get_transaction(transaction_id)
            .await?
            .ok_or(AdmissionError::PaymentNotFound)?;

        if transaction.status != TransactionStatus::Completed {
            return Err(AdmissionError::PaymentNotCompleted);
        }

        let price = pricing::quote(&event.settings, input);
        if (cents(transaction.amount) - cents(price)).abs() > PAYMENT_TOLERANCE_CENTS {
            tracing::debug!(
                transaction_id,
                amount = transaction.amount,
                price,
                "payment amount mismatch"
            );
            return Err(AdmissionError::PaymentAmountMismatch);
        }

        if self
            .store
            .find_request_by_transaction(transaction_id)
            .await?
            .is_some()
        {
            return Err(AdmissionError::PaymentAlreadyUsed);
        }

        Ok(transaction)
    }
}

/// Rounds a currency amount to integer cents.
#[allow(clippy::cast_possible_truncation)]
fn cents(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}
