use std::sync::Arc;

use chrono::Utc;
use sqlx::types::chrono::DateTime;
use uuid::Uuid;
use validator::Validate;

use crate::actor::{ActorDirectory, UserRole};
use crate::error::{ApiError, ApiResult};
use crate::folder::FolderStatus;
use crate::lifecycle::{require_live, LifecycleGuard, Tombstoned};
use crate::models::ensure_cents;
use crate::quote::model::{
    CreateQuoteRequest, Quote, QuoteFilter, QuoteStatus, ScoreQuoteRequest,
    ValidateQuoteRequest, DEFAULT_CURRENCY,
};
use crate::services::scoring::{aggregate_score, SubScores};
use crate::store::{MoveStore, Precondition, Record, UnitOfWork};

/// ISO 4217 shape: three uppercase letters
fn normalize_currency(currency: Option<String>) -> ApiResult<String> {
    let currency = currency
        .map(|c| c.trim().to_uppercase())
        .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());
    if currency.len() != 3 || !currency.bytes().all(|b| b.is_ascii_uppercase()) {
        return Err(ApiError::BadRequest(format!(
            "currency must be a 3-letter ISO code, got '{}'",
            currency
        )));
    }
    Ok(currency)
}

/// Service for the quote lifecycle
#[derive(Clone)]
pub struct QuoteService {
    store: Arc<dyn MoveStore>,
    actors: ActorDirectory,
    guard: LifecycleGuard,
}

impl QuoteService {
    pub fn new(store: Arc<dyn MoveStore>) -> Self {
        Self {
            actors: ActorDirectory::new(store.clone()),
            guard: LifecycleGuard::new(store.clone()),
            store,
        }
    }

    /// Record a mover's quote against a folder, starting at `Requested`
    pub async fn create(&self, request: CreateQuoteRequest) -> ApiResult<Quote> {
        request.validate()?;
        if request.total_amount.is_sign_negative() {
            return Err(ApiError::BadRequest(format!(
                "total_amount must not be negative, got {}",
                request.total_amount
            )));
        }
        ensure_cents("total_amount", request.total_amount)?;
        let currency = normalize_currency(request.currency)?;

        let folder = require_live(
            self.store.get_folder(request.folder_id).await?,
            "folder",
            request.folder_id,
        )?;
        if folder.status.is_terminal() {
            return Err(ApiError::BadRequest(format!(
                "folder {} is {} and accepts no quotes",
                folder.id,
                folder.status.as_str()
            )));
        }

        let mover = require_live(
            self.store.get_mover(request.mover_id).await?,
            "mover",
            request.mover_id,
        )?;
        if mover.blacklisted {
            tracing::warn!(mover_id = %mover.id, folder_id = %folder.id, "Quote from blacklisted mover refused");
            return Err(ApiError::BadRequest(format!(
                "mover {} is blacklisted: {}",
                mover.id,
                mover.blacklist_reason.as_deref().unwrap_or("no reason recorded")
            )));
        }

        let duplicate = QuoteFilter {
            folder_id: Some(folder.id),
            mover_id: Some(mover.id),
            statuses: Some(QuoteStatus::ACTIVE.to_vec()),
        };
        if !self.store.list_quotes(&duplicate).await?.is_empty() {
            return Err(ApiError::Conflict(format!(
                "mover {} already has an active quote on folder {}",
                mover.id, folder.id
            )));
        }

        let now = Utc::now();
        let quote = Quote {
            id: Uuid::new_v4(),
            folder_id: folder.id,
            mover_id: mover.id,
            source: request.source,
            total_amount: request.total_amount,
            currency,
            valid_until: request.valid_until,
            status: QuoteStatus::Requested,
            reminder_count: 0,
            last_reminded_at: None,
            score_price: None,
            score_reputation: None,
            score_financial: None,
            score_litigation: None,
            score: None,
            scored_at: None,
            validated_by: None,
            validated_at: None,
            rejection_reason: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };

        self.store
            .commit(
                UnitOfWork::new()
                    .require(Precondition::FolderStatus {
                        folder_id: folder.id,
                        allowed: FolderStatus::NON_TERMINAL.to_vec(),
                    })
                    .require(Precondition::MoverEligible { mover_id: mover.id })
                    .save(Record::Quote(quote.clone())),
            )
            .await?;

        tracing::info!(
            quote_id = %quote.id,
            folder_id = %quote.folder_id,
            mover_id = %quote.mover_id,
            total = %quote.total_amount,
            "Quote created"
        );
        Ok(quote)
    }

    pub async fn get(&self, quote_id: Uuid) -> ApiResult<Quote> {
        require_live(self.store.get_quote(quote_id).await?, "quote", quote_id)
    }

    /// Live quotes of a folder, best score first
    pub async fn list_for_folder(&self, folder_id: Uuid) -> ApiResult<Vec<Quote>> {
        Ok(self.store.list_quotes(&QuoteFilter::for_folder(folder_id)).await?)
    }

    pub async fn list_for_mover(&self, mover_id: Uuid) -> ApiResult<Vec<Quote>> {
        Ok(self.store.list_quotes(&QuoteFilter::for_mover(mover_id)).await?)
    }

    /// Count a reminder sent to the mover
    pub async fn remind(&self, quote_id: Uuid) -> ApiResult<Quote> {
        let mut quote = self.get(quote_id).await?;
        if !quote.status.is_remindable() {
            return Err(ApiError::NotFound(format!(
                "quote {} is not in remindable state ({})",
                quote_id,
                quote.status.as_str()
            )));
        }

        let read_at = quote.updated_at;
        let now = Utc::now();
        quote.status = QuoteStatus::Reminded;
        quote.reminder_count += 1;
        quote.last_reminded_at = Some(now);
        quote.updated_at = now;

        self.save(&quote, read_at, vec![]).await?;
        tracing::info!(quote_id = %quote_id, reminders = quote.reminder_count, "Quote reminded");
        Ok(quote)
    }

    /// Approve or reject a quote; reserved to admins and operators
    pub async fn validate(
        &self,
        quote_id: Uuid,
        actor_id: &str,
        request: ValidateQuoteRequest,
    ) -> ApiResult<Quote> {
        let mut quote = self.get(quote_id).await?;
        let actor = self
            .actors
            .require(actor_id, "review quotes", UserRole::can_review_quotes)
            .await?;

        if matches!(quote.status, QuoteStatus::Rejected | QuoteStatus::Expired) {
            return Err(ApiError::BadRequest(format!(
                "quote {} is {} and can no longer be reviewed",
                quote_id,
                quote.status.as_str()
            )));
        }

        let mut extra = vec![];
        let read_at = quote.updated_at;
        let now = Utc::now();
        if request.approved {
            quote.status = QuoteStatus::Validated;
            quote.rejection_reason = None;
        } else {
            let folder = self.store.get_folder(quote.folder_id).await?;
            if folder.is_some_and(|f| f.selected_quote_id == Some(quote_id)) {
                return Err(ApiError::BadRequest(format!(
                    "cannot reject quote {}: it is the selected quote of folder {}",
                    quote_id, quote.folder_id
                )));
            }
            extra.push(Precondition::QuoteNotSelected { quote_id });
            quote.status = QuoteStatus::Rejected;
            quote.rejection_reason = request
                .reason
                .map(|r| r.trim().to_string())
                .filter(|r| !r.is_empty());
        }
        quote.validated_by = Some(actor.id.clone());
        quote.validated_at = Some(now);
        quote.updated_at = now;

        self.save(&quote, read_at, extra).await?;
        tracing::info!(
            quote_id = %quote_id,
            actor = %actor.id,
            status = quote.status.as_str(),
            "Quote reviewed"
        );
        Ok(quote)
    }

    /// Store sub-scores and their weighted aggregate
    pub async fn score(&self, quote_id: Uuid, request: ScoreQuoteRequest) -> ApiResult<Quote> {
        let mut quote = self.get(quote_id).await?;
        let scores = SubScores::from(request);
        scores.validate()?;

        let read_at = quote.updated_at;
        let now = Utc::now();
        quote.score_price = Some(scores.price);
        quote.score_reputation = Some(scores.reputation);
        quote.score_financial = Some(scores.financial);
        quote.score_litigation = scores.litigation;
        // The aggregate is always derived from what is stored
        quote.score = quote.sub_scores().map(|stored| aggregate_score(&stored));
        quote.scored_at = Some(now);
        quote.updated_at = now;

        self.save(&quote, read_at, vec![]).await?;
        tracing::info!(quote_id = %quote_id, score = ?quote.score, "Quote scored");
        Ok(quote)
    }

    /// Tombstone a quote that is neither selected nor booked
    pub async fn delete(&self, quote_id: Uuid) -> ApiResult<Quote> {
        let mut quote = self.get(quote_id).await?;
        let folder = self.store.get_folder(quote.folder_id).await?;
        let preconditions = self.guard.quote_deletion(&quote, folder.as_ref()).await?;

        let read_at = quote.updated_at;
        quote.mark_deleted(Utc::now());

        self.save(&quote, read_at, preconditions).await?;
        tracing::info!(quote_id = %quote_id, "Quote deleted");
        Ok(quote)
    }

    /// Expire unanswered quotes past their validity; returns the expired ids
    ///
    /// Quotes touched concurrently are skipped and picked up on the next run.
    pub async fn expire_overdue(&self, now: DateTime<Utc>) -> ApiResult<Vec<Uuid>> {
        let pending = self
            .store
            .list_quotes(&QuoteFilter::default().with_statuses(&QuoteStatus::REMINDABLE))
            .await?;

        let mut expired = Vec::new();
        for mut quote in pending {
            if !quote.valid_until.is_some_and(|until| until < now) {
                continue;
            }
            let read_at = quote.updated_at;
            quote.status = QuoteStatus::Expired;
            quote.updated_at = now;

            match self.save(&quote, read_at, vec![]).await {
                Ok(()) => expired.push(quote.id),
                Err(ApiError::Conflict(reason)) => {
                    tracing::debug!(quote_id = %quote.id, %reason, "Expiry skipped");
                }
                Err(err) => return Err(err),
            }
        }

        if !expired.is_empty() {
            tracing::info!(count = expired.len(), "Overdue quotes expired");
        }
        Ok(expired)
    }

    async fn save(
        &self,
        quote: &Quote,
        read_at: DateTime<Utc>,
        preconditions: Vec<Precondition>,
    ) -> ApiResult<()> {
        self.store
            .commit(
                UnitOfWork::new()
                    .require(Precondition::QuoteRevision {
                        quote_id: quote.id,
                        updated_at: read_at,
                    })
                    .require_all(preconditions)
                    .save(Record::Quote(quote.clone())),
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currency_defaults_and_normalizes() {
        assert_eq!(normalize_currency(None).unwrap(), "EUR");
        assert_eq!(normalize_currency(Some(" chf ".to_string())).unwrap(), "CHF");
    }

    #[test]
    fn test_currency_rejects_malformed_codes() {
        let err = normalize_currency(Some("EURO".to_string())).unwrap_err();
        assert!(err.message().contains("EURO"));
        assert!(normalize_currency(Some("E1R".to_string())).is_err());
        assert!(normalize_currency(Some(String::new())).is_err());
    }
}
