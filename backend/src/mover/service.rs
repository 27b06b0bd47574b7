use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;
use validator::Validate;

use crate::client::normalize_email;
use crate::error::{ApiError, ApiResult};
use crate::lifecycle::{plural, require_live, LifecycleGuard, Tombstoned};
use crate::models::{PageRequest, PaginatedResponse};
use crate::mover::model::{
    BlacklistRequest, CreateMoverRequest, Mover, MoverFilter, MoverPatch, MoverStatus,
};
use crate::store::{MoveStore, Precondition, Record, UnitOfWork};

const MAX_RATING: Decimal = Decimal::from_parts(5, 0, 0, false, 0);

fn check_siret(siret: &str) -> ApiResult<()> {
    if siret.len() != 14 || !siret.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ApiError::BadRequest(format!(
            "siret must be 14 digits, got '{}'",
            siret
        )));
    }
    Ok(())
}

fn check_signals(
    rating: Option<Decimal>,
    financial_risk_score: Option<i32>,
    review_count: i32,
    litigation_count: i32,
) -> ApiResult<()> {
    if let Some(rating) = rating {
        if rating < Decimal::ZERO || rating > MAX_RATING {
            return Err(ApiError::BadRequest(format!(
                "rating must be between 0 and 5, got {}",
                rating
            )));
        }
    }
    if let Some(score) = financial_risk_score {
        if !(0..=100).contains(&score) {
            return Err(ApiError::BadRequest(format!(
                "financial_risk_score must be between 0 and 100, got {}",
                score
            )));
        }
    }
    if review_count < 0 || litigation_count < 0 {
        return Err(ApiError::BadRequest(format!(
            "review_count and litigation_count must not be negative, got {} and {}",
            review_count, litigation_count
        )));
    }
    Ok(())
}

/// Service for mover onboarding and status management
#[derive(Clone)]
pub struct MoverService {
    store: Arc<dyn MoveStore>,
    guard: LifecycleGuard,
}

impl MoverService {
    pub fn new(store: Arc<dyn MoveStore>) -> Self {
        Self {
            guard: LifecycleGuard::new(store.clone()),
            store,
        }
    }

    /// Onboard a mover in `Pending`
    pub async fn create(&self, request: CreateMoverRequest) -> ApiResult<Mover> {
        request.validate()?;
        check_siret(&request.siret)?;
        check_signals(
            request.rating,
            request.financial_risk_score,
            request.review_count,
            request.litigation_count,
        )?;
        self.ensure_identity_free(&request.siret, &request.email, None)
            .await?;

        let now = Utc::now();
        let mover = Mover {
            id: Uuid::new_v4(),
            company_name: request.company_name,
            siret: request.siret,
            email: normalize_email(&request.email),
            phone: request.phone,
            coverage_zones: request.coverage_zones,
            rating: request.rating,
            review_count: request.review_count,
            financial_risk_score: request.financial_risk_score,
            litigation_count: request.litigation_count,
            blacklisted: false,
            blacklist_reason: None,
            status: MoverStatus::Pending,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };

        self.store
            .commit(UnitOfWork::new().save(Record::Mover(mover.clone())))
            .await?;

        tracing::info!(mover_id = %mover.id, siret = %mover.siret, "Mover onboarded");
        Ok(mover)
    }

    pub async fn get(&self, mover_id: Uuid) -> ApiResult<Mover> {
        require_live(self.store.get_mover(mover_id).await?, "mover", mover_id)
    }

    pub async fn list(
        &self,
        filter: &MoverFilter,
        page: PageRequest,
    ) -> ApiResult<PaginatedResponse<Mover>> {
        Ok(self.store.list_movers(filter, page).await?)
    }

    pub async fn update(&self, mover_id: Uuid, patch: MoverPatch) -> ApiResult<Mover> {
        patch.validate()?;
        let mut mover = self.get(mover_id).await?;
        let read_at = mover.updated_at;

        let siret = patch.siret.unwrap_or_else(|| mover.siret.clone());
        let email = patch
            .email
            .map(|e| normalize_email(&e))
            .unwrap_or_else(|| mover.email.clone());
        check_siret(&siret)?;
        self.ensure_identity_free(&siret, &email, Some(mover_id))
            .await?;
        mover.siret = siret;
        mover.email = email;

        if let Some(company_name) = patch.company_name {
            mover.company_name = company_name;
        }
        if let Some(phone) = patch.phone {
            mover.phone = Some(phone);
        }
        if let Some(zones) = patch.coverage_zones {
            mover.coverage_zones = zones;
        }
        if patch.rating.is_some() {
            mover.rating = patch.rating;
        }
        if patch.financial_risk_score.is_some() {
            mover.financial_risk_score = patch.financial_risk_score;
        }
        if let Some(count) = patch.review_count {
            mover.review_count = count;
        }
        if let Some(count) = patch.litigation_count {
            mover.litigation_count = count;
        }
        check_signals(
            mover.rating,
            mover.financial_risk_score,
            mover.review_count,
            mover.litigation_count,
        )?;
        mover.updated_at = Utc::now();

        self.save(&mover, read_at, vec![]).await?;
        tracing::info!(mover_id = %mover_id, "Mover updated");
        Ok(mover)
    }

    /// Make a vetted mover eligible for quote requests
    pub async fn activate(&self, mover_id: Uuid) -> ApiResult<Mover> {
        let mut mover = self.get(mover_id).await?;
        let read_at = mover.updated_at;
        if mover.blacklisted {
            return Err(ApiError::BadRequest(format!(
                "cannot activate blacklisted mover {}",
                mover_id
            )));
        }
        mover.status = MoverStatus::Active;
        mover.updated_at = Utc::now();

        self.save(&mover, read_at, vec![Precondition::MoverEligible { mover_id }])
            .await?;
        tracing::info!(mover_id = %mover_id, "Mover activated");
        Ok(mover)
    }

    pub async fn suspend(&self, mover_id: Uuid) -> ApiResult<Mover> {
        let mut mover = self.get(mover_id).await?;
        let read_at = mover.updated_at;
        mover.status = MoverStatus::Suspended;
        mover.updated_at = Utc::now();

        self.save(&mover, read_at, vec![]).await?;
        tracing::info!(mover_id = %mover_id, "Mover suspended");
        Ok(mover)
    }

    /// Blacklist a mover; refused while it still holds open bookings
    pub async fn blacklist(&self, mover_id: Uuid, request: BlacklistRequest) -> ApiResult<Mover> {
        let reason = request.reason.trim();
        if reason.is_empty() {
            return Err(ApiError::BadRequest(
                "blacklist reason is required".to_string(),
            ));
        }

        let mut mover = self.get(mover_id).await?;
        let read_at = mover.updated_at;
        if mover.blacklisted {
            return Err(ApiError::BadRequest(format!(
                "mover {} is already blacklisted",
                mover_id
            )));
        }
        let bookings = self.guard.open_bookings_for_mover(mover_id).await?;
        if bookings > 0 {
            tracing::warn!(mover_id = %mover_id, bookings, "Blacklist blocked");
            return Err(ApiError::BadRequest(format!(
                "cannot blacklist mover with {}",
                plural(bookings, "open booking")
            )));
        }

        mover.blacklisted = true;
        mover.blacklist_reason = Some(reason.to_string());
        mover.status = MoverStatus::Suspended;
        mover.updated_at = Utc::now();

        self.save(&mover, read_at, vec![Precondition::MoverEligible { mover_id }])
            .await?;
        tracing::warn!(mover_id = %mover_id, reason, "Mover blacklisted");
        Ok(mover)
    }

    /// Clear the blacklist flag; the mover stays suspended until activated
    pub async fn lift_blacklist(&self, mover_id: Uuid) -> ApiResult<Mover> {
        let mut mover = self.get(mover_id).await?;
        let read_at = mover.updated_at;
        if !mover.blacklisted {
            return Err(ApiError::BadRequest(format!(
                "mover {} is not blacklisted",
                mover_id
            )));
        }
        mover.blacklisted = false;
        mover.blacklist_reason = None;
        mover.updated_at = Utc::now();

        self.save(&mover, read_at, vec![]).await?;
        tracing::info!(mover_id = %mover_id, "Mover blacklist lifted");
        Ok(mover)
    }

    pub async fn delete(&self, mover_id: Uuid) -> ApiResult<Mover> {
        let mut mover = self.get(mover_id).await?;
        let read_at = mover.updated_at;
        let preconditions = self.guard.mover_deletion(&mover).await?;
        mover.mark_deleted(Utc::now());

        self.save(&mover, read_at, preconditions).await?;
        tracing::info!(mover_id = %mover_id, "Mover deleted");
        Ok(mover)
    }

    /// Write the mover back, provided nobody wrote it since `read_at`
    async fn save(
        &self,
        mover: &Mover,
        read_at: DateTime<Utc>,
        preconditions: Vec<Precondition>,
    ) -> ApiResult<()> {
        self.store
            .commit(
                UnitOfWork::new()
                    .require(Precondition::MoverRevision {
                        mover_id: mover.id,
                        updated_at: read_at,
                    })
                    .require_all(preconditions)
                    .save(Record::Mover(mover.clone())),
            )
            .await?;
        Ok(())
    }

    async fn ensure_identity_free(
        &self,
        siret: &str,
        email: &str,
        owner: Option<Uuid>,
    ) -> ApiResult<()> {
        if let Some(existing) = self.store.find_mover_by_siret(siret).await? {
            if Some(existing.id) != owner {
                return Err(ApiError::Conflict(format!(
                    "mover siret '{}' already registered",
                    siret
                )));
            }
        }
        if let Some(existing) = self.store.find_mover_by_email(email).await? {
            if Some(existing.id) != owner {
                return Err(ApiError::Conflict(format!(
                    "mover email '{}' already registered",
                    normalize_email(email)
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_siret_must_be_digits() {
        assert!(check_siret("12345678901234").is_ok());
        assert!(check_siret("1234567890123A").is_err());
        assert!(check_siret("123").is_err());
    }

    #[test]
    fn test_signal_bounds() {
        assert!(check_signals(Some(Decimal::new(45, 1)), Some(80), 12, 0).is_ok());
        let err = check_signals(Some(Decimal::new(51, 1)), None, 0, 0).unwrap_err();
        assert!(err.message().contains("5.1"));
        assert!(check_signals(None, Some(101), 0, 0).is_err());
        assert!(check_signals(None, None, -1, 0).is_err());
    }
}
