use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::folder::FolderStatus;
use crate::lifecycle::{require_live, LifecycleGuard};
use crate::quote::{QuoteFilter, QuoteStatus};
use crate::store::{MoveStore, Precondition, Record, UnitOfWork};
use crate::top3::model::{ShortlistEntry, Top3Selection, SHORTLIST_SIZE};

/// Service building immutable shortlist snapshots
#[derive(Clone)]
pub struct Top3Service {
    store: Arc<dyn MoveStore>,
    guard: LifecycleGuard,
}

impl Top3Service {
    pub fn new(store: Arc<dyn MoveStore>) -> Self {
        Self {
            guard: LifecycleGuard::new(store.clone()),
            store,
        }
    }

    /// Freeze the three best validated, scored quotes of a folder
    ///
    /// Any earlier selection without a booking is cleared; the folder moves
    /// to `Top3Ready`. Earlier snapshots stay as history.
    pub async fn build(&self, folder_id: Uuid) -> ApiResult<Top3Selection> {
        let mut folder = require_live(self.store.get_folder(folder_id).await?, "folder", folder_id)?;

        if self.guard.open_bookings_for_folder(folder_id).await? > 0 {
            return Err(ApiError::Conflict(format!(
                "folder {} already has an open booking",
                folder_id
            )));
        }

        let filter = QuoteFilter::for_folder(folder_id).with_statuses(&[QuoteStatus::Validated]);
        let ranked: Vec<_> = self
            .store
            .list_quotes(&filter)
            .await?
            .into_iter()
            .filter(|q| q.score.is_some())
            .collect();

        if ranked.len() < SHORTLIST_SIZE {
            tracing::warn!(folder_id = %folder_id, eligible = ranked.len(), "Shortlist refused");
            return Err(ApiError::BadRequest(format!(
                "folder {} has {} validated and scored quotes, {} required",
                folder_id,
                ranked.len(),
                SHORTLIST_SIZE
            )));
        }

        let picked = &ranked[..SHORTLIST_SIZE];
        let entries: Vec<ShortlistEntry> = picked
            .iter()
            .filter_map(|q| {
                q.score.map(|score| ShortlistEntry {
                    quote_id: q.id,
                    score,
                    total_amount: q.total_amount,
                })
            })
            .collect();
        let entries: [ShortlistEntry; SHORTLIST_SIZE] = entries.try_into().map_err(|_| {
            ApiError::InternalError("shortlist lost an entry while freezing".to_string())
        })?;

        let now = Utc::now();
        let read_at = folder.updated_at;
        let previous_selection = folder.selected_quote_id;
        let previous = folder.transition(FolderStatus::Top3Ready, now)?;
        folder.selected_quote_id = None;
        folder.top3_ready_at = Some(now);

        let snapshot = Top3Selection {
            id: Uuid::new_v4(),
            folder_id,
            entries,
            presented_at: now,
        };

        let mut unit = UnitOfWork::new()
            .require(Precondition::FolderRevision {
                folder_id,
                updated_at: read_at,
            })
            .require(Precondition::FolderStatus {
                folder_id,
                allowed: vec![previous],
            })
            .require(Precondition::FolderSelection {
                folder_id,
                selected: previous_selection,
            })
            .require(Precondition::NoOpenBooking { folder_id });
        for quote in picked {
            unit = unit.require(Precondition::QuoteRevision {
                quote_id: quote.id,
                updated_at: quote.updated_at,
            });
        }

        self.store
            .commit(
                unit.save(Record::Top3(snapshot.clone()))
                    .save(Record::Folder(folder)),
            )
            .await?;

        tracing::info!(
            folder_id = %folder_id,
            snapshot_id = %snapshot.id,
            quotes = ?snapshot.quote_ids(),
            "Shortlist presented"
        );
        Ok(snapshot)
    }

    /// Most recent snapshot, the authoritative one
    pub async fn latest(&self, folder_id: Uuid) -> ApiResult<Top3Selection> {
        self.store
            .list_top3(folder_id)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                ApiError::NotFound(format!("folder {} has no shortlist yet", folder_id))
            })
    }

    /// All snapshots of a folder, newest first
    pub async fn history(&self, folder_id: Uuid) -> ApiResult<Vec<Top3Selection>> {
        Ok(self.store.list_top3(folder_id).await?)
    }
}
