use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::folder::model::{
    CreateFolderRequest, Folder, FolderFilter, FolderPatch, FolderStatus,
};
use crate::lifecycle::{plural, require_live, LifecycleGuard, Tombstoned};
use crate::models::{PageRequest, PaginatedResponse};
use crate::quote::{Quote, QuoteStatus};
use crate::store::{MoveStore, Precondition, Record, UnitOfWork};

fn check_measures(volume: Decimal, distance_km: Option<Decimal>) -> ApiResult<()> {
    if volume.is_sign_negative() {
        return Err(ApiError::BadRequest(format!(
            "volume must not be negative, got {}",
            volume
        )));
    }
    if let Some(distance) = distance_km.filter(|d| d.is_sign_negative()) {
        return Err(ApiError::BadRequest(format!(
            "distance_km must not be negative, got {}",
            distance
        )));
    }
    Ok(())
}

/// Service owning the folder state machine
#[derive(Clone)]
pub struct FolderService {
    store: Arc<dyn MoveStore>,
    guard: LifecycleGuard,
}

impl FolderService {
    pub fn new(store: Arc<dyn MoveStore>) -> Self {
        Self {
            guard: LifecycleGuard::new(store.clone()),
            store,
        }
    }

    /// Open a folder for an active client
    pub async fn create(&self, request: CreateFolderRequest) -> ApiResult<Folder> {
        request.validate()?;
        check_measures(request.volume, request.distance_km)?;

        let client_id = request.client_id;
        let client = self
            .store
            .get_client(client_id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("client {} not found", client_id)))?;
        if client.is_anonymized() {
            return Err(ApiError::BadRequest(format!(
                "client {} is anonymized",
                client_id
            )));
        }

        let folder = Folder::new(request, None, Utc::now());
        self.store
            .commit(
                UnitOfWork::new()
                    .require(Precondition::ClientActive { client_id })
                    .save(Record::Folder(folder.clone())),
            )
            .await?;

        tracing::info!(folder_id = %folder.id, client_id = %client_id, "Folder created");
        Ok(folder)
    }

    pub async fn get(&self, folder_id: Uuid) -> ApiResult<Folder> {
        require_live(self.store.get_folder(folder_id).await?, "folder", folder_id)
    }

    pub async fn list(
        &self,
        filter: &FolderFilter,
        page: PageRequest,
    ) -> ApiResult<PaginatedResponse<Folder>> {
        Ok(self.store.list_folders(filter, page).await?)
    }

    /// Edit route, volume, date or options while nothing is booked
    ///
    /// The write keeps the selection it read, so it fails rather than undo a
    /// concurrent selection.
    pub async fn update(&self, folder_id: Uuid, patch: FolderPatch) -> ApiResult<Folder> {
        patch.validate()?;
        let mut folder = self.get(folder_id).await?;
        let read_at = folder.updated_at;
        if folder.status.is_terminal() {
            return Err(ApiError::BadRequest(format!(
                "folder {} is {} and can no longer be edited",
                folder_id,
                folder.status.as_str()
            )));
        }
        let open = self.guard.open_bookings_for_folder(folder_id).await?;
        if open > 0 {
            return Err(ApiError::BadRequest(format!(
                "cannot edit folder with {}",
                plural(open, "open booking")
            )));
        }

        patch.apply_to(&mut folder);
        check_measures(folder.volume, folder.distance_km)?;
        folder.updated_at = Utc::now();

        self.store
            .commit(
                UnitOfWork::new()
                    .require(Precondition::FolderRevision {
                        folder_id,
                        updated_at: read_at,
                    })
                    .require(Precondition::FolderStatus {
                        folder_id,
                        allowed: vec![folder.status],
                    })
                    .require(Precondition::FolderSelection {
                        folder_id,
                        selected: folder.selected_quote_id,
                    })
                    .require(Precondition::NoOpenBooking { folder_id })
                    .save(Record::Folder(folder.clone())),
            )
            .await?;

        tracing::info!(folder_id = %folder_id, "Folder updated");
        Ok(folder)
    }

    /// Mark quotes as requested from movers
    pub async fn request_quotes(&self, folder_id: Uuid) -> ApiResult<Folder> {
        let mut folder = self.get(folder_id).await?;
        let read_at = folder.updated_at;
        let now = Utc::now();
        let previous = folder.transition(FolderStatus::QuotesPending, now)?;
        folder.quotes_requested_at = Some(now);

        self.store
            .commit(
                UnitOfWork::new()
                    .require(Precondition::FolderRevision {
                        folder_id,
                        updated_at: read_at,
                    })
                    .require(Precondition::FolderStatus {
                        folder_id,
                        allowed: vec![previous],
                    })
                    .save(Record::Folder(folder.clone())),
            )
            .await?;

        tracing::info!(folder_id = %folder_id, from = previous.as_str(), "Quotes requested");
        Ok(folder)
    }

    /// Select a validated quote of this folder and move to `AwaitingPayment`
    ///
    /// The commit is conditioned on the selection the folder had when read,
    /// so of two racing selections only one lands.
    pub async fn select_quote(&self, folder_id: Uuid, quote_id: Uuid) -> ApiResult<Folder> {
        let mut folder = self.get(folder_id).await?;
        let read_at = folder.updated_at;
        validated_quote_of(self.store.as_ref(), &folder, quote_id).await?;

        if self.guard.open_bookings_for_folder(folder_id).await? > 0 {
            return Err(ApiError::Conflict(format!(
                "folder {} already has an open booking",
                folder_id
            )));
        }

        let previous_selection = folder.selected_quote_id;
        let previous = folder.transition(FolderStatus::AwaitingPayment, Utc::now())?;
        folder.selected_quote_id = Some(quote_id);

        self.store
            .commit(
                UnitOfWork::new()
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
                    .require(Precondition::QuoteStatus {
                        quote_id,
                        allowed: vec![QuoteStatus::Validated],
                    })
                    .require(Precondition::NoOpenBooking { folder_id })
                    .save(Record::Folder(folder.clone())),
            )
            .await?;

        tracing::info!(folder_id = %folder_id, quote_id = %quote_id, "Quote selected");
        Ok(folder)
    }

    /// Cancel and tombstone a folder without open bookings
    pub async fn delete(&self, folder_id: Uuid) -> ApiResult<Folder> {
        let mut folder = self.get(folder_id).await?;
        let read_at = folder.updated_at;
        let preconditions = self.guard.folder_deletion(&folder).await?;

        let now = Utc::now();
        if folder.has_open_status() {
            folder.transition(FolderStatus::Cancelled, now)?;
        }
        folder.mark_deleted(now);

        self.store
            .commit(
                UnitOfWork::new()
                    .require(Precondition::FolderRevision {
                        folder_id,
                        updated_at: read_at,
                    })
                    .require_all(preconditions)
                    .save(Record::Folder(folder.clone())),
            )
            .await?;

        tracing::info!(folder_id = %folder_id, "Folder deleted");
        Ok(folder)
    }
}

/// A live validated quote belonging to the folder, else NotFound
pub(crate) async fn validated_quote_of(
    store: &dyn MoveStore,
    folder: &Folder,
    quote_id: Uuid,
) -> ApiResult<Quote> {
    match store.get_quote(quote_id).await? {
        Some(quote)
            if quote.deleted_at.is_none()
                && quote.folder_id == folder.id
                && quote.status == QuoteStatus::Validated =>
        {
            Ok(quote)
        }
        _ => Err(ApiError::NotFound(format!(
            "quote {} is not a validated quote of folder {}",
            quote_id, folder.id
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_measures_must_not_be_negative() {
        assert!(check_measures(Decimal::new(185, 1), Some(Decimal::new(585, 0))).is_ok());
        assert!(check_measures(Decimal::ZERO, None).is_ok());

        let err = check_measures(Decimal::new(-1, 0), None).unwrap_err();
        assert!(err.message().contains("volume"));
        let err = check_measures(Decimal::ONE, Some(Decimal::new(-5, 0))).unwrap_err();
        assert!(err.message().contains("distance_km"));
    }
}
