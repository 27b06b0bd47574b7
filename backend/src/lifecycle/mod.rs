//! Lifecycle guards: soft delete and referential checks
//!
//! Every delete or blacklist path asks the guard first. A guard either
//! refuses with a BadRequest naming the blocking count, or hands back the
//! preconditions that must still hold when the tombstone is committed.

use std::sync::Arc;

use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::booking::BookingFilter;
use crate::error::{ApiError, ApiResult};
use crate::folder::Folder;
use crate::lead::Lead;
use crate::mover::Mover;
use crate::quote::{Quote, QuoteFilter, QuoteStatus};
use crate::store::{MoveStore, Precondition};

/// Entities retired by timestamp instead of removal
pub trait Tombstoned {
    fn deleted_at(&self) -> Option<DateTime<Utc>>;

    fn mark_deleted(&mut self, at: DateTime<Utc>);

    fn is_tombstoned(&self) -> bool {
        self.deleted_at().is_some()
    }
}

macro_rules! tombstoned {
    ($($ty:ty),*) => {
        $(
            impl Tombstoned for $ty {
                fn deleted_at(&self) -> Option<DateTime<Utc>> {
                    self.deleted_at
                }

                fn mark_deleted(&mut self, at: DateTime<Utc>) {
                    self.deleted_at = Some(at);
                    self.updated_at = at;
                }
            }
        )*
    };
}

tombstoned!(Lead, Mover, Folder, Quote);

/// Unwrap a lookup, treating absent and tombstoned rows alike
pub fn require_live<T: Tombstoned>(entity: Option<T>, kind: &str, id: Uuid) -> ApiResult<T> {
    match entity {
        Some(entity) if !entity.is_tombstoned() => Ok(entity),
        _ => Err(ApiError::NotFound(format!("{} {} not found", kind, id))),
    }
}

/// "1 open booking", "3 open bookings"
pub fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("1 {}", noun)
    } else {
        format!("{} {}s", count, noun)
    }
}

/// Shared predicates consulted before destructive transitions
#[derive(Clone)]
pub struct LifecycleGuard {
    store: Arc<dyn MoveStore>,
}

impl LifecycleGuard {
    pub fn new(store: Arc<dyn MoveStore>) -> Self {
        Self { store }
    }

    pub async fn open_bookings_for_folder(&self, folder_id: Uuid) -> ApiResult<usize> {
        let filter = BookingFilter {
            folder_id: Some(folder_id),
            open_only: true,
            ..Default::default()
        };
        Ok(self.store.list_bookings(&filter).await?.len())
    }

    pub async fn open_bookings_for_mover(&self, mover_id: Uuid) -> ApiResult<usize> {
        let filter = BookingFilter {
            mover_id: Some(mover_id),
            open_only: true,
            ..Default::default()
        };
        Ok(self.store.list_bookings(&filter).await?.len())
    }

    pub async fn bookings_for_quote(&self, quote_id: Uuid) -> ApiResult<usize> {
        let filter = BookingFilter {
            quote_id: Some(quote_id),
            ..Default::default()
        };
        Ok(self.store.list_bookings(&filter).await?.len())
    }

    pub async fn active_quotes_for_mover(&self, mover_id: Uuid) -> ApiResult<usize> {
        let filter = QuoteFilter::for_mover(mover_id).with_statuses(&QuoteStatus::ACTIVE);
        Ok(self.store.list_quotes(&filter).await?.len())
    }

    /// A folder can be retired only without an open booking
    pub async fn folder_deletion(&self, folder: &Folder) -> ApiResult<Vec<Precondition>> {
        let open = self.open_bookings_for_folder(folder.id).await?;
        if open > 0 {
            tracing::warn!(folder_id = %folder.id, open, "Folder deletion blocked");
            return Err(ApiError::BadRequest(format!(
                "cannot delete folder with {}",
                plural(open, "open booking")
            )));
        }
        Ok(vec![
            Precondition::FolderStatus {
                folder_id: folder.id,
                allowed: vec![folder.status],
            },
            Precondition::NoOpenBooking {
                folder_id: folder.id,
            },
        ])
    }

    /// A mover can be retired only without active quotes or open bookings
    pub async fn mover_deletion(&self, mover: &Mover) -> ApiResult<Vec<Precondition>> {
        let bookings = self.open_bookings_for_mover(mover.id).await?;
        if bookings > 0 {
            tracing::warn!(mover_id = %mover.id, bookings, "Mover deletion blocked");
            return Err(ApiError::BadRequest(format!(
                "cannot delete mover with {}",
                plural(bookings, "open booking")
            )));
        }
        let quotes = self.active_quotes_for_mover(mover.id).await?;
        if quotes > 0 {
            tracing::warn!(mover_id = %mover.id, quotes, "Mover deletion blocked");
            return Err(ApiError::BadRequest(format!(
                "cannot delete mover with {}",
                plural(quotes, "active quote")
            )));
        }
        Ok(vec![Precondition::MoverIdle { mover_id: mover.id }])
    }

    /// A quote can be retired only when unselected and never booked
    pub async fn quote_deletion(
        &self,
        quote: &Quote,
        folder: Option<&Folder>,
    ) -> ApiResult<Vec<Precondition>> {
        if folder.is_some_and(|f| f.selected_quote_id == Some(quote.id)) {
            tracing::warn!(quote_id = %quote.id, "Quote deletion blocked: selected");
            return Err(ApiError::BadRequest(format!(
                "cannot delete quote {}: it is the selected quote of folder {}",
                quote.id, quote.folder_id
            )));
        }
        let bookings = self.bookings_for_quote(quote.id).await?;
        if bookings > 0 {
            tracing::warn!(quote_id = %quote.id, bookings, "Quote deletion blocked: booked");
            return Err(ApiError::BadRequest(format!(
                "cannot delete quote referenced by {}",
                plural(bookings, "booking")
            )));
        }
        Ok(vec![
            Precondition::QuoteStatus {
                quote_id: quote.id,
                allowed: vec![quote.status],
            },
            Precondition::QuoteNotSelected { quote_id: quote.id },
            Precondition::QuoteUnbooked { quote_id: quote.id },
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plural() {
        assert_eq!(plural(1, "active quote"), "1 active quote");
        assert_eq!(plural(3, "open booking"), "3 open bookings");
    }
}
