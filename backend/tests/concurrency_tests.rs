//! Racing writes on one folder, mover or booking: exactly one lands

mod common;

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use movebroker_server::config::EnginePolicy;
    use movebroker_server::error::ApiError;
    use movebroker_server::folder::{FolderPatch, FolderStatus};
    use movebroker_server::payment::{
        CreatePaymentRequest, PaymentOutcome, PaymentOutcomeRequest, PaymentType,
    };
    use movebroker_server::state::AppState;

    use super::common::*;

    async fn gated_engine() -> (Arc<GatedStore>, AppState) {
        let store = Arc::new(GatedStore::default());
        let state = engine_on(store.clone(), EnginePolicy::default()).await;
        (store, state)
    }

    fn one_winner<T: std::fmt::Debug>(a: Result<T, ApiError>, b: Result<T, ApiError>) -> ApiError {
        match (a, b) {
            (Ok(_), Err(err)) | (Err(err), Ok(_)) => err,
            other => panic!("expected exactly one success, got {:?}", other),
        }
    }

    fn payment(payment_type: PaymentType, amount: &str, key: &str) -> CreatePaymentRequest {
        CreatePaymentRequest {
            payment_type,
            amount: d(amount),
            commission_rate: (payment_type == PaymentType::Deposit).then(|| d("0.10")),
            idempotency_key: key.to_string(),
        }
    }

    #[tokio::test]
    async fn test_racing_selections_on_one_folder() {
        let (store, state) = gated_engine().await;
        let folder = folder(&state).await;
        let first = quote(&state, folder.id, mover(&state, 1).await.id, "1000.00").await;
        let second = quote(&state, folder.id, mover(&state, 2).await.id, "1100.00").await;
        approve(&state, first.id).await;
        approve(&state, second.id).await;

        store.arm();
        let (a, b) = tokio::join!(
            state.folder_service.select_quote(folder.id, first.id),
            state.folder_service.select_quote(folder.id, second.id),
        );
        let err = one_winner(a, b);
        assert!(matches!(err, ApiError::Conflict(_)), "{:?}", err);

        let folder = state.folder_service.get(folder.id).await.unwrap();
        assert_eq!(folder.status, FolderStatus::AwaitingPayment);
        assert!(folder.selected_quote_id.is_some());
    }

    #[tokio::test]
    async fn test_racing_bookings_leave_one_open() {
        let (store, state) = gated_engine().await;
        let folder = folder(&state).await;
        let first = quote(&state, folder.id, mover(&state, 1).await.id, "1000.00").await;
        let second = quote(&state, folder.id, mover(&state, 2).await.id, "1000.00").await;
        approve(&state, first.id).await;
        approve(&state, second.id).await;

        let request = |quote_id| movebroker_server::booking::CreateBookingRequest {
            folder_id: folder.id,
            quote_id,
            total_amount: d("1000.00"),
            deposit_amount: d("300.00"),
        };
        store.arm();
        let (a, b) = tokio::join!(
            state.booking_service.create(request(first.id)),
            state.booking_service.create(request(second.id)),
        );
        let err = one_winner(a, b);
        assert!(matches!(err, ApiError::Conflict(_)), "{:?}", err);
        assert_eq!(state.booking_service.list_for_folder(folder.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_folder_edit_does_not_undo_a_new_selection() {
        let (store, state) = gated_engine().await;
        let folder = folder(&state).await;
        let first = quote(&state, folder.id, mover(&state, 1).await.id, "1000.00").await;
        let second = quote(&state, folder.id, mover(&state, 2).await.id, "1100.00").await;
        approve(&state, first.id).await;
        approve(&state, second.id).await;
        state.folder_service.select_quote(folder.id, first.id).await.unwrap();

        let patch = FolderPatch {
            volume: Some(d("22")),
            ..Default::default()
        };
        store.arm();
        let (selected, edited) = tokio::join!(
            state.folder_service.select_quote(folder.id, second.id),
            state.folder_service.update(folder.id, patch),
        );
        let err = one_winner(selected, edited);
        assert!(matches!(err, ApiError::Conflict(_)), "{:?}", err);

        let folder = state.folder_service.get(folder.id).await.unwrap();
        if folder.selected_quote_id == Some(second.id) {
            assert_eq!(folder.volume, d("18.5"));
        } else {
            assert_eq!(folder.selected_quote_id, Some(first.id));
            assert_eq!(folder.volume, d("22"));
        }
    }

    #[tokio::test]
    async fn test_stale_mover_write_cannot_revive_a_deleted_mover() {
        let (store, state) = gated_engine().await;
        let m = mover(&state, 1).await;

        store.arm();
        let (suspended, deleted) = tokio::join!(
            state.mover_service.suspend(m.id),
            state.mover_service.delete(m.id),
        );
        let deleted_won = deleted.is_ok();
        let err = one_winner(deleted, suspended);
        assert!(matches!(err, ApiError::Conflict(_)), "{:?}", err);

        let lookup = state.mover_service.get(m.id).await;
        if deleted_won {
            assert!(matches!(lookup, Err(ApiError::NotFound(_))));
        } else {
            assert!(lookup.is_ok());
        }
    }

    #[tokio::test]
    async fn test_racing_deposits_register_one() {
        let (store, state) = gated_engine().await;
        let booking = pending_booking(&state, "1000.00", "300.00").await;

        store.arm();
        let (a, b) = tokio::join!(
            state
                .payment_service
                .create(booking.id, payment(PaymentType::Deposit, "300.00", "race-deposit-a")),
            state
                .payment_service
                .create(booking.id, payment(PaymentType::Deposit, "300.00", "race-deposit-b")),
        );
        let err = one_winner(a, b);
        assert!(matches!(err, ApiError::Conflict(_)), "{:?}", err);
        assert_eq!(
            state.payment_service.list_for_booking(booking.id).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn test_racing_refunds_cannot_exceed_the_deposit() {
        let (store, state) = gated_engine().await;
        let booking = pending_booking(&state, "1000.00", "300.00").await;
        let deposit = state
            .payment_service
            .create(booking.id, payment(PaymentType::Deposit, "300.00", "refund-race-dep"))
            .await
            .unwrap();
        state
            .payment_service
            .record_outcome(
                deposit.id,
                PaymentOutcomeRequest {
                    outcome: PaymentOutcome::Succeeded,
                    processor_reference: None,
                },
            )
            .await
            .unwrap();

        store.arm();
        let (a, b) = tokio::join!(
            state
                .payment_service
                .create(booking.id, payment(PaymentType::Refund, "300.00", "refund-race-a")),
            state
                .payment_service
                .create(booking.id, payment(PaymentType::Refund, "300.00", "refund-race-b")),
        );
        let err = one_winner(a, b);
        assert!(matches!(err, ApiError::Conflict(_)), "{:?}", err);

        let refunds = state
            .payment_service
            .list_for_booking(booking.id)
            .await
            .unwrap()
            .into_iter()
            .filter(|p| p.payment_type == PaymentType::Refund)
            .count();
        assert_eq!(refunds, 1);
    }
}
