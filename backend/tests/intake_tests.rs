//! Lead conversion, client privacy and mover guard tests

mod common;

#[cfg(test)]
mod tests {
    use movebroker_server::actor::{RegisterUserRequest, UserRole};
    use movebroker_server::client::{ClientFilter, ClientPatch};
    use movebroker_server::config::{ConversionPolicy, EnginePolicy};
    use movebroker_server::error::ApiError;
    use movebroker_server::folder::FolderFilter;
    use movebroker_server::lead::{CreateLeadRequest, LeadFilter, LeadStatus};
    use movebroker_server::models::PageRequest;
    use movebroker_server::mover::{BlacklistRequest, MoverStatus};
    use movebroker_server::quote::{CreateQuoteRequest, QuoteSource, ValidateQuoteRequest};

    use super::common::*;

    fn lead_request(email: &str) -> CreateLeadRequest {
        CreateLeadRequest {
            first_name: "Lucie".to_string(),
            last_name: "Bernard".to_string(),
            email: email.to_string(),
            phone: None,
            origin_address: "3 cours de l'Intendance".to_string(),
            origin_city: "Bordeaux".to_string(),
            origin_postal_code: "33000".to_string(),
            destination_address: "20 avenue de l'Opéra".to_string(),
            destination_city: "Paris".to_string(),
            destination_postal_code: "75001".to_string(),
            estimated_volume: Some(d("18.5")),
            estimation_method: None,
            desired_date: None,
            source: Some("website".to_string()),
        }
    }

    #[tokio::test]
    async fn test_conversion_creates_client_and_folder_once() {
        let state = engine().await;
        let lead = state
            .lead_service
            .create(lead_request("Lucie.Bernard@Example.test"))
            .await
            .unwrap();
        assert_eq!(lead.email, "lucie.bernard@example.test");

        let outcome = state.lead_service.convert(lead.id).await.unwrap();
        assert!(outcome.client_created);
        assert_eq!(outcome.lead.status, LeadStatus::Converted);
        assert_eq!(outcome.folder.lead_id, Some(lead.id));
        assert_eq!(outcome.folder.client_id, outcome.client.id);
        assert_eq!(outcome.folder.volume, d("18.5"));

        let err = state.lead_service.convert(lead.id).await.unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));

        let folders = state
            .folder_service
            .list(&FolderFilter::default(), PageRequest::default())
            .await
            .unwrap();
        assert_eq!(folders.total, 1);
    }

    #[tokio::test]
    async fn test_conversion_reuses_active_client() {
        let state = engine().await;
        let existing = client(&state, "lucie@example.test").await;
        let lead = state
            .lead_service
            .create(lead_request("LUCIE@example.test"))
            .await
            .unwrap();

        let outcome = state.lead_service.convert(lead.id).await.unwrap();
        assert!(!outcome.client_created);
        assert_eq!(outcome.client.id, existing.id);
    }

    #[tokio::test]
    async fn test_conversion_policy_can_refuse_missing_volume() {
        let state = engine_with(EnginePolicy {
            conversion: ConversionPolicy {
                default_volume: None,
                default_date_today: true,
            },
            ..Default::default()
        })
        .await;
        let mut request = lead_request("novolume@example.test");
        request.estimated_volume = None;
        let lead = state.lead_service.create(request).await.unwrap();

        let err = state.lead_service.convert(lead.id).await.unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
        assert!(err.message().contains("estimated_volume"));
        assert_eq!(
            state.lead_service.get(lead.id).await.unwrap().status,
            LeadStatus::New
        );
    }

    #[tokio::test]
    async fn test_tombstoned_leads_leave_listings() {
        let state = engine().await;
        let kept = state.lead_service.create(lead_request("a@example.test")).await.unwrap();
        let dropped = state.lead_service.create(lead_request("b@example.test")).await.unwrap();
        state.lead_service.delete(dropped.id).await.unwrap();

        let page = state
            .lead_service
            .list(&LeadFilter::default(), PageRequest::default())
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.data[0].id, kept.id);

        let err = state.lead_service.get(dropped.id).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_anonymize_keeps_id_and_folders() {
        let state = engine().await;
        let c = client(&state, "private@example.test").await;
        let f = state.folder_service.create(folder_request(c.id)).await.unwrap();

        let scrubbed = state.client_service.anonymize(c.id).await.unwrap();
        assert_eq!(scrubbed.id, c.id);
        assert!(scrubbed.anonymized_at.is_some());
        assert_ne!(scrubbed.email, "private@example.test");
        assert_eq!(scrubbed.phone, None);

        let folders = state
            .client_service
            .folders(c.id, PageRequest::default())
            .await
            .unwrap();
        assert_eq!(folders.data[0].id, f.id);

        let err = state.client_service.anonymize(c.id).await.unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
        let err = state
            .client_service
            .update(c.id, ClientPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));

        // The email is free again
        client(&state, "private@example.test").await;
        let listed = state
            .client_service
            .list(&ClientFilter::default(), PageRequest::default())
            .await
            .unwrap();
        assert_eq!(listed.total, 1);
    }

    #[tokio::test]
    async fn test_duplicate_client_email_conflicts() {
        let state = engine().await;
        client(&state, "dup@example.test").await;
        let err = state
            .client_service
            .create(movebroker_server::client::CreateClientRequest {
                first_name: "Other".to_string(),
                last_name: "Person".to_string(),
                email: "DUP@example.test".to_string(),
                phone: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_mover_deletion_guarded_by_active_quotes() {
        let state = engine().await;
        let f = folder(&state).await;
        let m = mover(&state, 1).await;
        let q = quote(&state, f.id, m.id, "800.00").await;

        let err = state.mover_service.delete(m.id).await.unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
        assert_eq!(err.message(), "cannot delete mover with 1 active quote");

        state
            .quote_service
            .validate(
                q.id,
                OPERATOR,
                ValidateQuoteRequest {
                    approved: false,
                    reason: None,
                },
            )
            .await
            .unwrap();

        let deleted = state.mover_service.delete(m.id).await.unwrap();
        assert!(deleted.deleted_at.is_some());
        let err = state.mover_service.get(m.id).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_blacklisted_mover_cannot_quote() {
        let state = engine().await;
        let f = folder(&state).await;
        let m = mover(&state, 1).await;

        let err = state
            .mover_service
            .blacklist(m.id, BlacklistRequest { reason: "  ".to_string() })
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));

        let blacklisted = state
            .mover_service
            .blacklist(
                m.id,
                BlacklistRequest {
                    reason: "unpaid damages".to_string(),
                },
            )
            .await
            .unwrap();
        assert_eq!(blacklisted.status, MoverStatus::Suspended);

        let err = state
            .quote_service
            .create(CreateQuoteRequest {
                folder_id: f.id,
                mover_id: m.id,
                source: QuoteSource::Parsed,
                total_amount: d("700.00"),
                currency: None,
                valid_until: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
        assert!(err.message().contains("unpaid damages"));

        let err = state.mover_service.activate(m.id).await.unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));

        let lifted = state.mover_service.lift_blacklist(m.id).await.unwrap();
        assert!(!lifted.blacklisted);
        assert_eq!(lifted.status, MoverStatus::Suspended);
    }

    #[tokio::test]
    async fn test_duplicate_siret_conflicts() {
        let state = engine().await;
        let first = mover(&state, 7).await;
        let err = state
            .mover_service
            .create(movebroker_server::mover::CreateMoverRequest {
                company_name: "Copycat".to_string(),
                siret: first.siret.clone(),
                email: "other@movers.test".to_string(),
                phone: None,
                coverage_zones: Default::default(),
                rating: None,
                review_count: 0,
                financial_risk_score: None,
                litigation_count: 0,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_quote_review_requires_operator_role() {
        let state = engine().await;
        let f = folder(&state).await;
        let m = mover(&state, 1).await;
        let q = quote(&state, f.id, m.id, "650.00").await;
        state
            .actors
            .register(
                ADMIN,
                RegisterUserRequest {
                    id: "mover-user".to_string(),
                    email: "team@movers.test".to_string(),
                    name: None,
                    role: UserRole::Mover,
                    mover_id: Some(m.id),
                },
            )
            .await
            .unwrap();

        let approve_request = || ValidateQuoteRequest {
            approved: true,
            reason: None,
        };
        let err = state
            .quote_service
            .validate(q.id, "mover-user", approve_request())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));

        let err = state
            .quote_service
            .validate(q.id, "nobody", approve_request())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));

        let validated = state
            .quote_service
            .validate(q.id, OPERATOR, approve_request())
            .await
            .unwrap();
        assert_eq!(validated.validated_by.as_deref(), Some(OPERATOR));
    }

    #[tokio::test]
    async fn test_reminders_and_expiry() {
        let state = engine().await;
        let f = folder(&state).await;
        let m = mover(&state, 1).await;
        let q = state
            .quote_service
            .create(CreateQuoteRequest {
                folder_id: f.id,
                mover_id: m.id,
                source: QuoteSource::Generated,
                total_amount: d("990.00"),
                currency: Some("eur".to_string()),
                valid_until: Some(chrono::Utc::now() - chrono::Duration::hours(1)),
            })
            .await
            .unwrap();
        assert_eq!(q.currency, "EUR");

        let reminded = state.quote_service.remind(q.id).await.unwrap();
        let reminded = state.quote_service.remind(reminded.id).await.unwrap();
        assert_eq!(reminded.reminder_count, 2);

        let expired = state
            .quote_service
            .expire_overdue(chrono::Utc::now())
            .await
            .unwrap();
        assert_eq!(expired, vec![q.id]);

        let err = state.quote_service.remind(q.id).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }
}
