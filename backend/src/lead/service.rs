use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;
use validator::Validate;

use crate::client::{normalize_email, Client};
use crate::config::ConversionPolicy;
use crate::error::{ApiError, ApiResult};
use crate::folder::{CreateFolderRequest, Folder};
use crate::lead::model::{CreateLeadRequest, Lead, LeadFilter, LeadStatus};
use crate::lifecycle::{require_live, Tombstoned};
use crate::models::{PageRequest, PaginatedResponse};
use crate::store::{MoveStore, Precondition, Record, UnitOfWork};

/// Result of converting a lead
#[derive(Debug, Clone, Serialize)]
pub struct ConversionOutcome {
    pub lead: Lead,
    pub client: Client,
    pub folder: Folder,
    /// False when an existing active client was reused
    pub client_created: bool,
}

/// Service for lead intake and conversion
#[derive(Clone)]
pub struct LeadService {
    store: Arc<dyn MoveStore>,
    policy: ConversionPolicy,
}

impl LeadService {
    pub fn new(store: Arc<dyn MoveStore>, policy: ConversionPolicy) -> Self {
        Self { store, policy }
    }

    /// Record an inbound lead
    pub async fn create(&self, request: CreateLeadRequest) -> ApiResult<Lead> {
        request.validate()?;
        if request.estimated_volume.is_some_and(|v| v.is_sign_negative()) {
            return Err(ApiError::BadRequest(
                "estimated_volume must not be negative".to_string(),
            ));
        }

        let now = Utc::now();
        let lead = Lead {
            id: Uuid::new_v4(),
            first_name: request.first_name,
            last_name: request.last_name,
            email: normalize_email(&request.email),
            phone: request.phone,
            origin_address: request.origin_address,
            origin_city: request.origin_city,
            origin_postal_code: request.origin_postal_code,
            destination_address: request.destination_address,
            destination_city: request.destination_city,
            destination_postal_code: request.destination_postal_code,
            estimated_volume: request.estimated_volume,
            estimation_method: request.estimation_method,
            desired_date: request.desired_date,
            source: request.source,
            status: LeadStatus::New,
            converted_at: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };

        self.store
            .commit(UnitOfWork::new().save(Record::Lead(lead.clone())))
            .await?;

        tracing::info!(lead_id = %lead.id, "Lead recorded");
        Ok(lead)
    }

    pub async fn get(&self, lead_id: Uuid) -> ApiResult<Lead> {
        require_live(self.store.get_lead(lead_id).await?, "lead", lead_id)
    }

    pub async fn list(
        &self,
        filter: &LeadFilter,
        page: PageRequest,
    ) -> ApiResult<PaginatedResponse<Lead>> {
        Ok(self.store.list_leads(filter, page).await?)
    }

    /// Tombstone a lead; its folder, if any, is untouched
    pub async fn delete(&self, lead_id: Uuid) -> ApiResult<Lead> {
        let mut lead = self.get(lead_id).await?;
        let status = lead.status;
        lead.mark_deleted(Utc::now());

        self.store
            .commit(
                UnitOfWork::new()
                    .require(Precondition::LeadStatus { lead_id, status })
                    .save(Record::Lead(lead.clone())),
            )
            .await?;

        tracing::info!(lead_id = %lead_id, "Lead deleted");
        Ok(lead)
    }

    /// Turn a lead into a folder, reusing or creating its client
    ///
    /// Client creation, folder creation and the lead status change are
    /// committed as one unit guarded on the lead still being `New`, so a
    /// racing second conversion fails instead of opening a second folder.
    pub async fn convert(&self, lead_id: Uuid) -> ApiResult<ConversionOutcome> {
        let mut lead = self.get(lead_id).await?;
        if lead.status == LeadStatus::Converted {
            return Err(ApiError::Conflict(format!(
                "lead {} is already converted",
                lead_id
            )));
        }

        let volume = lead
            .estimated_volume
            .or(self.policy.default_volume)
            .ok_or_else(|| {
                ApiError::BadRequest(format!(
                    "lead {} has no estimated_volume and no default volume is configured",
                    lead_id
                ))
            })?;

        let now = Utc::now();
        let moving_date = match lead.desired_date {
            Some(date) => date,
            None if self.policy.default_date_today => now.date_naive(),
            None => {
                return Err(ApiError::BadRequest(format!(
                    "lead {} has no desired_date and defaulting to today is disabled",
                    lead_id
                )))
            }
        };

        let mut unit = UnitOfWork::new().require(Precondition::LeadStatus {
            lead_id,
            status: LeadStatus::New,
        });

        let (client, client_created) = match self.store.find_client_by_email(&lead.email).await? {
            Some(existing) => {
                unit = unit.require(Precondition::ClientActive {
                    client_id: existing.id,
                });
                (existing, false)
            }
            None => {
                let client = Client {
                    id: Uuid::new_v4(),
                    first_name: lead.first_name.clone(),
                    last_name: lead.last_name.clone(),
                    email: normalize_email(&lead.email),
                    phone: lead.phone.clone(),
                    anonymized_at: None,
                    created_at: now,
                    updated_at: now,
                };
                unit = unit.save(Record::Client(client.clone()));
                (client, true)
            }
        };

        let folder = Folder::new(
            CreateFolderRequest {
                client_id: client.id,
                origin_address: lead.origin_address.clone(),
                origin_city: lead.origin_city.clone(),
                origin_postal_code: lead.origin_postal_code.clone(),
                origin_floor: None,
                origin_elevator: false,
                destination_address: lead.destination_address.clone(),
                destination_city: lead.destination_city.clone(),
                destination_postal_code: lead.destination_postal_code.clone(),
                destination_floor: None,
                destination_elevator: false,
                volume,
                distance_km: None,
                moving_date,
                needs_packing: false,
                needs_storage: false,
                needs_insurance: false,
            },
            Some(lead.id),
            now,
        );

        lead.status = LeadStatus::Converted;
        lead.converted_at = Some(now);
        lead.updated_at = now;

        self.store
            .commit(
                unit.save(Record::Folder(folder.clone()))
                    .save(Record::Lead(lead.clone())),
            )
            .await?;

        tracing::info!(
            lead_id = %lead.id,
            client_id = %client.id,
            folder_id = %folder.id,
            client_created,
            "Lead converted"
        );

        Ok(ConversionOutcome {
            lead,
            client,
            folder,
            client_created,
        })
    }
}
