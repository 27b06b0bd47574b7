use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::client::model::{normalize_email, Client, ClientFilter, ClientPatch, CreateClientRequest};
use crate::error::{ApiError, ApiResult};
use crate::folder::{Folder, FolderFilter};
use crate::models::{PageRequest, PaginatedResponse};
use crate::store::{MoveStore, Precondition, Record, UnitOfWork};

/// Service for requesting parties
#[derive(Clone)]
pub struct ClientService {
    store: Arc<dyn MoveStore>,
}

impl ClientService {
    pub fn new(store: Arc<dyn MoveStore>) -> Self {
        Self { store }
    }

    pub async fn create(&self, request: CreateClientRequest) -> ApiResult<Client> {
        request.validate()?;
        self.ensure_email_free(&request.email, None).await?;

        let now = Utc::now();
        let client = Client {
            id: Uuid::new_v4(),
            first_name: request.first_name,
            last_name: request.last_name,
            email: normalize_email(&request.email),
            phone: request.phone,
            anonymized_at: None,
            created_at: now,
            updated_at: now,
        };

        self.store
            .commit(UnitOfWork::new().save(Record::Client(client.clone())))
            .await?;

        tracing::info!(client_id = %client.id, "Client created");
        Ok(client)
    }

    /// Clients stay readable by id after anonymization
    pub async fn get(&self, client_id: Uuid) -> ApiResult<Client> {
        self.store
            .get_client(client_id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("client {} not found", client_id)))
    }

    pub async fn list(
        &self,
        filter: &ClientFilter,
        page: PageRequest,
    ) -> ApiResult<PaginatedResponse<Client>> {
        Ok(self.store.list_clients(filter, page).await?)
    }

    pub async fn update(&self, client_id: Uuid, patch: ClientPatch) -> ApiResult<Client> {
        patch.validate()?;
        let mut client = self.active(client_id).await?;

        if let Some(email) = patch.email {
            let email = normalize_email(&email);
            if email != client.email {
                self.ensure_email_free(&email, Some(client_id)).await?;
                client.email = email;
            }
        }
        if let Some(first_name) = patch.first_name {
            client.first_name = first_name;
        }
        if let Some(last_name) = patch.last_name {
            client.last_name = last_name;
        }
        if let Some(phone) = patch.phone {
            client.phone = Some(phone);
        }
        client.updated_at = Utc::now();

        self.store
            .commit(
                UnitOfWork::new()
                    .require(Precondition::ClientActive { client_id })
                    .save(Record::Client(client.clone())),
            )
            .await?;

        tracing::info!(client_id = %client_id, "Client updated");
        Ok(client)
    }

    /// Irreversibly scrub personal fields; id and folders are preserved
    pub async fn anonymize(&self, client_id: Uuid) -> ApiResult<Client> {
        let mut client = self.active(client_id).await?;
        client.scrub(Utc::now());

        self.store
            .commit(
                UnitOfWork::new()
                    .require(Precondition::ClientActive { client_id })
                    .save(Record::Client(client.clone())),
            )
            .await?;

        tracing::info!(client_id = %client_id, "Client anonymized");
        Ok(client)
    }

    /// Live folders owned by the client
    pub async fn folders(
        &self,
        client_id: Uuid,
        page: PageRequest,
    ) -> ApiResult<PaginatedResponse<Folder>> {
        self.get(client_id).await?;
        let filter = FolderFilter {
            client_id: Some(client_id),
            status: None,
        };
        Ok(self.store.list_folders(&filter, page).await?)
    }

    async fn active(&self, client_id: Uuid) -> ApiResult<Client> {
        let client = self.get(client_id).await?;
        if client.is_anonymized() {
            return Err(ApiError::BadRequest(format!(
                "client {} is anonymized",
                client_id
            )));
        }
        Ok(client)
    }

    async fn ensure_email_free(&self, email: &str, owner: Option<Uuid>) -> ApiResult<()> {
        match self.store.find_client_by_email(email).await? {
            Some(existing) if Some(existing.id) != owner => Err(ApiError::Conflict(format!(
                "client email '{}' already in use",
                normalize_email(email)
            ))),
            _ => Ok(()),
        }
    }
}
