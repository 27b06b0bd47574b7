use std::sync::Arc;

use chrono::Utc;
use validator::Validate;

use crate::actor::model::{RegisterUserRequest, User, UserRole};
use crate::error::{ApiError, ApiResult};
use crate::store::{MoveStore, Precondition, Record, UnitOfWork};

/// Resolves actor ids to users and enforces role checks
#[derive(Clone)]
pub struct ActorDirectory {
    store: Arc<dyn MoveStore>,
}

impl ActorDirectory {
    pub fn new(store: Arc<dyn MoveStore>) -> Self {
        Self { store }
    }

    /// Add a user to the directory; only administrators may
    pub async fn register(&self, actor_id: &str, request: RegisterUserRequest) -> ApiResult<User> {
        self.require(actor_id, "register users", |role| *role == UserRole::Admin)
            .await?;
        self.insert(request).await
    }

    /// Seed the first administrator, leaving an existing one untouched
    pub async fn bootstrap_admin(&self, id: &str, email: &str) -> ApiResult<User> {
        if let Some(existing) = self.store.get_user(id).await? {
            if existing.role != UserRole::Admin {
                return Err(ApiError::Conflict(format!(
                    "bootstrap admin '{}' exists with role '{}'",
                    id,
                    existing.role.as_str()
                )));
            }
            return Ok(existing);
        }

        self.insert(RegisterUserRequest {
            id: id.to_string(),
            email: email.to_string(),
            name: Some("Administrator".to_string()),
            role: UserRole::Admin,
            mover_id: None,
        })
        .await
    }

    async fn insert(&self, request: RegisterUserRequest) -> ApiResult<User> {
        request.validate()?;
        if request.id.trim().is_empty() {
            return Err(ApiError::BadRequest("user id must not be empty".to_string()));
        }

        let user = User {
            id: request.id,
            email: request.email.trim().to_lowercase(),
            name: request.name,
            role: request.role,
            mover_id: request.mover_id,
            created_at: Utc::now(),
        };

        self.store
            .commit(
                UnitOfWork::new()
                    .require(Precondition::UserIdFree {
                        user_id: user.id.clone(),
                    })
                    .save(Record::User(user.clone())),
            )
            .await?;

        tracing::info!(user_id = %user.id, role = user.role.as_str(), "User registered");
        Ok(user)
    }

    /// Look up the actor; unknown actors cannot perform role-gated actions
    pub async fn resolve(&self, actor_id: &str) -> ApiResult<User> {
        self.store
            .get_user(actor_id)
            .await?
            .ok_or_else(|| ApiError::Forbidden(format!("unknown actor '{}'", actor_id)))
    }

    /// Resolve the actor and check the role predicate
    pub async fn require(
        &self,
        actor_id: &str,
        action: &str,
        allowed: fn(&UserRole) -> bool,
    ) -> ApiResult<User> {
        let user = self.resolve(actor_id).await?;
        if !allowed(&user.role) {
            tracing::warn!(actor = %actor_id, role = user.role.as_str(), action, "Role check refused");
            return Err(ApiError::Forbidden(format!(
                "role '{}' may not {}",
                user.role.as_str(),
                action
            )));
        }
        Ok(user)
    }
}
