//! Accounting entity lookup trait with in-memory and PostgreSQL
//! implementations.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::EntityId;
use sqlx::PgPool;
use thiserror::Error;
use tokio::sync::RwLock;

/// Errors raised by an entity directory.
#[derive(Debug, Error)]
pub enum EntityLookupError {
    #[error("Entity directory unavailable: {0}")]
    Unavailable(String),
}

/// Trait for resolving the accounting prefix of an entity.
#[async_trait]
pub trait EntityDirectory: Send + Sync {
    /// Returns the entity's accounting prefix, or `None` if the entity is
    /// unknown or has none configured.
    async fn accounting_prefix(
        &self,
        entity: &EntityId,
    ) -> Result<Option<String>, EntityLookupError>;

    /// Registers an entity, replacing its prefix if it is already known.
    async fn register_entity(
        &self,
        entity: &EntityId,
        accounting_prefix: Option<String>,
    ) -> Result<(), EntityLookupError>;
}

#[derive(Debug, Default)]
struct InMemoryEntityState {
    prefixes: HashMap<EntityId, String>,
    fail_on_lookup: bool,
}

/// In-memory entity directory for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEntityDirectory {
    state: Arc<RwLock<InMemoryEntityState>>,
}

impl InMemoryEntityDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an entity with an accounting prefix.
    pub async fn insert(&self, entity: EntityId, prefix: impl Into<String>) {
        self.state
            .write()
            .await
            .prefixes
            .insert(entity, prefix.into());
    }

    /// Configures the directory to fail every lookup.
    pub async fn set_fail_on_lookup(&self, fail: bool) {
        self.state.write().await.fail_on_lookup = fail;
    }
}

#[async_trait]
impl EntityDirectory for InMemoryEntityDirectory {
    async fn accounting_prefix(
        &self,
        entity: &EntityId,
    ) -> Result<Option<String>, EntityLookupError> {
        let state = self.state.read().await;

        if state.fail_on_lookup {
            return Err(EntityLookupError::Unavailable(format!(
                "lookup of entity {entity} failed"
            )));
        }

        Ok(state
            .prefixes
            .get(entity)
            .filter(|prefix| !prefix.is_empty())
            .cloned())
    }

    async fn register_entity(
        &self,
        entity: &EntityId,
        accounting_prefix: Option<String>,
    ) -> Result<(), EntityLookupError> {
        self.insert(entity.clone(), accounting_prefix.unwrap_or_default())
            .await;
        Ok(())
    }
}

impl From<sqlx::Error> for EntityLookupError {
    fn from(e: sqlx::Error) -> Self {
        EntityLookupError::Unavailable(e.to_string())
    }
}

/// Entity directory reading the `entities` table.
#[derive(Clone)]
pub struct PostgresEntityDirectory {
    pool: PgPool,
}

impl PostgresEntityDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EntityDirectory for PostgresEntityDirectory {
    #[tracing::instrument(skip(self, entity), fields(entity = %entity))]
    async fn accounting_prefix(
        &self,
        entity: &EntityId,
    ) -> Result<Option<String>, EntityLookupError> {
        let prefix: Option<Option<String>> =
            sqlx::query_scalar("SELECT accounting_prefix FROM entities WHERE id = $1")
                .bind(entity.as_str())
                .fetch_optional(&self.pool)
                .await?;

        Ok(prefix.flatten().filter(|prefix| !prefix.is_empty()))
    }

    #[tracing::instrument(skip(self, entity), fields(entity = %entity))]
    async fn register_entity(
        &self,
        entity: &EntityId,
        accounting_prefix: Option<String>,
    ) -> Result<(), EntityLookupError> {
        sqlx::query(
            r#"
            INSERT INTO entities (id, accounting_prefix) VALUES ($1, $2)
            ON CONFLICT (id) DO UPDATE SET accounting_prefix = EXCLUDED.accounting_prefix
            "#,
        )
        .bind(entity.as_str())
        .bind(accounting_prefix)
        .execute(&self.pool)
        .await?;

        tracing::debug!("Entity registered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn known_entity_has_prefix() {
        let directory = InMemoryEntityDirectory::new();
        directory.insert(EntityId::from("acme"), "AC").await;

        let prefix = directory
            .accounting_prefix(&EntityId::from("acme"))
            .await
            .unwrap();
        assert_eq!(prefix.as_deref(), Some("AC"));
    }

    #[tokio::test]
    async fn unknown_or_blank_entity_has_none() {
        let directory = InMemoryEntityDirectory::new();
        directory.insert(EntityId::from("blank"), "").await;

        assert!(directory
            .accounting_prefix(&EntityId::from("blank"))
            .await
            .unwrap()
            .is_none());
        assert!(directory
            .accounting_prefix(&EntityId::from("nobody"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn registering_without_prefix_clears_it() {
        let directory = InMemoryEntityDirectory::new();
        let acme = EntityId::from("acme");
        directory
            .register_entity(&acme, Some("AC".to_string()))
            .await
            .unwrap();
        directory.register_entity(&acme, None).await.unwrap();

        assert!(directory.accounting_prefix(&acme).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn fail_on_lookup() {
        let directory = InMemoryEntityDirectory::new();
        directory.set_fail_on_lookup(true).await;

        let result = directory.accounting_prefix(&EntityId::from("acme")).await;
        assert!(matches!(result, Err(EntityLookupError::Unavailable(_))));
    }
}
