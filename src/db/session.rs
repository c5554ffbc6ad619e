// src/db/session.rs
// DOCUMENTATION: Unit of work over one database transaction
// PURPOSE: Stage inserts/deletes, flush them in order, commit atomically

use crate::config::DbEngine;
use crate::db::EntityRepository;
use crate::errors::StorageError;
use crate::models::{Entity, EntityKind};
use sqlx::{Any, AnyConnection, AnyPool, Transaction};

/// A change waiting for the next flush
#[derive(Debug, Clone)]
pub enum PendingChange {
    Upsert(Entity),
    Delete(EntityKind, String),
}

/// Session: staged changes plus the transaction they are flushed into
/// DOCUMENTATION: The transaction is opened lazily by the first flush or
/// read and ends with commit() or rollback(). Reads flush first, so a
/// caller always sees its own uncommitted work.
pub struct Session {
    pool: AnyPool,
    engine: DbEngine,
    tx: Option<Transaction<'static, Any>>,
    pending: Vec<PendingChange>,
}

impl Session {
    pub fn new(pool: AnyPool, engine: DbEngine) -> Self {
        Session {
            pool,
            engine,
            tx: None,
            pending: Vec::new(),
        }
    }

    pub fn stage(&mut self, change: PendingChange) {
        self.pending.push(change);
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    async fn begin(&mut self) -> Result<(), StorageError> {
        if self.tx.is_none() {
            let tx = self.pool.begin().await.map_err(|e| {
                log::error!("Failed to open transaction: {}", e);
                StorageError::Database(e)
            })?;
            self.tx = Some(tx);
        }
        Ok(())
    }

    /// Write every staged change into the open transaction
    /// DOCUMENTATION: On failure the transaction is rolled back and the
    /// remaining staged changes are discarded
    pub async fn flush(&mut self) -> Result<(), StorageError> {
        if self.pending.is_empty() {
            return Ok(());
        }

        self.begin().await?;
        let engine = self.engine;
        let changes = std::mem::take(&mut self.pending);
        let count = changes.len();

        let result = match self.tx.as_mut() {
            Some(tx) => Self::apply(&mut **tx, engine, changes).await,
            None => Err(StorageError::NoSession),
        };

        if let Err(e) = result {
            log::warn!("Flush failed, rolling back session: {}", e);
            self.rollback().await;
            return Err(e);
        }

        log::debug!("Flushed {} change(s)", count);
        Ok(())
    }

    async fn apply(
        conn: &mut AnyConnection,
        engine: DbEngine,
        changes: Vec<PendingChange>,
    ) -> Result<(), StorageError> {
        for change in changes {
            match change {
                PendingChange::Upsert(entity) => {
                    EntityRepository::upsert(&mut *conn, engine, &entity).await?;
                }
                PendingChange::Delete(kind, id) => {
                    EntityRepository::delete_cascade(&mut *conn, engine, kind, &id).await?;
                }
            }
        }
        Ok(())
    }

    /// Flush, then hand out the transaction connection for a read
    pub async fn connection(&mut self) -> Result<&mut AnyConnection, StorageError> {
        self.flush().await?;
        self.begin().await?;
        match self.tx.as_mut() {
            Some(tx) => Ok(&mut **tx),
            None => Err(StorageError::NoSession),
        }
    }

    /// Flush and commit everything done in this session
    pub async fn commit(&mut self) -> Result<(), StorageError> {
        self.flush().await?;

        if let Some(tx) = self.tx.take() {
            tx.commit().await.map_err(|e| {
                log::error!("Commit failed: {}", e);
                StorageError::Database(e)
            })?;
            log::debug!("Session committed");
        }
        Ok(())
    }

    /// Discard staged changes and roll back the open transaction
    pub async fn rollback(&mut self) {
        self.pending.clear();
        if let Some(tx) = self.tx.take() {
            if let Err(e) = tx.rollback().await {
                log::warn!("Rollback failed: {}", e);
            }
        }
    }
}
