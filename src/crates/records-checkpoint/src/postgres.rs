//! Postgres-backed [`CheckpointSaver`].

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{postgres::PgPoolOptions, PgPool, Row};

use crate::error::{CheckpointError, Result};
use crate::traits::{CheckpointSaver, LoadedCheckpoint};

pub struct PgCheckpointSaver {
    pool: PgPool,
}

impl PgCheckpointSaver {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(20)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| CheckpointError::Backend(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }
}

#[async_trait]
impl CheckpointSaver for PgCheckpointSaver {
    async fn save(&self, thread_id: &str, node_name: &str, state_snapshot: Value) -> Result<String> {
        let row = sqlx::query(
            r#"
            INSERT INTO checkpoints (thread_id, checkpoint_id, node_name, state_snapshot, interrupt_value, updated_at)
            VALUES ($1, gen_random_uuid()::text, $2, $3, NULL, now())
            ON CONFLICT (thread_id) DO UPDATE SET
                checkpoint_id = gen_random_uuid()::text,
                node_name = EXCLUDED.node_name,
                state_snapshot = EXCLUDED.state_snapshot,
                interrupt_value = NULL,
                updated_at = now()
            RETURNING checkpoint_id
            "#,
        )
        .bind(thread_id)
        .bind(node_name)
        .bind(state_snapshot)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.try_get("checkpoint_id")?)
    }

    async fn load(&self, thread_id: &str) -> Result<Option<LoadedCheckpoint>> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query(
            "SELECT node_name, state_snapshot, interrupt_value FROM checkpoints WHERE thread_id = $1 FOR UPDATE",
        )
        .bind(thread_id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(row) = row else {
            tx.commit().await?;
            return Ok(None);
        };
        let interrupt_value: Option<Value> = row.try_get("interrupt_value")?;
        if interrupt_value.is_some() {
            sqlx::query("UPDATE checkpoints SET interrupt_value = NULL WHERE thread_id = $1")
                .bind(thread_id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(Some(LoadedCheckpoint {
            node_name: row.try_get("node_name")?,
            state_snapshot: row.try_get("state_snapshot")?,
            interrupt_value,
        }))
    }

    async fn resume(&self, thread_id: &str, injected_value: Value) -> Result<(String, Value)> {
        let row = sqlx::query(
            "UPDATE checkpoints SET interrupt_value = $2, updated_at = now() WHERE thread_id = $1 RETURNING node_name, state_snapshot",
        )
        .bind(thread_id)
        .bind(injected_value)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| CheckpointError::NotFound(thread_id.to_string()))?;
        Ok((row.try_get("node_name")?, row.try_get("state_snapshot")?))
    }

    async fn delete_thread(&self, thread_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM checkpoints WHERE thread_id = $1")
            .bind(thread_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
