//! Append-only trail of state changes, written with plain sqlx.

use serde_json::Value;
use uuid::Uuid;

use crate::{db::DbPool, error::AppResult};

#[derive(Debug, Clone)]
pub struct AuditEntry<'a> {
    pub user_id: Option<Uuid>,
    pub action: &'a str,
    pub resource: &'a str,
    pub metadata: Value,
}

/// Insert one entry and return its id.
pub async fn insert(pool: &DbPool, entry: &AuditEntry<'_>) -> AppResult<Uuid> {
    let (id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO audit_logs (id, user_id, action, resource, metadata)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(entry.user_id)
    .bind(entry.action)
    .bind(entry.resource)
    .bind(&entry.metadata)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Record a change that already committed. A failed write is logged, never returned.
pub async fn record(pool: &DbPool, user_id: Uuid, action: &str, resource: &str, metadata: Value) {
    let entry = AuditEntry {
        user_id: Some(user_id),
        action,
        resource,
        metadata,
    };
    if let Err(err) = insert(pool, &entry).await {
        tracing::warn!(error = %err, action, user_id = %user_id, "audit log failed");
    }
}
