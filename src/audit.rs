//! Audit trail written after each business transaction commits.

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde_json::Value;
use uuid::Uuid;

use crate::{
    entity::{
        AuditLogs,
        audit_logs::{ActiveModel as AuditActive, Column as AuditCol, Model as AuditModel},
    },
    error::AppResult,
};

pub async fn log_audit<C: ConnectionTrait>(
    conn: &C,
    user_id: Option<Uuid>,
    action: &str,
    resource: Option<&str>,
    metadata: Option<Value>,
) -> AppResult<()> {
    let order_id = metadata
        .as_ref()
        .and_then(|m| m.get("order_id"))
        .and_then(Value::as_str)
        .and_then(|id| Uuid::parse_str(id).ok());

    AuditActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        order_id: Set(order_id),
        action: Set(action.to_string()),
        resource: Set(resource.map(str::to_string)),
        metadata: Set(metadata),
        created_at: Set(Utc::now().into()),
    }
    .insert(conn)
    .await?;

    Ok(())
}

/// Audit writes happen after the business transaction has committed; a
/// failure is logged and otherwise ignored.
pub async fn record<C: ConnectionTrait>(
    conn: &C,
    user_id: Option<Uuid>,
    action: &str,
    resource: &str,
    metadata: Value,
) {
    if let Err(err) = log_audit(conn, user_id, action, Some(resource), Some(metadata)).await {
        tracing::warn!(error = %err, action, "audit log failed");
    }
}

/// History of one order, oldest first.
pub async fn for_order<C: ConnectionTrait>(conn: &C, order_id: Uuid) -> AppResult<Vec<AuditModel>> {
    let entries = AuditLogs::find()
        .filter(AuditCol::OrderId.eq(order_id))
        .order_by_asc(AuditCol::CreatedAt)
        .all(conn)
        .await?;
    Ok(entries)
}
