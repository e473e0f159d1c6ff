//! Queries for `clinic_portal.linked_accounts`.

use super::error::Error;
use chrono::{DateTime, Utc};
use entity::linked_accounts::{ActiveModel, Column, Entity, Model};
use entity::Id;
use log::*;
use sea_orm::{
    sea_query::{Expr, OnConflict},
    ActiveValue::Set,
    ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
};

/// Values written by an upsert. Token fields are already encrypted.
#[derive(Debug, Clone)]
pub struct LinkedAccountFields {
    pub external_email: String,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub connected_at: DateTime<Utc>,
}

/// Keeps the stored refresh token when the incoming row carries none.
const COALESCE_REFRESH_TOKEN: &str =
    "COALESCE(excluded.refresh_token, linked_accounts.refresh_token)";

/// Inserts or reactivates the linked account for `(tenant_id, user_id)` in a single
/// `INSERT ... ON CONFLICT ... DO UPDATE` statement.
///
/// On conflict the email, access token, expiry and connection time are replaced,
/// `disconnected_at` is cleared, `is_active` is forced to true and `refresh_token` is
/// coalesced with the existing value.
pub async fn upsert(
    db: &impl ConnectionTrait,
    tenant_id: &str,
    user_id: &str,
    fields: LinkedAccountFields,
) -> Result<Model, Error> {
    debug!("Upserting linked account for tenant {tenant_id} user {user_id}");

    let now = Utc::now();
    let active_model = ActiveModel {
        id: Set(Id::new_v4()),
        tenant_id: Set(tenant_id.to_string()),
        user_id: Set(user_id.to_string()),
        external_email: Set(fields.external_email),
        access_token: Set(fields.access_token),
        refresh_token: Set(fields.refresh_token),
        expires_at: Set(fields.expires_at.into()),
        connected_at: Set(fields.connected_at.into()),
        disconnected_at: Set(None),
        is_active: Set(true),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    };

    let on_conflict = OnConflict::columns([Column::TenantId, Column::UserId])
        .update_columns([
            Column::ExternalEmail,
            Column::AccessToken,
            Column::ExpiresAt,
            Column::ConnectedAt,
            Column::DisconnectedAt,
            Column::IsActive,
            Column::UpdatedAt,
        ])
        .value(Column::RefreshToken, Expr::cust(COALESCE_REFRESH_TOKEN))
        .to_owned();

    Ok(Entity::insert(active_model)
        .on_conflict(on_conflict)
        .exec_with_returning(db)
        .await?)
}

/// Finds the active linked account for a tenant user.
pub async fn find_active(
    db: &impl ConnectionTrait,
    tenant_id: &str,
    user_id: &str,
) -> Result<Option<Model>, Error> {
    Ok(Entity::find()
        .filter(Column::TenantId.eq(tenant_id))
        .filter(Column::UserId.eq(user_id))
        .filter(Column::IsActive.eq(true))
        .order_by_desc(Column::ConnectedAt)
        .one(db)
        .await?)
}

/// Marks the active linked account for a tenant user as disconnected.
///
/// Returns the number of rows changed; zero when nothing was active.
pub async fn deactivate(
    db: &impl ConnectionTrait,
    tenant_id: &str,
    user_id: &str,
    at: DateTime<Utc>,
) -> Result<u64, Error> {
    let result = Entity::update_many()
        .col_expr(Column::IsActive, Expr::value(false))
        .col_expr(Column::DisconnectedAt, Expr::value(at.fixed_offset()))
        .col_expr(Column::UpdatedAt, Expr::value(Utc::now().fixed_offset()))
        .filter(Column::TenantId.eq(tenant_id))
        .filter(Column::UserId.eq(user_id))
        .filter(Column::IsActive.eq(true))
        .exec(db)
        .await?;

    debug!(
        "Deactivated {} linked account(s) for tenant {tenant_id} user {user_id}",
        result.rows_affected
    );

    Ok(result.rows_affected)
}
