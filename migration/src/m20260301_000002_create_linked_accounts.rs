use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // One row per tenant user. Tokens are AES-256-GCM ciphertext written by the
        // application. Disconnecting clears is_active; rows are never deleted.
        let create_table_sql = r#"
            CREATE TABLE IF NOT EXISTS clinic_portal.linked_accounts (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                tenant_id VARCHAR(255) NOT NULL,
                user_id VARCHAR(255) NOT NULL,

                external_email VARCHAR(255) NOT NULL,
                access_token TEXT NOT NULL,
                refresh_token TEXT,
                expires_at TIMESTAMPTZ NOT NULL,

                connected_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                disconnected_at TIMESTAMPTZ,
                is_active BOOLEAN NOT NULL DEFAULT TRUE,

                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

                CONSTRAINT linked_accounts_tenant_user_key UNIQUE (tenant_id, user_id)
            )
        "#;

        manager
            .get_connection()
            .execute_unprepared(create_table_sql)
            .await?;

        manager
            .get_connection()
            .execute_unprepared(
                "CREATE INDEX IF NOT EXISTS idx_linked_accounts_active
                 ON clinic_portal.linked_accounts(tenant_id, user_id)
                 WHERE is_active",
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared("DROP TABLE IF EXISTS clinic_portal.linked_accounts")
            .await?;

        Ok(())
    }
}
