use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Append-only log. The geo_* columns are the only ones ever updated
        // after insert, by the enrichment worker.
        manager
            .create_table(
                Table::create()
                    .table(AuditLogEntries::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AuditLogEntries::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(AuditLogEntries::ActorId).string().null())
                    .col(ColumnDef::new(AuditLogEntries::Action).string().not_null())
                    .col(
                        ColumnDef::new(AuditLogEntries::ResourceType)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(AuditLogEntries::ResourceId).string().null())
                    .col(ColumnDef::new(AuditLogEntries::Detail).text().not_null())
                    .col(ColumnDef::new(AuditLogEntries::IpAddress).string().null())
                    .col(ColumnDef::new(AuditLogEntries::UserAgent).string().null())
                    .col(ColumnDef::new(AuditLogEntries::GeoCountry).string().null())
                    .col(ColumnDef::new(AuditLogEntries::GeoCity).string().null())
                    .col(ColumnDef::new(AuditLogEntries::GeoRegion).string().null())
                    .col(ColumnDef::new(AuditLogEntries::GeoLatitude).double().null())
                    .col(
                        ColumnDef::new(AuditLogEntries::GeoLongitude)
                            .double()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(AuditLogEntries::CreatedAt)
                            .string()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_audit_log_entries_created_at")
                    .table(AuditLogEntries::Table)
                    .col((AuditLogEntries::CreatedAt, IndexOrder::Desc))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_audit_log_entries_actor_id")
                    .table(AuditLogEntries::Table)
                    .col(AuditLogEntries::ActorId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_audit_log_entries_ip_address")
                    .table(AuditLogEntries::Table)
                    .col(AuditLogEntries::IpAddress)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AuditLogEntries::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum AuditLogEntries {
    Table,
    Id,
    ActorId,
    Action,
    ResourceType,
    ResourceId,
    Detail,
    IpAddress,
    UserAgent,
    GeoCountry,
    GeoCity,
    GeoRegion,
    GeoLatitude,
    GeoLongitude,
    CreatedAt,
}
