use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(DownloadCodes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DownloadCodes::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(DownloadCodes::Code)
                            .string_len(50)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(DownloadCodes::IsUsed)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(DownloadCodes::UsedIp).string_len(100))
                    .col(ColumnDef::new(DownloadCodes::UsedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(DownloadCodes::Attempts)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(DownloadCodes::LastAttemptAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(DownloadCodes::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // Capability resolution scans for the most recent redemption by address.
        manager
            .create_index(
                Index::create()
                    .table(DownloadCodes::Table)
                    .col(DownloadCodes::UsedIp)
                    .col(DownloadCodes::UsedAt)
                    .name("idx_download_codes_used_ip_used_at")
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(DownloadCodes::Table)
                    .col(DownloadCodes::IsUsed)
                    .name("idx_download_codes_is_used")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(DownloadCodes::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum DownloadCodes {
    Table,
    Id,
    Code,
    IsUsed,
    UsedIp,
    UsedAt,
    Attempts,
    LastAttemptAt,
    CreatedAt,
}
