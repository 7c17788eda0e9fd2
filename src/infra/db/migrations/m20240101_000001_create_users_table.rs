//! Migration: Create users table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Users::Username).string().not_null().unique_key())
                    .col(ColumnDef::new(Users::HashedPassword).string().not_null())
                    .col(ColumnDef::new(Users::Email).string().null().unique_key())
                    .col(ColumnDef::new(Users::Phone).string().null().unique_key())
                    .col(ColumnDef::new(Users::TargetUrl).string().null())
                    .col(
                        ColumnDef::new(Users::IsAdmin)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Users::State)
                            .string()
                            .not_null()
                            .default("inactive"),
                    )
                    .col(ColumnDef::new(Users::OwnerId).integer().null())
                    .col(ColumnDef::new(Users::InstanceId).big_integer().null())
                    .col(ColumnDef::new(Users::InstanceUuid).string().null())
                    .col(ColumnDef::new(Users::BearerToken).string().null())
                    .col(
                        ColumnDef::new(Users::LastHeartbeat)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Users::LastLogin)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Users::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Users::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // Ownership cap counts and per-admin listings
        manager
            .create_index(
                Index::create()
                    .name("idx_users_owner_id")
                    .table(Users::Table)
                    .col(Users::OwnerId)
                    .to_owned(),
            )
            .await?;

        // Inactivity sweep
        manager
            .create_index(
                Index::create()
                    .name("idx_users_state")
                    .table(Users::Table)
                    .col(Users::State)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Users {
    Table,
    Id,
    Username,
    HashedPassword,
    Email,
    Phone,
    TargetUrl,
    IsAdmin,
    State,
    OwnerId,
    InstanceId,
    InstanceUuid,
    BearerToken,
    LastHeartbeat,
    LastLogin,
    CreatedAt,
    UpdatedAt,
}
