//! Migration: Create gpu_instances registry table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(GpuInstances::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(GpuInstances::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(GpuInstances::InstanceId)
                            .big_integer()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(GpuInstances::InstanceUuid)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(GpuInstances::Nickname).string().not_null())
                    .col(ColumnDef::new(GpuInstances::TargetUrl).string().null())
                    // Unique: one instance per user
                    .col(
                        ColumnDef::new(GpuInstances::AssignedUserId)
                            .integer()
                            .null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(GpuInstances::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(GpuInstances::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(GpuInstances::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum GpuInstances {
    Table,
    Id,
    InstanceId,
    InstanceUuid,
    Nickname,
    TargetUrl,
    AssignedUserId,
    CreatedAt,
    UpdatedAt,
}
