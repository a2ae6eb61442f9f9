//! Create login IP table for new-origin detection.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(LoginIp::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LoginIp::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(LoginIp::UserId).string_len(32).not_null())
                    // Long enough for a textual IPv6 address with an embedded IPv4 tail
                    .col(ColumnDef::new(LoginIp::IpAddress).string_len(45).not_null())
                    .col(ColumnDef::new(LoginIp::DeviceInfo).string_len(255))
                    .col(
                        ColumnDef::new(LoginIp::IsTrusted)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(LoginIp::FirstSeen)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(LoginIp::LastSeen)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_login_ip_user")
                            .from(LoginIp::Table, LoginIp::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: at most one row per (user_id, ip_address)
        manager
            .create_index(
                Index::create()
                    .name("idx_login_ip_user_ip")
                    .table(LoginIp::Table)
                    .col(LoginIp::UserId)
                    .col(LoginIp::IpAddress)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index: (user_id, last_seen) for the most-recent-first listing
        manager
            .create_index(
                Index::create()
                    .name("idx_login_ip_user_last_seen")
                    .table(LoginIp::Table)
                    .col(LoginIp::UserId)
                    .col(LoginIp::LastSeen)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(LoginIp::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum LoginIp {
    Table,
    Id,
    UserId,
    IpAddress,
    DeviceInfo,
    IsTrusted,
    FirstSeen,
    LastSeen,
}

#[derive(Iden)]
pub enum User {
    Table,
    Id,
}
