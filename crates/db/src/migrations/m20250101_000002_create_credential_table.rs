//! Create credential table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Credential::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Credential::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Credential::UserId).string_len(32).not_null())
                    .col(ColumnDef::new(Credential::Name).string_len(100).not_null())
                    .col(ColumnDef::new(Credential::Login).string_len(256))
                    .col(ColumnDef::new(Credential::Secret).text().not_null())
                    .col(
                        ColumnDef::new(Credential::Favorite)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Credential::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Credential::UpdatedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_credential_user")
                            .from(Credential::Table, Credential::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_credential_user_id")
                    .table(Credential::Table)
                    .col(Credential::UserId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Credential::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Credential {
    Table,
    Id,
    UserId,
    Name,
    Login,
    Secret,
    Favorite,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
pub enum User {
    Table,
    Id,
}
