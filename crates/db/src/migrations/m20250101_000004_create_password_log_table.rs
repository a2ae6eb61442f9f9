//! Create password log table for credential change auditing.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PasswordLog::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PasswordLog::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PasswordLog::UserId).string_len(32).not_null())
                    // No foreign key: entries must survive deletion of the credential
                    .col(
                        ColumnDef::new(PasswordLog::CredentialId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PasswordLog::CredentialName)
                            .string_len(100)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PasswordLog::ActionType)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(ColumnDef::new(PasswordLog::FieldChanged).string_len(50))
                    .col(ColumnDef::new(PasswordLog::PreviousValue).string_len(256))
                    .col(ColumnDef::new(PasswordLog::NewValue).string_len(256))
                    .col(ColumnDef::new(PasswordLog::EncryptedPreviousValue).text())
                    .col(ColumnDef::new(PasswordLog::EncryptedNewValue).text())
                    .col(
                        ColumnDef::new(PasswordLog::ContainsSensitiveData)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(PasswordLog::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_password_log_user")
                            .from(PasswordLog::Table, PasswordLog::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: (user_id, created_at) for reverse-chronological history
        manager
            .create_index(
                Index::create()
                    .name("idx_password_log_user_created")
                    .table(PasswordLog::Table)
                    .col(PasswordLog::UserId)
                    .col(PasswordLog::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PasswordLog::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum PasswordLog {
    Table,
    Id,
    UserId,
    CredentialId,
    CredentialName,
    ActionType,
    FieldChanged,
    PreviousValue,
    NewValue,
    EncryptedPreviousValue,
    EncryptedNewValue,
    ContainsSensitiveData,
    CreatedAt,
}

#[derive(Iden)]
pub enum User {
    Table,
    Id,
}
