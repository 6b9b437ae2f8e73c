//! Create beat table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Beat::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Beat::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Beat::UserId).string_len(32).not_null())
                    .col(ColumnDef::new(Beat::Title).string_len(128).not_null())
                    .col(ColumnDef::new(Beat::Bpm).integer().null())
                    .col(ColumnDef::new(Beat::StorageKey).string_len(512).not_null())
                    .col(ColumnDef::new(Beat::Url).string_len(1024).not_null())
                    .col(ColumnDef::new(Beat::ContentType).string_len(128).not_null())
                    .col(ColumnDef::new(Beat::Size).big_integer().not_null())
                    .col(
                        ColumnDef::new(Beat::LikesCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Beat::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_beat_user")
                            .from(Beat::Table, Beat::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .check(Expr::col(Beat::LikesCount).gte(0))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_beat_user_id")
                    .table(Beat::Table)
                    .col(Beat::UserId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Beat::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Beat {
    Table,
    Id,
    UserId,
    Title,
    Bpm,
    StorageKey,
    Url,
    ContentType,
    Size,
    LikesCount,
    CreatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
