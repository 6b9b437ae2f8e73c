//! Create recording table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Recording::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Recording::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Recording::UserId).string_len(32).not_null())
                    .col(ColumnDef::new(Recording::Title).string_len(128).not_null())
                    .col(ColumnDef::new(Recording::BeatId).string_len(32).null())
                    .col(
                        ColumnDef::new(Recording::StorageKey)
                            .string_len(512)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Recording::Url).string_len(1024).not_null())
                    .col(
                        ColumnDef::new(Recording::ContentType)
                            .string_len(128)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Recording::Size).big_integer().not_null())
                    .col(
                        ColumnDef::new(Recording::LikesCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Recording::CommentsCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Recording::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_recording_user")
                            .from(Recording::Table, Recording::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_recording_beat")
                            .from(Recording::Table, Recording::BeatId)
                            .to(Beat::Table, Beat::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .check(Expr::col(Recording::LikesCount).gte(0))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_recording_user_id")
                    .table(Recording::Table)
                    .col(Recording::UserId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Recording::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Recording {
    Table,
    Id,
    UserId,
    Title,
    BeatId,
    StorageKey,
    Url,
    ContentType,
    Size,
    LikesCount,
    CommentsCount,
    CreatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}

#[derive(Iden)]
enum Beat {
    Table,
    Id,
}
