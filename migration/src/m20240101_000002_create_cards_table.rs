use sea_orm_migration::prelude::*;

use crate::m20240101_000001_create_decks_table::Decks;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Cards::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Cards::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Cards::DeckId).string().not_null())
                    .col(ColumnDef::new(Cards::Rank).integer().not_null())
                    .col(ColumnDef::new(Cards::Suit).integer().not_null())
                    .col(ColumnDef::new(Cards::Position).big_integer().not_null())
                    .col(ColumnDef::new(Cards::DrawnAt).timestamp_with_time_zone().null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_cards_deck_id")
                            .from(Cards::Table, Cards::DeckId)
                            .to(Decks::Table, Decks::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // Draw and coming queries scan undrawn cards of one deck by position
        manager
            .create_index(
                Index::create()
                    .name("idx_cards_deck_position")
                    .table(Cards::Table)
                    .col(Cards::DeckId)
                    .col(Cards::Position)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_cards_deck_drawn_at")
                    .table(Cards::Table)
                    .col(Cards::DeckId)
                    .col(Cards::DrawnAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Cards::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Cards {
    Table,
    Id,
    DeckId,
    Rank,
    Suit,
    Position,
    DrawnAt,
}
