use sea_orm::entity::prelude::*;

/// One physical card. `drawn_at` is null while the card is still in its deck.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "cards")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub deck_id: String,
    pub rank: i32,
    pub suit: i32,
    pub position: i64,
    pub drawn_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::decks::Entity",
        from = "Column::DeckId",
        to = "super::decks::Column::Id"
    )]
    Deck,
}

impl Related<super::decks::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Deck.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
