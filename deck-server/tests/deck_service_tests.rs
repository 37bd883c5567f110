
use deck_types::Card;
use futures::future::join_all;
use std::collections::HashSet;
use test_helpers::*;

#[tokio::test]
async fn test_single_pack_deck_has_52_cards() {
    let setup = TestDeckSetup::new().await;
    let deck_id = setup.new_deck(1, false).await;

    assert_eq!(setup.deck_service.remaining_cards(&deck_id).await, 52);

    let codes = setup.undrawn_codes(&deck_id).await;
    assert_eq!(codes.len(), 52);
    assert_eq!(codes.iter().collect::<HashSet<_>>().len(), 52);
}

#[tokio::test]
async fn test_two_pack_deck_with_jokers_has_108_cards() {
    let setup = TestDeckSetup::new().await;
    let deck_id = setup.new_deck(2, true).await;

    assert_eq!(setup.deck_service.remaining_cards(&deck_id).await, 108);

    let codes = setup.undrawn_codes(&deck_id).await;
    assert_eq!(codes.iter().filter(|code| code.as_str() == "xh").count(), 2);
    assert_eq!(codes.iter().filter(|code| code.as_str() == "xs").count(), 2);
}

#[tokio::test]
async fn test_drawing_past_the_end_returns_nothing() {
    let setup = TestDeckSetup::new().await;
    let deck_id = setup.new_deck(1, false).await;

    let drawn = setup.deck_service.draw_cards(&deck_id, 52).await.unwrap();
    assert_eq!(drawn.len(), 52);

    let drawn = setup.deck_service.draw_cards(&deck_id, 1).await.unwrap();
    assert!(drawn.is_empty());
    assert_eq!(setup.deck_service.remaining_cards(&deck_id).await, 0);
}

#[tokio::test]
async fn test_shuffle_keeps_the_same_undrawn_cards() {
    let setup = TestDeckSetup::new().await;
    let deck_id = setup.new_deck(1, true).await;
    setup.deck_service.draw_cards(&deck_id, 7).await.unwrap();

    let before = setup.undrawn_codes(&deck_id).await;
    setup.deck_service.shuffle_deck(&deck_id).await.unwrap();
    let after = setup.undrawn_codes(&deck_id).await;

    assert_eq!(before, after);
    assert_eq!(after.len(), 47);
}

#[tokio::test]
async fn test_deck_exists_before_and_after_creation() {
    let setup = TestDeckSetup::with_deck_ids(&["fresh-deck"]).await;

    assert!(!setup.deck_service.deck_exists("fresh-deck").await);
    let deck_id = setup.new_deck(1, false).await;
    assert_eq!(deck_id, "fresh-deck");
    assert!(setup.deck_service.deck_exists("fresh-deck").await);
}

#[tokio::test]
async fn test_taken_deck_id_is_regenerated() {
    let setup = TestDeckSetup::with_deck_ids(&["taken", "taken", "free"]).await;
    setup.storage.create_deck("taken").await.unwrap();

    let deck_id = setup.new_deck(1, false).await;
    assert_eq!(deck_id, "free");
    assert_eq!(setup.deck_service.remaining_cards("taken").await, 0);
    assert_eq!(setup.deck_service.remaining_cards("free").await, 52);
}

#[tokio::test]
async fn test_remaining_drops_by_cards_actually_drawn() {
    let setup = TestDeckSetup::new().await;
    let deck_id = setup.new_deck(1, false).await;
    setup.deck_service.shuffle_deck(&deck_id).await.unwrap();

    for count in [5u64, 20, 0, 30, 10] {
        let before = setup.deck_service.remaining_cards(&deck_id).await;
        let drawn = setup.deck_service.draw_cards(&deck_id, count).await.unwrap();
        let after = setup.deck_service.remaining_cards(&deck_id).await;

        assert_eq!(drawn.len() as u64, count.min(before));
        assert_eq!(before - after, count.min(before));
    }
    assert_eq!(setup.deck_service.remaining_cards(&deck_id).await, 0);
}

#[tokio::test]
async fn test_split_draws_match_single_draw_order() {
    let setup = TestDeckSetup::new().await;
    let deck_id = setup.new_deck(1, false).await;
    setup.deck_service.shuffle_deck(&deck_id).await.unwrap();

    let preview = setup.deck_service.coming_cards(&deck_id, 12).await.unwrap();
    let first = setup.deck_service.draw_cards(&deck_id, 5).await.unwrap();
    let second = setup.deck_service.draw_cards(&deck_id, 7).await.unwrap();

    let combined: Vec<Card> = first.iter().chain(second.iter()).copied().collect();
    assert_eq!(combined, preview);

    let history = setup.deck_service.drawn_cards(&deck_id, 12).await.unwrap();
    assert_eq!(history, combined);

    let latest = setup.deck_service.drawn_cards(&deck_id, 7).await.unwrap();
    assert_eq!(latest, second);
}

#[tokio::test]
async fn test_positions_unique_after_adds_and_shuffle() {
    let setup = TestDeckSetup::new().await;
    let deck_id = setup.new_deck(1, false).await;

    for _ in 0..6 {
        setup
            .deck_service
            .add_card(&deck_id, Card::red_joker())
            .await
            .unwrap();
    }
    setup.deck_service.draw_cards(&deck_id, 3).await.unwrap();
    setup.deck_service.shuffle_deck(&deck_id).await.unwrap();

    let positions = setup.undrawn_positions(&deck_id).await;
    assert_eq!(positions.len(), 55);
    assert!(all_distinct(&positions));
}

#[tokio::test]
async fn test_concurrent_add_cards_are_gapless() {
    let setup = TestDeckSetup::new().await;
    let deck_id = setup.new_deck(1, false).await;
    let previous_max = setup.storage.highest_position(&deck_id).await.unwrap();

    let adds = (0..30).map(|_| {
        let deck_service = setup.deck_service.clone();
        let deck_id = deck_id.clone();
        tokio::spawn(async move { deck_service.add_card(&deck_id, Card::black_joker()).await })
    });

    let mut positions: Vec<i64> = join_all(adds)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .collect();
    positions.sort();

    let expected: Vec<i64> = (previous_max + 1..=previous_max + 30).collect();
    assert_eq!(positions, expected);
    assert!(all_distinct(&setup.undrawn_positions(&deck_id).await));
    assert_eq!(setup.deck_service.remaining_cards(&deck_id).await, 82);
}

#[tokio::test]
async fn test_concurrent_draws_never_share_a_card() {
    let setup = TestDeckSetup::new().await;
    let deck_id = setup.new_deck(1, false).await;
    setup.deck_service.shuffle_deck(&deck_id).await.unwrap();

    let draws = (0..10).map(|_| {
        let deck_service = setup.deck_service.clone();
        let deck_id = deck_id.clone();
        tokio::spawn(async move { deck_service.draw_cards(&deck_id, 6).await })
    });

    let hands: Vec<Vec<Card>> = join_all(draws)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .collect();

    let all_cards: Vec<Card> = hands.iter().flatten().copied().collect();
    assert_eq!(all_cards.len(), 52);
    assert_eq!(all_cards.iter().collect::<HashSet<_>>().len(), 52);
    assert_eq!(setup.deck_service.remaining_cards(&deck_id).await, 0);
}

#[tokio::test]
async fn test_concurrent_deck_creation() {
    let setup = TestDeckSetup::new().await;

    let creations = (0..5).map(|packs| {
        let deck_service = setup.deck_service.clone();
        tokio::spawn(async move { deck_service.create_deck(packs + 1, false).await })
    });

    let deck_ids: Vec<String> = join_all(creations)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .collect();

    assert_eq!(deck_ids.iter().collect::<HashSet<_>>().len(), 5);
    for (index, deck_id) in deck_ids.iter().enumerate() {
        let expected = 52 * (index as u64 + 1);
        assert_eq!(setup.deck_service.remaining_cards(deck_id).await, expected);
    }
}

#[tokio::test]
async fn test_add_card_to_missing_deck_fails() {
    let setup = TestDeckSetup::new().await;

    let result = setup
        .deck_service
        .add_card("no-such-deck", Card::red_joker())
        .await;
    assert!(matches!(
        result,
        Err(deck_persistence::StorageError::ForeignKeyViolation(_))
    ));
}
