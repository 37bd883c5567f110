use serde::{Deserialize, Serialize};
use std::sync::Arc;
use warp::Filter;
use warp::http::StatusCode;
use warp::reply::{Json, WithStatus};

use crate::config::Config;
use crate::deck_service::DeckService;
use deck_core::parse_card_list;
use deck_types::{Card, CardView, DrawResponse, ErrorResponse};

pub mod config;
pub mod deck_service;

const DRAWN_PILE: u8 = 0;
const COMING_PILE: u8 = 1;

#[derive(Deserialize)]
struct AddCardsQuery {
    cards: Option<String>,
}

pub fn create_routes(
    deck_service: Arc<DeckService>,
    config: Arc<Config>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let deck_service_filter = warp::any().map({
        let deck_service = deck_service.clone();
        move || deck_service.clone()
    });

    let config_filter = warp::any().map({
        let config = config.clone();
        move || config.clone()
    });

    // Health check endpoint
    let health = warp::path!("health")
        .and(warp::get())
        .map(|| warp::reply::with_status("OK", StatusCode::OK));

    // /deck/new[/{packs}[/jokers]]
    let new_deck = warp::path!("deck" / "new")
        .map(|| (1u32, false))
        .untuple_one()
        .or(warp::path!("deck" / "new" / u32)
            .map(|packs: u32| (packs, false))
            .untuple_one())
        .unify()
        .or(warp::path!("deck" / "new" / u32 / "jokers")
            .map(|packs: u32| (packs, true))
            .untuple_one())
        .unify()
        .and(warp::get())
        .and(deck_service_filter.clone())
        .and(config_filter.clone())
        .and_then(handle_new_deck);

    // /deck/{id}/add?cards=1h,10s,xs
    let add_cards = warp::path!("deck" / String / "add")
        .and(warp::get())
        .and(warp::query::<AddCardsQuery>())
        .and(deck_service_filter.clone())
        .and_then(handle_add_cards);

    // /deck/{id}/draw[/{count}]
    let draw = warp::path!("deck" / String / "draw" / u64)
        .or(warp::path!("deck" / String / "draw")
            .map(|deck_id: String| (deck_id, 1u64))
            .untuple_one())
        .unify()
        .and(warp::get())
        .and(deck_service_filter.clone())
        .and_then(handle_draw);

    let shuffle = warp::path!("deck" / String / "shuffle")
        .and(warp::get())
        .and(deck_service_filter.clone())
        .and_then(handle_shuffle);

    // /deck/{id}/show/{0 = drawn, 1 = coming}[/{count}]
    let show = warp::path!("deck" / String / "show" / u8 / u64)
        .or(warp::path!("deck" / String / "show" / u8)
            .map(|deck_id: String, pile: u8| (deck_id, pile, 1u64))
            .untuple_one())
        .unify()
        .and(warp::get())
        .and(deck_service_filter.clone())
        .and_then(handle_show);

    let cors = warp::cors()
        .allow_any_origin()
        .allow_headers(vec!["content-type"])
        .allow_methods(vec!["GET"]);

    health
        .or(new_deck)
        .or(add_cards)
        .or(draw)
        .or(shuffle)
        .or(show)
        .recover(handle_rejection)
        .with(cors)
        .with(warp::log("deck_server"))
}

fn json_reply<T: Serialize>(body: &T, status: StatusCode) -> WithStatus<Json> {
    warp::reply::with_status(warp::reply::json(body), status)
}

fn invalid_request(message: &str) -> WithStatus<Json> {
    json_reply(&ErrorResponse::new(message), StatusCode::BAD_REQUEST)
}

fn storage_failure(action: &str, err: impl std::fmt::Display) -> WithStatus<Json> {
    tracing::error!("Failed to {}: {}", action, err);
    json_reply(
        &ErrorResponse::new(format!("Failed to {}", action)),
        StatusCode::INTERNAL_SERVER_ERROR,
    )
}

fn card_views(cards: &[Card]) -> Vec<CardView> {
    cards.iter().map(CardView::from).collect()
}

async fn handle_new_deck(
    pack_count: u32,
    include_jokers: bool,
    deck_service: Arc<DeckService>,
    config: Arc<Config>,
) -> Result<impl warp::Reply, warp::Rejection> {
    if pack_count == 0 || pack_count > config.max_packs_per_deck {
        return Ok(invalid_request(&format!(
            "Pack count must be between 1 and {}",
            config.max_packs_per_deck
        )));
    }

    match deck_service.create_deck(pack_count, include_jokers).await {
        Ok(deck_id) => Ok(json_reply(
            &deck_service.deck_summary(&deck_id).await,
            StatusCode::OK,
        )),
        Err(err) => Ok(storage_failure("create deck", err)),
    }
}

async fn handle_add_cards(
    deck_id: String,
    query: AddCardsQuery,
    deck_service: Arc<DeckService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    if !deck_service.deck_exists(&deck_id).await {
        return Ok(invalid_request("Unknown deck"));
    }

    let Some(codes) = query.cards.filter(|codes| !codes.is_empty()) else {
        return Ok(invalid_request("Missing cards parameter"));
    };

    // Decode everything first so a bad code leaves the deck untouched
    let cards = match parse_card_list(&codes) {
        Ok(cards) => cards,
        Err(err) => return Ok(invalid_request(&err.to_string())),
    };

    for card in cards {
        if let Err(err) = deck_service.add_card(&deck_id, card).await {
            return Ok(storage_failure("add card", err));
        }
    }

    Ok(json_reply(
        &deck_service.deck_summary(&deck_id).await,
        StatusCode::OK,
    ))
}

async fn handle_draw(
    deck_id: String,
    count: u64,
    deck_service: Arc<DeckService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    if !deck_service.deck_exists(&deck_id).await {
        return Ok(invalid_request("Unknown deck"));
    }

    let cards = match deck_service.draw_cards(&deck_id, count).await {
        Ok(cards) => cards,
        Err(err) => return Ok(storage_failure("draw cards", err)),
    };

    let remaining = deck_service.remaining_cards(&deck_id).await;
    let error = (remaining == 0 && (cards.len() as u64) < count)
        .then(|| "Deck is empty".to_string());

    let response = DrawResponse {
        deck_id,
        cards: card_views(&cards),
        remaining,
        error,
    };
    Ok(json_reply(&response, StatusCode::OK))
}

async fn handle_shuffle(
    deck_id: String,
    deck_service: Arc<DeckService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    if !deck_service.deck_exists(&deck_id).await {
        return Ok(invalid_request("Unknown deck"));
    }

    match deck_service.shuffle_deck(&deck_id).await {
        Ok(()) => Ok(json_reply(
            &deck_service.deck_summary(&deck_id).await,
            StatusCode::OK,
        )),
        Err(err) => Ok(storage_failure("shuffle deck", err)),
    }
}

async fn handle_show(
    deck_id: String,
    pile: u8,
    count: u64,
    deck_service: Arc<DeckService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    if !deck_service.deck_exists(&deck_id).await {
        return Ok(invalid_request("Unknown deck"));
    }

    let cards = match pile {
        DRAWN_PILE => deck_service.drawn_cards(&deck_id, count).await,
        COMING_PILE => deck_service.coming_cards(&deck_id, count).await,
        _ => return Ok(invalid_request("Pile must be 0 (drawn) or 1 (coming)")),
    };

    match cards {
        Ok(cards) => {
            let response = DrawResponse {
                remaining: deck_service.remaining_cards(&deck_id).await,
                deck_id,
                cards: card_views(&cards),
                error: None,
            };
            Ok(json_reply(&response, StatusCode::OK))
        }
        Err(err) => Ok(storage_failure("show cards", err)),
    }
}

async fn handle_rejection(rejection: warp::Rejection) -> Result<impl warp::Reply, warp::Rejection> {
    if rejection.is_not_found() {
        Ok(json_reply(&ErrorResponse::new("Not found"), StatusCode::NOT_FOUND))
    } else {
        Ok(invalid_request("Invalid request"))
    }
}
