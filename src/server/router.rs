use super::{chat, faq};
use crate::faq::FaqStore;
use crate::relay::Relay;
use axum::response::Json;
use axum::routing::{get, post, put};
use axum::Router;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;

#[derive(Clone)]
pub struct AppState {
    pub store: FaqStore,
    pub relay: Relay,
}

impl AppState {
    pub fn new(relay: Relay) -> Self {
        Self {
            store: relay.store().clone(),
            relay,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        // Streaming chat with FAQ function calling
        .route("/api/chat", post(chat::handle_chat))
        // FAQ management
        .route("/api/faq", get(faq::list_faqs).post(faq::create_faq))
        .route("/api/faq/{id}", put(faq::update_faq).delete(faq::delete_faq))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
