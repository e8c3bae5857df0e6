//! Synthesized audio served by reference

use std::num::NonZeroUsize;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use lru::LruCache;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::ApiState;
use crate::providers::SynthesizedAudio;

/// Recently synthesized replies, evicted least-recently-used
#[derive(Clone)]
pub struct AudioStore {
    cache: Arc<Mutex<LruCache<Uuid, SynthesizedAudio>>>,
}

impl AudioStore {
    /// Create a store holding at most `capacity` clips (minimum one)
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: Arc::new(Mutex::new(LruCache::new(capacity))),
        }
    }

    /// Store a clip and return its id
    pub async fn insert(&self, audio: SynthesizedAudio) -> Uuid {
        let id = Uuid::new_v4();
        let mut cache = self.cache.lock().await;
        if let Some((evicted, _)) = cache.push(id, audio) {
            tracing::debug!(%evicted, "evicted cached audio");
        }
        id
    }

    /// Fetch a clip by id
    pub async fn get(&self, id: &Uuid) -> Option<SynthesizedAudio> {
        self.cache.lock().await.get(id).cloned()
    }

    /// Number of cached clips
    pub async fn len(&self) -> usize {
        self.cache.lock().await.len()
    }

    /// Whether the store is empty
    pub async fn is_empty(&self) -> bool {
        self.cache.lock().await.is_empty()
    }
}

/// Build audio router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/{id}", get(fetch_audio))
        .with_state(state)
}

async fn fetch_audio(State(state): State<Arc<ApiState>>, Path(id): Path<String>) -> Response {
    let Ok(id) = Uuid::parse_str(&id) else {
        return not_found();
    };

    match state.audio_store.get(&id).await {
        Some(audio) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, audio.mime_type)],
            audio.data,
        )
            .into_response(),
        None => not_found(),
    }
}

fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "error": "Audio not found." })),
    )
        .into_response()
}
