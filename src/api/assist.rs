//! Voice request endpoint: audio in, reply text and speech out

use std::sync::Arc;

use axum::{
    extract::{FromRequest, Multipart, Request, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use base64::Engine;
use serde::{Deserialize, Serialize};

use super::ApiState;
use crate::config::AudioTransport;
use crate::language::LanguageTag;
use crate::pipeline::{AssistantReply, AudioInput, ReplySource};
use crate::Error;

/// Message returned when speech could not be recognized
pub const EMPTY_TRANSCRIPT_MESSAGE: &str = "Could not transcribe audio.";

/// Build assist router, served at `/` and `/api/assist`
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/", post(assist))
        .route("/api/assist", post(assist))
        .with_state(state)
}

/// JSON request body
#[derive(Debug, Deserialize)]
pub struct AssistRequest {
    #[serde(alias = "audioBase64")]
    pub audio_base64: String,
}

/// Successful reply
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistResponse {
    pub response_text: String,
    /// Base64 audio, present in inline transport when synthesis succeeded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_base64: Option<String>,
    /// Fetch path, present in reference transport when synthesis succeeded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    pub audio_available: bool,
    pub language: LanguageTag,
    pub source: ReplySource,
}

async fn assist(
    State(state): State<Arc<ApiState>>,
    AssistBody(input): AssistBody,
) -> Result<Json<AssistResponse>, AssistError> {
    let reply = state.pipeline.handle(input).await?;
    Ok(Json(encode_reply(&state, reply).await))
}

async fn encode_reply(state: &ApiState, reply: AssistantReply) -> AssistResponse {
    let (audio_base64, audio_url) = match (reply.audio, state.audio_transport) {
        (Some(audio), AudioTransport::Inline) => (
            Some(base64::engine::general_purpose::STANDARD.encode(&audio.data)),
            None,
        ),
        (Some(audio), AudioTransport::Reference) => {
            let id = state.audio_store.insert(audio).await;
            (None, Some(format!("/api/audio/{id}")))
        }
        (None, _) => (None, None),
    };

    AssistResponse {
        audio_available: audio_base64.is_some() || audio_url.is_some(),
        response_text: reply.text,
        audio_base64,
        audio_url,
        language: reply.language,
        source: reply.source,
    }
}

/// Audio extracted from a JSON, multipart or raw audio body
pub struct AssistBody(pub AudioInput);

impl<S> FromRequest<S> for AssistBody
where
    S: Send + Sync,
{
    type Rejection = AssistError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        if content_type.starts_with("multipart/form-data") {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| AssistError::BadRequest(e.body_text()))?;
            return read_multipart(multipart).await.map(Self);
        }

        if content_type.starts_with("audio/") || content_type == "application/octet-stream" {
            let data = axum::body::Bytes::from_request(req, state)
                .await
                .map_err(|e| AssistError::BadRequest(e.body_text()))?;
            return Ok(Self(AudioInput::Upload {
                data: data.to_vec(),
                content_type: Some(content_type),
            }));
        }

        let Json(body) = Json::<AssistRequest>::from_request(req, state)
            .await
            .map_err(|e| AssistError::BadRequest(e.body_text()))?;
        Ok(Self(AudioInput::Base64(body.audio_base64)))
    }
}

/// First audio field wins: a file part (`file`/`audio`) or a base64 text part
async fn read_multipart(mut multipart: Multipart) -> Result<AudioInput, AssistError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AssistError::BadRequest(e.body_text()))?
    {
        match field.name() {
            Some("audio_base64" | "audioBase64") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AssistError::BadRequest(e.body_text()))?;
                return Ok(AudioInput::Base64(text));
            }
            Some("file" | "audio") => {
                let content_type = field.content_type().map(str::to_string);
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AssistError::BadRequest(e.body_text()))?;
                return Ok(AudioInput::Upload {
                    data: data.to_vec(),
                    content_type,
                });
            }
            _ => {}
        }
    }

    Err(AssistError::BadRequest(
        "No audio provided. Send a `file` part or `audio_base64`.".to_string(),
    ))
}

/// Errors surfaced to the caller as `{error}`
#[derive(Debug)]
pub enum AssistError {
    /// Malformed request body
    BadRequest(String),
    /// Pipeline stage failure
    Pipeline(Error),
}

impl From<Error> for AssistError {
    fn from(e: Error) -> Self {
        Self::Pipeline(e)
    }
}

impl IntoResponse for AssistError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: String,
        }

        let (status, error) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Pipeline(Error::EmptyTranscript) => {
                (StatusCode::BAD_REQUEST, EMPTY_TRANSCRIPT_MESSAGE.to_string())
            }
            Self::Pipeline(e) if e.is_client_error() => (StatusCode::BAD_REQUEST, e.to_string()),
            Self::Pipeline(e) => {
                tracing::error!(error = %e, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
        };

        (status, Json(ErrorResponse { error })).into_response()
    }
}
