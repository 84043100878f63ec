//! Search endpoints: submission and the per-search SSE result stream.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::{
        IntoResponse,
        sse::{Event as SseEvent, KeepAlive, Sse},
    },
    routing::{get, post},
};
use tokio::sync::mpsc::unbounded_channel;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::error;

use farestream_core::SearchId;
use farestream_infra::{AttachError, ResultEvent};
use farestream_streams::CancelToken;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", post(submit_search))
        .route("/:search_id", get(stream_results))
}

/// POST /search
///
/// Accepts a search request, returns its identity immediately; fulfillment
/// is asynchronous and delivered over the SSE endpoint.
pub async fn submit_search(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::SearchRequestBody>,
) -> axum::response::Response {
    let request = body.into_domain();
    if let Err(err) = request.validate() {
        return errors::json_error(StatusCode::BAD_REQUEST, "Invalid request", err.to_string());
    }

    // Intake talks to a sync transport; keep it off the async runtime.
    let intake = services.intake.clone();
    let submitted = tokio::task::spawn_blocking(move || intake.submit(&request)).await;

    let search_id = match submitted {
        Ok(Ok(search_id)) => search_id,
        Ok(Err(err)) => {
            error!(error = %err, "search submission failed");
            return errors::json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to process request",
                err.to_string(),
            );
        }
        Err(join_err) => {
            return errors::json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to process request",
                join_err.to_string(),
            );
        }
    };

    Json(dto::envelope(
        true,
        "Search request submitted",
        serde_json::json!({
            "search_id": search_id.to_string(),
            "status": "processing",
        }),
    ))
    .into_response()
}

/// GET /search/:search_id
///
/// Server-Sent Events stream of the search's result envelopes. Ends after
/// the terminal envelope; 404 when the identity is unknown (never submitted,
/// or already completed and reclaimed).
pub async fn stream_results(
    Extension(services): Extension<Arc<AppServices>>,
    Path(search_id): Path<String>,
) -> axum::response::Response {
    let search_id: SearchId = match search_id.parse() {
        Ok(id) => id,
        Err(_) => {
            return errors::json_error(
                StatusCode::BAD_REQUEST,
                "Invalid search ID",
                "Invalid search ID",
            );
        }
    };

    let reader = services.reader.clone();
    let attached = tokio::task::spawn_blocking(move || reader.attach(&search_id)).await;
    let subscription = match attached {
        Ok(Ok(subscription)) => subscription,
        Ok(Err(AttachError::NotFound)) => {
            return errors::json_error(
                StatusCode::NOT_FOUND,
                "Stream not found",
                "Stream not found",
            );
        }
        Ok(Err(AttachError::Transport(err))) => {
            error!(error = %err, "result stream attach failed");
            return errors::json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Transport error",
                err.to_string(),
            );
        }
        Err(join_err) => {
            return errors::json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Transport error",
                join_err.to_string(),
            );
        }
    };

    // Poll loop on a blocking thread, bridged to the SSE response through an
    // unbounded channel. A dropped receiver (client gone) fails the next
    // send and is probed on idle polls, so the loop stops within one poll
    // interval even for a search that never completes.
    let (tx, rx) = unbounded_channel::<Result<SseEvent, Infallible>>();
    tokio::task::spawn_blocking(move || {
        let cancel = CancelToken::new();
        let _exit = subscription.run(&cancel, |event| match event {
            ResultEvent::Update(value) => {
                let data = match serde_json::to_string(&value) {
                    Ok(data) => data,
                    Err(_) => return true,
                };
                tx.send(Ok(SseEvent::default().data(data))).is_ok()
            }
            ResultEvent::Idle => !tx.is_closed(),
        });
    });

    let stream = UnboundedReceiverStream::new(rx);
    Sse::new(stream)
        .keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
        .into_response()
}
