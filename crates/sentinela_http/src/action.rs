//! `/alert/{id}/*` and `/issue/{id}/drop` (`spec.md` §6, §8): these only
//! enqueue a `request` message for the Executor to apply — the HTTP layer
//! never runs `alert_machine`/`issue_machine` itself. The only read here is
//! the existence check that turns an unknown target into 404 instead of a
//! silently-dropped queue message.

use crate::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use sentinela_core::SentinelaResult;
use std::sync::Arc;

async fn respond(action: &'static str, target_id: i64, result: SentinelaResult<()>) -> Response {
    match result {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({ "status": "request_queued", "action": action, "target_id": target_id })),
        )
            .into_response(),
        Err(error) => {
            tracing::error!(%error, action, target_id, "failed to enqueue action request");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub async fn alert_acknowledge(State(state): State<Arc<AppState>>, Path(id): Path<i64>) -> Response {
    match state.store.get_alert(id).await {
        Ok(Some(_)) => respond("alert_acknowledge", id, sentinela_controller::requests::alert_acknowledge(state.queue.as_ref(), id).await).await,
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(error) => {
            tracing::error!(%error, "failed to look up alert");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub async fn alert_lock(State(state): State<Arc<AppState>>, Path(id): Path<i64>) -> Response {
    match state.store.get_alert(id).await {
        Ok(Some(_)) => respond("alert_lock", id, sentinela_controller::requests::alert_lock(state.queue.as_ref(), id).await).await,
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(error) => {
            tracing::error!(%error, "failed to look up alert");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub async fn alert_solve(State(state): State<Arc<AppState>>, Path(id): Path<i64>) -> Response {
    match state.store.get_alert(id).await {
        Ok(Some(_)) => respond("alert_solve", id, sentinela_controller::requests::alert_solve(state.queue.as_ref(), id).await).await,
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(error) => {
            tracing::error!(%error, "failed to look up alert");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub async fn issue_drop(State(state): State<Arc<AppState>>, Path(id): Path<i64>) -> Response {
    match state.store.get_issue(id).await {
        Ok(Some(_)) => respond("issue_drop", id, sentinela_controller::requests::issue_drop(state.queue.as_ref(), id).await).await,
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(error) => {
            tracing::error!(%error, "failed to look up issue");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use sentinela_core::models::{Alert, Issue};
    use sentinela_monitor::MonitorRegistry;
    use sentinela_queue::internal::InternalQueue;
    use sentinela_store::memory::InMemoryStore;
    use sentinela_store::Store;
    use tower::ServiceExt;

    fn test_state(store: InMemoryStore) -> AppState {
        AppState {
            store: Arc::new(store),
            queue: Arc::new(InternalQueue::new(std::time::Duration::from_millis(50))),
            registry: Arc::new(MonitorRegistry::new()),
            controller: None,
            executor: None,
            metrics: Arc::new(prometheus_client::registry::Registry::default()),
            diagnostics_grace: chrono::Duration::seconds(30),
        }
    }

    #[tokio::test]
    async fn solving_an_unknown_alert_is_404() {
        let app = router(test_state(InMemoryStore::new()));
        let response = app
            .oneshot(Request::builder().method("POST").uri("/alert/999/solve").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn solving_a_known_alert_enqueues_a_request() {
        let store = InMemoryStore::new();
        let monitor = store.create_monitor("m1").await.unwrap();
        let alert = store.insert_alert(Alert::new(0, monitor.id, None, chrono::Utc::now())).await.unwrap();

        let app = router(test_state(store));
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/alert/{}/solve", alert.id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["status"], "request_queued");
    }

    #[tokio::test]
    async fn dropping_an_unknown_issue_is_404() {
        let app = router(test_state(InMemoryStore::new()));
        let response = app
            .oneshot(Request::builder().method("POST").uri("/issue/1/drop").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn dropping_a_known_issue_enqueues_a_request() {
        let store = InMemoryStore::new();
        let monitor = store.create_monitor("m1").await.unwrap();
        let issue = store
            .insert_issue(Issue::new(0, monitor.id, "entity-1", serde_json::json!({}), chrono::Utc::now()))
            .await
            .unwrap();

        let app = router(test_state(store));
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/issue/{}/drop", issue.id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
