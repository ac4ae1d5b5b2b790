use std::net::SocketAddr;

use axum::{http::StatusCode, routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{meals, session, state::AppState};

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .nest(
            "/api/v1",
            Router::new()
                .merge(session::router())
                .merge(meals::router())
                .route("/health", get(|| async { "ok" })),
        )
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri, status = tracing::field::Empty)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        let latency_ms = latency.as_millis() as u64;
                        if status.is_server_error() {
                            tracing::error!(%status, latency_ms, "response");
                        } else {
                            tracing::info!(%status, latency_ms, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router, host: &str, port: u16) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown requested");
        })
        .await?;
    Ok(())
}

pub(crate) fn internal<E: std::error::Error>(e: E) -> (StatusCode, String) {
    tracing::error!(error = %e, "request failed");
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

#[cfg(test)]
mod app_tests {
    use super::*;
    use crate::session::SessionState;
    use axum::{
        body::{to_bytes, Body},
        http::{Method, Request},
    };
    use serde_json::{json, Value};
    use std::time::Duration;
    use tower::ServiceExt;

    async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let req = match body {
            Some(v) => builder
                .header("content-type", "application/json")
                .body(Body::from(v.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn wait_for(state: &AppState, want: SessionState) {
        let mut rx = state.session.watch_state();
        tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|s| *s == want))
            .await
            .expect("state reached in time")
            .expect("state channel open");
    }

    #[tokio::test]
    async fn health_and_empty_session() {
        let state = AppState::fake().await;
        let app = build_app(state);

        let res = app
            .clone()
            .oneshot(Request::get("/api/v1/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let (status, body) = call(&app, Method::GET, "/api/v1/session", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["state"], "idle");
        assert_eq!(body["meals"], json!([]));
        assert_eq!(body["totals"]["calories"], 0.0);
        assert_eq!(body["progress"]["calories"]["remaining"], 2000.0);
        assert_eq!(body["current"], Value::Null);
    }

    #[tokio::test]
    async fn capture_over_http() {
        let state = AppState::fake().await;
        let app = build_app(state.clone());

        let (status, body) = call(&app, Method::POST, "/api/v1/session/capture", None).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body["state"], "capturing");

        let (status, _) = call(&app, Method::POST, "/api/v1/session/pick", None).await;
        assert_eq!(status, StatusCode::CONFLICT);

        while !state.camera.is_waiting().await {
            tokio::task::yield_now().await;
        }
        let (status, _) = call(
            &app,
            Method::POST,
            "/api/v1/devices/camera/image",
            Some(json!({ "image": "file:///camera/lunch.jpg" })),
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);
        wait_for(&state, SessionState::ResultsReady).await;

        let (_, body) = call(&app, Method::GET, "/api/v1/session", None).await;
        assert_eq!(body["state"], "results_ready");
        assert_eq!(body["current"]["image"], "file:///camera/lunch.jpg");
        assert_eq!(body["current"]["time"], "1:05 PM");
        assert_eq!(body["meals"].as_array().unwrap().len(), 1);

        let (_, body) = call(&app, Method::POST, "/api/v1/session/save", None).await;
        assert_eq!(body["state"], "idle");
        assert_eq!(body["current"], Value::Null);

        let (status, meals) = call(&app, Method::GET, "/api/v1/meals", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(meals[0]["image"], "file:///camera/lunch.jpg");

        let (_, totals) = call(&app, Method::GET, "/api/v1/meals/totals", None).await;
        assert_eq!(totals["meal_count"], 1);
        assert_eq!(totals["totals"]["calories"], meals[0]["nutrition"]["calories"]);
    }

    #[tokio::test]
    async fn device_delivery_without_a_session_conflicts() {
        let app = build_app(AppState::fake().await);

        let (status, _) = call(
            &app,
            Method::POST,
            "/api/v1/devices/library/image",
            Some(json!({ "image": "file:///x.jpg" })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = call(&app, Method::POST, "/api/v1/devices/camera/cancel", None).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = call(
            &app,
            Method::POST,
            "/api/v1/devices/library/image",
            Some(json!({ "image": "  " })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn host_cancel_returns_session_to_idle() {
        let state = AppState::fake().await;
        let app = build_app(state.clone());

        let (status, _) = call(&app, Method::POST, "/api/v1/session/pick", None).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        while !state.library.is_waiting().await {
            tokio::task::yield_now().await;
        }

        let (status, _) = call(&app, Method::POST, "/api/v1/devices/library/cancel", None).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        wait_for(&state, SessionState::Idle).await;

        let (_, body) = call(&app, Method::GET, "/api/v1/session", None).await;
        assert_eq!(body["notice"], Value::Null);
    }

    #[tokio::test]
    async fn clear_meals_over_http() {
        let state = AppState::fake().await;
        let app = build_app(state.clone());

        assert!(state.session.start_capture());
        while !state.camera.is_waiting().await {
            tokio::task::yield_now().await;
        }
        state
            .camera
            .deliver(crate::devices::ImageHandle::new("file:///a.jpg"))
            .await;
        wait_for(&state, SessionState::ResultsReady).await;
        state.session.dismiss_results();

        let (status, _) = call(&app, Method::DELETE, "/api/v1/meals", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (_, meals) = call(&app, Method::GET, "/api/v1/meals", None).await;
        assert_eq!(meals, json!([]));
    }
}
