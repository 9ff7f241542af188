//! Stateless HTTP mirror
//!
//! A subset of the persistent-channel operations, applied immediately and
//! answered with a plain ok: no command id, no queue, no acknowledgment.

use super::AppState;
use crate::command::MirrorError;
use axum::extract::rejection::FormRejection;
use axum::extract::{Form, State};
use axum::http::{Method, StatusCode};
use axum::Json;
use pixel_commander_shared::{ErrorCode, Reply};
use serde::Deserialize;
use tracing::{debug, warn};

type Response = (StatusCode, Json<Reply>);

#[derive(Debug, Deserialize)]
pub struct ColorParams {
    r: Option<i64>,
    g: Option<i64>,
    b: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct BrightnessParams {
    brightness: Option<i64>,
}

pub async fn pixel_count(State(state): State<AppState>) -> Json<Reply> {
    Json(Reply::PixelCount(state.mirror.pixel_count()))
}

pub async fn ping(method: Method) -> Json<Reply> {
    debug!("Received HTTP ping ({})", method);
    Json(Reply::Pong)
}

pub async fn set_color(
    State(state): State<AppState>,
    params: Result<Form<ColorParams>, FormRejection>,
) -> Response {
    let Ok(Form(ColorParams {
        r: Some(r),
        g: Some(g),
        b: Some(b),
    })) = params
    else {
        return rejected(ErrorCode::MissingParams);
    };
    applied(state.mirror.set_color(level(r), level(g), level(b)).await)
}

pub async fn clear(State(state): State<AppState>) -> Response {
    applied(state.mirror.clear().await)
}

pub async fn set_brightness(
    State(state): State<AppState>,
    params: Result<Form<BrightnessParams>, FormRejection>,
) -> Response {
    let Ok(Form(BrightnessParams {
        brightness: Some(brightness),
    })) = params
    else {
        return rejected(ErrorCode::MissingParam);
    };
    applied(state.mirror.set_brightness(level(brightness)).await)
}

pub async fn show(State(state): State<AppState>) -> Response {
    applied(state.mirror.show().await)
}

fn level(value: i64) -> u8 {
    value.clamp(0, 255) as u8
}

fn rejected(code: ErrorCode) -> Response {
    (StatusCode::BAD_REQUEST, Json(Reply::error(code)))
}

fn applied(result: Result<(), MirrorError>) -> Response {
    match result {
        Ok(()) => (StatusCode::OK, Json(Reply::Ok)),
        Err(e) => {
            warn!("Mirror request not applied: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(Reply::error(ErrorCode::Unavailable)),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::{router, AppState};
    use crate::channel::CommandChannel;
    use crate::command::{MirrorHandle, MirrorOp, MIRROR_DEPTH};
    use crate::session::SessionRegistry;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use axum::Router;
    use pixel_commander_shared::CommandQueue;
    use smart_leds::RGB8;
    use std::sync::{Arc, Mutex};
    use tower::ServiceExt;

    const FORM: &str = "application/x-www-form-urlencoded";

    /// Router plus the operations the loop side received
    fn app() -> (Router, Arc<Mutex<Vec<MirrorOp>>>) {
        let queue = Arc::new(CommandQueue::with_capacity(16));
        let (mirror, mut rx) = MirrorHandle::channel(64, MIRROR_DEPTH);
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = seen.clone();
        tokio::spawn(async move {
            while let Some(request) = rx.recv().await {
                sink.lock().unwrap().push(request.op);
                let _ = request.done.send(());
            }
        });

        let state = AppState::new(
            CommandChannel::new(queue, 64),
            Arc::new(SessionRegistry::new()),
            mirror,
        );
        (router(state), seen)
    }

    async fn call(app: Router, method: &str, uri: &str, body: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, FORM)
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_pixel_count_and_ping() {
        let (app, _) = app();
        assert_eq!(
            call(app.clone(), "GET", "/api/pixelCount", "").await,
            (StatusCode::OK, r#"{"status":"ok","pixelCount":64}"#.to_string())
        );
        for method in ["GET", "POST"] {
            assert_eq!(
                call(app.clone(), method, "/ping", "").await,
                (StatusCode::OK, r#"{"status":"ok","message":"pong"}"#.to_string())
            );
        }
    }

    #[tokio::test]
    async fn test_set_color_applies() {
        let (app, seen) = app();
        let (status, body) = call(app, "POST", "/api/setColor", "r=10&g=20&b=300").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, r#"{"status":"ok"}"#);
        assert_eq!(
            seen.lock().unwrap().as_slice(),
            &[MirrorOp::SetColor(RGB8::new(10, 20, 255))]
        );
    }

    #[tokio::test]
    async fn test_set_color_missing_params() {
        let (app, seen) = app();
        let (status, body) = call(app, "POST", "/api/setColor", "r=10&g=20").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, r#"{"status":"error","error":"missing_params"}"#);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_set_brightness_missing_param() {
        let (app, _) = app();
        let (status, body) = call(app.clone(), "POST", "/api/setBrightness", "").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, r#"{"status":"error","error":"missing_param"}"#);

        let (status, _) = call(app, "POST", "/api/setBrightness", "brightness=40").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_clear_both_verbs_and_show() {
        let (app, seen) = app();
        assert_eq!(call(app.clone(), "GET", "/api/clear", "").await.0, StatusCode::OK);
        assert_eq!(call(app.clone(), "POST", "/api/clear", "").await.0, StatusCode::OK);
        assert_eq!(call(app.clone(), "POST", "/api/show", "").await.0, StatusCode::OK);
        assert_eq!(
            seen.lock().unwrap().as_slice(),
            &[MirrorOp::Clear, MirrorOp::Clear, MirrorOp::Show]
        );
    }
}
