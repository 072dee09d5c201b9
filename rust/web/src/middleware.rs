use std::time::Instant;
use warp::http::{Method, StatusCode};
use warp::path::FullPath;
use warp::reject::Rejection;
use warp::reply::{Reply, Response};
use warp::Filter;

#[derive(Debug)]
struct RequestStart {
    path: String,
    method: Method,
    at: Instant,
}

/// Logs every request handled by `filter` together with its status and duration.
pub fn with_request_logging<F, T>(
    filter: F,
) -> impl Filter<Extract = (Response,), Error = Rejection> + Clone
where
    F: Filter<Extract = (T,), Error = Rejection> + Clone + Send + Sync + 'static,
    T: Reply,
{
    warp::any()
        .and(warp::path::full())
        .and(warp::method())
        .map(|path: FullPath, method: Method| {
            tracing::debug!(path = %path.as_str(), method = %method, "incoming request");
            RequestStart {
                path: path.as_str().to_string(),
                method,
                at: Instant::now(),
            }
        })
        .and(filter)
        .map(|start: RequestStart, reply: T| {
            let response = reply.into_response();
            log_response(
                response.status(),
                &start.path,
                start.method.as_str(),
                start.at.elapsed().as_millis(),
            );
            response
        })
}

/// Log response with status code
pub fn log_response(status: StatusCode, path: &str, method: &str, duration_ms: u128) {
    if status.is_server_error() {
        tracing::error!(
            status = status.as_u16(),
            path = %path,
            method = %method,
            duration_ms = duration_ms,
            "server error"
        );
    } else if status.is_client_error() {
        tracing::warn!(
            status = status.as_u16(),
            path = %path,
            method = %method,
            duration_ms = duration_ms,
            "client error"
        );
    } else {
        tracing::info!(
            status = status.as_u16(),
            path = %path,
            method = %method,
            duration_ms = duration_ms,
            "response sent"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::LogCapture;
    use tracing::Level;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::Registry;

    #[tokio::test]
    async fn logs_request_and_response() {
        let capture = LogCapture::new();
        let registry = Registry::default().with(capture.layer::<Registry>());
        let _guard = tracing::subscriber::set_default(registry);

        let route = warp::path!("look" / String)
            .and(warp::get())
            .map(|player: String| format!("1x1\ndown\n{player}"));

        let response = warp::test::request()
            .method("GET")
            .path("/look/alice")
            .reply(&with_request_logging(route))
            .await;
        assert_eq!(response.status(), StatusCode::OK);

        let entries = capture.entries();
        assert!(entries
            .iter()
            .any(|e| e.level == Level::DEBUG && e.message.contains("incoming request")));
        let sent = entries
            .iter()
            .find(|e| e.message.contains("response sent"))
            .expect("response logged");
        assert_eq!(sent.field("status"), Some("200"));
        assert_eq!(sent.field("path"), Some("/look/alice"));
    }

    #[test]
    fn conflicts_are_warnings() {
        let capture = LogCapture::new();
        capture.record(|| log_response(StatusCode::CONFLICT, "/flip/bob/0,0", "POST", 3));

        let entries = capture.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].level, Level::WARN);
        assert_eq!(entries[0].field("status"), Some("409"));
    }

    #[test]
    fn server_errors_are_errors() {
        let capture = LogCapture::new();
        capture.record(|| log_response(StatusCode::INTERNAL_SERVER_ERROR, "/look/bob", "GET", 1));

        let entries = capture.entries();
        assert_eq!(entries[0].level, Level::ERROR);
        assert!(entries[0].message.contains("server error"));
    }
}
