//! HTTP serving with a bounded graceful drain.

use std::future::IntoFuture;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

/// How the server stopped after `shutdown` fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// Every in-flight request finished within the grace period.
    Drained,
    /// The grace period ran out; remaining connections were dropped.
    GraceExpired,
}

/// Serve `app` until `shutdown` is cancelled, then give in-flight requests
/// `grace` to complete before dropping them.
///
/// The grace timer starts when `shutdown` fires, not when serving starts.
pub async fn serve_with_grace(
    listener: TcpListener,
    app: Router,
    shutdown: CancellationToken,
    grace: Duration,
) -> std::io::Result<ShutdownOutcome> {
    let signal = shutdown.clone();
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move { signal.cancelled().await })
        .into_future();

    let deadline = async {
        shutdown.cancelled().await;
        tracing::info!(grace_secs = grace.as_secs_f64(), "Draining in-flight requests");
        tokio::time::sleep(grace).await;
    };

    tokio::select! {
        result = server => result.map(|()| ShutdownOutcome::Drained),
        () = deadline => {
            tracing::warn!(
                grace_secs = grace.as_secs_f64(),
                "In-flight requests did not finish in time, dropping connections",
            );
            Ok(ShutdownOutcome::GraceExpired)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::routing::get;
    use tokio::sync::Notify;

    use super::*;

    async fn local_listener() -> TcpListener {
        TcpListener::bind("127.0.0.1:0").await.unwrap()
    }

    #[tokio::test]
    async fn idle_server_drains_at_once() {
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        let outcome = tokio::time::timeout(
            Duration::from_secs(5),
            serve_with_grace(local_listener().await, Router::new(), shutdown, Duration::from_secs(30)),
        )
        .await
        .expect("idle server should stop without waiting out the grace period")
        .unwrap();

        assert_eq!(outcome, ShutdownOutcome::Drained);
    }

    #[tokio::test]
    async fn finished_request_is_served_before_stopping() {
        let listener = local_listener().await;
        let addr = listener.local_addr().unwrap();
        let app = Router::new().route("/ping", get(|| async { "pong" }));
        let shutdown = CancellationToken::new();

        let server = tokio::spawn(serve_with_grace(
            listener,
            app,
            shutdown.clone(),
            Duration::from_secs(5),
        ));

        let body = reqwest::get(format!("http://{addr}/ping"))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert_eq!(body, "pong");

        shutdown.cancel();
        let outcome = tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .expect("server should stop")
            .unwrap()
            .unwrap();
        assert_eq!(outcome, ShutdownOutcome::Drained);
    }

    #[tokio::test]
    async fn stuck_request_is_dropped_after_grace() {
        let entered = Arc::new(Notify::new());
        let app = Router::new().route(
            "/slow",
            get({
                let entered = Arc::clone(&entered);
                move || async move {
                    entered.notify_one();
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    "late"
                }
            }),
        );

        let listener = local_listener().await;
        let addr = listener.local_addr().unwrap();
        let shutdown = CancellationToken::new();
        let server = tokio::spawn(serve_with_grace(
            listener,
            app,
            shutdown.clone(),
            Duration::from_millis(200),
        ));

        tokio::spawn(async move {
            let _ = reqwest::get(format!("http://{addr}/slow")).await;
        });
        entered.notified().await;

        shutdown.cancel();
        let outcome = tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .expect("server should stop once the grace period runs out")
            .unwrap()
            .unwrap();
        assert_eq!(outcome, ShutdownOutcome::GraceExpired);
    }
}
