use std::time::Duration;

use async_trait::async_trait;

use super::{ScheduledTask, TaskError};

/// Probes the service's own health endpoint to keep the host awake.
pub struct SelfPingTask {
    url: String,
    timeout: Duration,
    http_client: reqwest::Client,
}

impl SelfPingTask {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            timeout,
            http_client: reqwest::Client::new(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ScheduledTask for SelfPingTask {
    fn name(&self) -> &'static str {
        "self_ping"
    }

    async fn run_once(&self) -> Result<(), TaskError> {
        let response = self
            .http_client
            .get(&self.url)
            .timeout(self.timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TaskError::Probe(format!(
                "{} responded with status {}",
                self.url, status
            )));
        }

        tracing::info!(url = %self.url, status = status.as_u16(), "Self-ping succeeded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use axum::{http::StatusCode, routing::get, Router};

    use super::*;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_healthy_endpoint() {
        let base = serve(Router::new().route("/health", get(|| async { "ok" }))).await;
        let task = SelfPingTask::new(format!("{}/health", base), Duration::from_secs(5));

        task.run_once().await.unwrap();
    }

    #[tokio::test]
    async fn test_error_status_is_probe_failure() {
        let base = serve(Router::new().route(
            "/health",
            get(|| async { StatusCode::SERVICE_UNAVAILABLE }),
        ))
        .await;
        let task = SelfPingTask::new(format!("{}/health", base), Duration::from_secs(5));

        let err = task.run_once().await.unwrap_err();
        assert!(matches!(err, TaskError::Probe(_)));
    }

    #[tokio::test]
    async fn test_slow_endpoint_times_out() {
        let base = serve(Router::new().route(
            "/health",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "late"
            }),
        ))
        .await;
        let task = SelfPingTask::new(format!("{}/health", base), Duration::from_millis(100));

        let err = task.run_once().await.unwrap_err();
        match err {
            TaskError::Request(e) => assert!(e.is_timeout()),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
