//! Shared HTTP plumbing for the provider clients.
//!
//! Every provider call is a single JSON `POST`. Failures are mapped to
//! [`ProviderError`] so the core [`Embedder`](repo_rag_core::embedding::Embedder)
//! can decide whether to retry:
//!
//! - HTTP 429 (rate limited) and 5xx (server error) → retryable
//! - other HTTP 4xx (bad key, malformed request) → not retryable
//! - network errors and timeouts → retryable
//! - a 2xx body that is not JSON → not retryable

use std::time::Duration;

use reqwest::StatusCode;
use serde_json::Value;

use repo_rag_core::ProviderError;

/// Build a client with a request timeout.
pub fn client(timeout_secs: u64) -> anyhow::Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()?)
}

/// Whether a non-success status is worth another attempt.
pub fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Send `body` to `url` and return the parsed JSON response.
pub async fn post_json(
    client: &reqwest::Client,
    url: &str,
    bearer: Option<&str>,
    body: &Value,
    label: &str,
) -> Result<Value, ProviderError> {
    let mut request = client
        .post(url)
        .header("Content-Type", "application/json")
        .json(body);
    if let Some(token) = bearer {
        request = request.header("Authorization", format!("Bearer {}", token));
    }

    let response = request
        .send()
        .await
        .map_err(|e| ProviderError::transient(format!("{} request to {} failed: {}", label, url, e)))?;

    let status = response.status();
    if status.is_success() {
        return response
            .json::<Value>()
            .await
            .map_err(|e| ProviderError::permanent(format!("{} returned invalid JSON: {}", label, e)));
    }

    let body_text = response.text().await.unwrap_or_default();
    let message = format!("{} API error {}: {}", label, status, body_text.trim());
    if is_retryable_status(status) {
        Err(ProviderError::transient(message))
    } else {
        Err(ProviderError::permanent(message))
    }
}

/// Read a JSON array of numbers as an embedding vector.
pub fn parse_vector(value: &Value, label: &str) -> Result<Vec<f32>, ProviderError> {
    let items = value
        .as_array()
        .ok_or_else(|| ProviderError::permanent(format!("Invalid {} response: embedding is not an array", label)))?;
    if items.is_empty() {
        return Err(ProviderError::permanent(format!(
            "Invalid {} response: empty embedding",
            label
        )));
    }
    Ok(items
        .iter()
        .map(|v| v.as_f64().unwrap_or(0.0) as f32)
        .collect())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
    use tokio::net::TcpListener;

    /// Serve one canned HTTP response per connection, in order.
    pub(crate) async fn spawn_mock_server(responses: Vec<String>) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        tokio::spawn(async move {
            for resp in responses {
                let Ok((mut stream, _)) = listener.accept().await else {
                    break;
                };
                tokio::spawn(async move {
                    let (reader, mut writer) = stream.split();
                    let mut buf_reader = BufReader::new(reader);
                    let mut content_length = 0usize;
                    let mut line = String::new();
                    loop {
                        line.clear();
                        buf_reader.read_line(&mut line).await.unwrap_or(0);
                        if line == "\r\n" || line == "\n" || line.is_empty() {
                            break;
                        }
                        if let Some(v) = line.to_ascii_lowercase().strip_prefix("content-length:") {
                            content_length = v.trim().parse().unwrap_or(0);
                        }
                    }
                    let mut body = vec![0u8; content_length];
                    buf_reader.read_exact(&mut body).await.ok();
                    writer.write_all(resp.as_bytes()).await.ok();
                });
            }
        });

        port
    }

    pub(crate) fn http_response(status: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        )
    }

    #[test]
    fn test_retryable_statuses() {
        assert!(is_retryable_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable_status(StatusCode::BAD_GATEWAY));
        assert!(is_retryable_status(StatusCode::SERVICE_UNAVAILABLE));
        assert!(!is_retryable_status(StatusCode::UNAUTHORIZED));
        assert!(!is_retryable_status(StatusCode::BAD_REQUEST));
    }

    #[test]
    fn test_parse_vector() {
        let v = parse_vector(&serde_json::json!([0.5, -1.0, 2]), "test").unwrap();
        assert_eq!(v, vec![0.5, -1.0, 2.0]);
        assert!(parse_vector(&serde_json::json!([]), "test").is_err());
        assert!(parse_vector(&serde_json::json!({"x": 1}), "test").is_err());
    }

    #[tokio::test]
    async fn test_post_json_classifies_failures() {
        let port = spawn_mock_server(vec![
            http_response("429 Too Many Requests", r#"{"error":"slow down"}"#),
            http_response("401 Unauthorized", r#"{"error":"bad key"}"#),
            http_response("200 OK", r#"{"ok":true}"#),
        ])
        .await;
        let client = client(5).unwrap();
        let url = format!("http://127.0.0.1:{}/x", port);
        let body = serde_json::json!({});

        let err = post_json(&client, &url, Some("k"), &body, "Test").await.unwrap_err();
        assert!(err.retryable);
        assert!(err.message.contains("429"));

        let err = post_json(&client, &url, Some("k"), &body, "Test").await.unwrap_err();
        assert!(!err.retryable);

        let ok = post_json(&client, &url, None, &body, "Test").await.unwrap();
        assert_eq!(ok["ok"], true);
    }

    #[tokio::test]
    async fn test_connection_refused_is_retryable() {
        let port = {
            let l = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            l.local_addr().unwrap().port()
        };
        let client = client(2).unwrap();
        let err = post_json(
            &client,
            &format!("http://127.0.0.1:{}/x", port),
            None,
            &serde_json::json!({}),
            "Test",
        )
        .await
        .unwrap_err();
        assert!(err.retryable);
    }
}
