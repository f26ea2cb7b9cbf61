//! HTTP tuning hook.
//!
//! Sends the value to a user endpoint over a plain HTTP/1.1 connection,
//! either as the request body or as a `value` query parameter.

use async_trait::async_trait;
use bytes::Bytes;
use foresight_state::{HookDefinition, HttpHook, ParameterMode};
use http::{Method, Request, Uri};
use http_body_util::{BodyExt, Full};
use tracing::debug;

use super::{HookError, HookExecutor};

const ALLOWED_METHODS: &[&str] = &[
    "GET", "HEAD", "POST", "PUT", "DELETE", "CONNECT", "OPTIONS", "TRACE", "PATCH",
];

/// Executes `http` hook definitions.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpHookExecutor;

#[async_trait]
impl HookExecutor for HttpHookExecutor {
    async fn execute_with_value(
        &self,
        definition: &HookDefinition,
        value: &str,
    ) -> Result<String, HookError> {
        let hook = definition
            .http
            .as_ref()
            .ok_or(HookError::MissingConfig("http"))?;
        let timeout = definition.timeout();

        match tokio::time::timeout(timeout, send(hook, value)).await {
            Ok(result) => result,
            Err(_) => {
                debug!(url = %hook.url, ?timeout, "http hook timed out");
                Err(HookError::Timeout(timeout))
            }
        }
    }

    fn hook_type(&self) -> &'static str {
        "http"
    }
}

/// Resolve the final request URI, appending the value in query mode.
fn target_uri(hook: &HttpHook, value: &str) -> Result<Uri, HookError> {
    let url = match hook.parameter_mode {
        ParameterMode::Body => hook.url.clone(),
        ParameterMode::Query => {
            let separator = if hook.url.contains('?') { '&' } else { '?' };
            format!(
                "{}{separator}value={}",
                hook.url,
                urlencoding::encode(value)
            )
        }
    };
    url.parse::<Uri>()
        .map_err(|e| HookError::InvalidRequest(format!("invalid url '{url}': {e}")))
}

fn method(hook: &HttpHook) -> Result<Method, HookError> {
    let name = hook.method.to_ascii_uppercase();
    if !ALLOWED_METHODS.contains(&name.as_str()) {
        return Err(HookError::InvalidRequest(format!(
            "unsupported http method '{}'",
            hook.method
        )));
    }
    Method::from_bytes(name.as_bytes()).map_err(|e| HookError::InvalidRequest(e.to_string()))
}

async fn send(hook: &HttpHook, value: &str) -> Result<String, HookError> {
    let method = method(hook)?;
    let uri = target_uri(hook, value)?;

    if uri.scheme_str() != Some("http") {
        return Err(HookError::InvalidRequest(format!(
            "unsupported url scheme in '{uri}', only http is supported"
        )));
    }
    let host = uri
        .host()
        .ok_or_else(|| HookError::InvalidRequest(format!("url '{uri}' has no host")))?;
    let port = uri.port_u16().unwrap_or(80);
    let authority = uri
        .authority()
        .map(|a| a.as_str().to_string())
        .unwrap_or_else(|| host.to_string());
    let address = format!("{host}:{port}");

    let stream = tokio::net::TcpStream::connect(&address)
        .await
        .map_err(|e| HookError::Transport(format!("connect to {address}: {e}")))?;

    let io = hyper_util::rt::TokioIo::new(stream);
    let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
        .await
        .map_err(|e| HookError::Transport(format!("handshake with {address}: {e}")))?;

    // Drive the connection in the background.
    tokio::spawn(async move {
        let _ = conn.await;
    });

    let body = match hook.parameter_mode {
        ParameterMode::Body => Bytes::from(value.to_string()),
        ParameterMode::Query => Bytes::new(),
    };

    let path = uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());

    let mut builder = Request::builder()
        .method(method)
        .uri(path)
        .header("host", authority)
        .header("user-agent", "foresight-hook/0.1");
    for (name, value) in &hook.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    let req = builder
        .body(Full::new(body))
        .map_err(|e| HookError::InvalidRequest(e.to_string()))?;

    let resp = sender
        .send_request(req)
        .await
        .map_err(|e| HookError::Transport(e.to_string()))?;
    let status = resp.status().as_u16();

    let collected = resp
        .into_body()
        .collect()
        .await
        .map_err(|e| HookError::Transport(format!("read response body: {e}")))?;
    let body = String::from_utf8_lossy(&collected.to_bytes()).into_owned();

    if !hook.success_codes.contains(&status) {
        debug!(status, url = %hook.url, "http hook returned non-success status");
        return Err(HookError::Status { status, body });
    }
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::net::SocketAddr;
    use std::time::Duration;

    use foresight_state::HookType;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    /// Serve a single canned HTTP response and hand back the raw request.
    async fn serve_once(
        status_line: &'static str,
        body: &'static str,
    ) -> (SocketAddr, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut raw = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                raw.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&raw);
                if let Some(split) = text.find("\r\n\r\n") {
                    let expected = text[..split]
                        .lines()
                        .find_map(|l| {
                            l.to_ascii_lowercase()
                                .strip_prefix("content-length:")
                                .map(|v| v.trim().parse::<usize>().unwrap_or(0))
                        })
                        .unwrap_or(0);
                    if raw.len() >= split + 4 + expected {
                        break;
                    }
                }
            }
            let response = format!(
                "HTTP/1.1 {status_line}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = tx.send(String::from_utf8_lossy(&raw).into_owned());
        });

        (addr, rx)
    }

    fn definition(url: String, mode: ParameterMode, success: Vec<u16>) -> HookDefinition {
        let mut headers = BTreeMap::new();
        headers.insert("x-tuning".to_string(), "yes".to_string());
        HookDefinition {
            kind: HookType::Http,
            timeout: 2000,
            http: Some(HttpHook {
                method: "POST".to_string(),
                url,
                headers,
                success_codes: success,
                parameter_mode: mode,
            }),
            shell: None,
        }
    }

    #[tokio::test]
    async fn body_mode_sends_value_as_body() {
        let (addr, request) = serve_once("200 OK", "{\"alpha\":0.9}").await;
        let def = definition(format!("http://{addr}/tune"), ParameterMode::Body, vec![200]);

        let out = HttpHookExecutor
            .execute_with_value(&def, "{\"model\":{}}")
            .await
            .unwrap();
        assert_eq!(out, "{\"alpha\":0.9}");

        let raw = request.await.unwrap();
        assert!(raw.starts_with("POST /tune HTTP/1.1"));
        assert!(raw.to_ascii_lowercase().contains("x-tuning: yes"));
        assert!(raw.ends_with("{\"model\":{}}"));
    }

    #[tokio::test]
    async fn query_mode_appends_encoded_value() {
        let (addr, request) = serve_once("200 OK", "{}").await;
        let def = definition(
            format!("http://{addr}/tune?existing=1"),
            ParameterMode::Query,
            vec![200],
        );

        HttpHookExecutor
            .execute_with_value(&def, "{\"a\":1}")
            .await
            .unwrap();

        let raw = request.await.unwrap();
        assert!(raw.starts_with("POST /tune?existing=1&value=%7B%22a%22%3A1%7D HTTP/1.1"));
    }

    #[tokio::test]
    async fn unexpected_status_is_reported_with_body() {
        let (addr, _request) = serve_once("500 Internal Server Error", "overloaded").await;
        let def = definition(format!("http://{addr}/"), ParameterMode::Body, vec![200]);

        let err = HttpHookExecutor
            .execute_with_value(&def, "x")
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "http request failed, status: [500], response: 'overloaded'"
        );
    }

    #[tokio::test]
    async fn silent_endpoint_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let mut def = definition(format!("http://{addr}/"), ParameterMode::Body, vec![200]);
        def.timeout = 100;
        let err = HttpHookExecutor
            .execute_with_value(&def, "x")
            .await
            .unwrap_err();
        assert!(matches!(err, HookError::Timeout(_)));
    }

    #[tokio::test]
    async fn https_is_rejected() {
        let def = definition(
            "https://tuning.example.com/".to_string(),
            ParameterMode::Body,
            vec![200],
        );
        let err = HttpHookExecutor
            .execute_with_value(&def, "x")
            .await
            .unwrap_err();
        assert!(matches!(err, HookError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn unsupported_method_is_rejected() {
        let mut def = definition(
            "http://127.0.0.1:1/".to_string(),
            ParameterMode::Body,
            vec![200],
        );
        if let Some(http) = def.http.as_mut() {
            http.method = "BREW".to_string();
        }
        let err = HttpHookExecutor
            .execute_with_value(&def, "x")
            .await
            .unwrap_err();
        assert!(matches!(err, HookError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn missing_http_block_is_rejected() {
        let mut def = definition(String::new(), ParameterMode::Body, vec![200]);
        def.http = None;
        let err = HttpHookExecutor
            .execute_with_value(&def, "x")
            .await
            .unwrap_err();
        assert!(matches!(err, HookError::MissingConfig("http")));
    }
}
