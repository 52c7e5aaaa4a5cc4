//! HTTP spec probe for a running functions server.

use std::time::Duration;

use async_trait::async_trait;
use fndeploy_core::{DEFAULT_PROBE_TIMEOUT_SECS, DiscoveredSpec, RuntimeError, SpecProbe};
use reqwest::Client;
use tokio::time::{Instant, sleep};
use tracing::{debug, info};

/// Path the server describes itself on.
pub const SPEC_PATH: &str = "/__/functions.yaml";

/// Delay between connection attempts.
pub const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_millis(200);

const REQUEST_TIMEOUT: Duration = Duration::from_secs(2);

/// Parse and validate a spec document (YAML, or JSON as a YAML subset).
///
/// `origin` names where the text came from, for error messages.
pub fn parse_spec(text: &str, origin: &str) -> Result<DiscoveredSpec, RuntimeError> {
    let spec: DiscoveredSpec =
        serde_yaml::from_str(text).map_err(|e| RuntimeError::SpecParse {
            origin: origin.to_string(),
            reason: e.to_string(),
        })?;
    spec.validate()?;
    Ok(spec)
}

/// Polls `GET /__/functions.yaml` until the server answers.
#[derive(Debug, Clone)]
pub struct HttpSpecProbe {
    client: Client,
    timeout: Duration,
    interval: Duration,
}

impl Default for HttpSpecProbe {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_PROBE_TIMEOUT_SECS))
    }
}

impl HttpSpecProbe {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: Client::builder().no_proxy().build().unwrap_or_default(),
            timeout,
            interval: DEFAULT_PROBE_INTERVAL,
        }
    }

    #[must_use]
    pub const fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub const fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl SpecProbe for HttpSpecProbe {
    async fn fetch(&self, port: u16) -> Result<DiscoveredSpec, RuntimeError> {
        let url = format!("http://127.0.0.1:{port}{SPEC_PATH}");
        let deadline = Instant::now() + self.timeout;
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            match self
                .client
                .get(&url)
                .timeout(REQUEST_TIMEOUT)
                .send()
                .await
            {
                Ok(response) => {
                    let status = response.status();
                    if !status.is_success() {
                        return Err(RuntimeError::Probe {
                            url,
                            reason: format!("server answered {status}"),
                        });
                    }

                    let body = response.text().await.map_err(|e| RuntimeError::Probe {
                        url: url.clone(),
                        reason: e.to_string(),
                    })?;
                    info!(port = %port, attempt, "Fetched functions spec from server");
                    return parse_spec(&body, &url);
                }
                // Server not listening yet (or still compiling)
                Err(e) if e.is_connect() || e.is_timeout() => {
                    debug!(url = %url, attempt, error = %e, "Server not ready, retrying");
                }
                Err(e) => {
                    return Err(RuntimeError::Probe {
                        url,
                        reason: e.to_string(),
                    });
                }
            }

            if Instant::now() + self.interval > deadline {
                return Err(RuntimeError::ProbeTimeout {
                    url,
                    waited: self.timeout,
                });
            }
            sleep(self.interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fndeploy_core::{SpecError, Trigger};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    const SPEC_YAML: &str = "\
specVersion: v1alpha1
endpoints:
  hello:
    entryPoint: Hello
    region: [us-central1]
    httpsTrigger: {}
  nightly:
    entryPoint: Nightly
    scheduleTrigger:
      schedule: every 24 hours
";

    /// Serve one canned HTTP response per connection.
    async fn serve(status_line: &'static str, body: &'static str) -> u16 {
        let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = [0u8; 1024];
                let _ = socket.read(&mut buf).await;
                let response = format!(
                    "HTTP/1.1 {status_line}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(response.as_bytes()).await;
            }
        });
        port
    }

    #[test]
    fn parses_yaml_spec() {
        let spec = parse_spec(SPEC_YAML, "functions.yaml").unwrap();
        assert_eq!(spec.endpoints.len(), 2);
        assert_eq!(spec.endpoints["hello"].region, vec!["us-central1"]);
        assert!(matches!(
            spec.endpoints["nightly"].trigger,
            Trigger::ScheduleTrigger(_)
        ));
    }

    #[test]
    fn parses_json_spec() {
        let json = r#"{"specVersion":"v1alpha1","endpoints":{"fn":{"entryPoint":"Fn","httpsTrigger":{}}}}"#;
        let spec = parse_spec(json, "inline").unwrap();
        assert_eq!(spec.endpoints["fn"].entry_point, "Fn");
    }

    #[test]
    fn rejects_unknown_spec_version() {
        let err = parse_spec("specVersion: v2\n", "inline").unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::InvalidSpec(SpecError::UnsupportedVersion(_))
        ));
    }

    #[test]
    fn syntax_error_names_origin() {
        let err = parse_spec("endpoints: [unclosed", "functions.yaml").unwrap_err();
        assert!(matches!(err, RuntimeError::SpecParse { ref origin, .. } if origin == "functions.yaml"));
    }

    #[tokio::test]
    async fn fetches_spec_from_server() {
        let port = serve("200 OK", SPEC_YAML).await;
        let spec = HttpSpecProbe::new(Duration::from_secs(5))
            .fetch(port)
            .await
            .unwrap();
        assert!(spec.endpoints.contains_key("hello"));
    }

    #[tokio::test]
    async fn error_status_fails_immediately() {
        let port = serve("500 Internal Server Error", "boom").await;
        let err = HttpSpecProbe::new(Duration::from_secs(5))
            .fetch(port)
            .await
            .unwrap_err();
        assert!(matches!(err, RuntimeError::Probe { .. }));
    }

    #[tokio::test]
    async fn times_out_when_nothing_listens() {
        let port = {
            let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
            listener.local_addr().unwrap().port()
        };

        let probe = HttpSpecProbe::new(Duration::from_millis(300))
            .with_interval(Duration::from_millis(50));
        let started = std::time::Instant::now();
        let err = probe.fetch(port).await.unwrap_err();

        assert!(matches!(err, RuntimeError::ProbeTimeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
