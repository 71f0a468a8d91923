use super::{BureauClient, BureauSettings};
use crate::credit::Bureau;
use crate::error::BureauError;
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument};

#[derive(Debug, Clone)]
pub struct HttpBureauClient {
    http: Client,
    base: Url,
    api_key: Option<String>,
}

impl HttpBureauClient {
    pub fn new(settings: &BureauSettings) -> Result<Self> {
        let endpoint = settings
            .endpoint
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                anyhow!(
                    "bureau endpoint must be provided via {}",
                    BureauSettings::ENDPOINT_ENV
                )
            })?;
        let base = Url::parse(endpoint)
            .with_context(|| format!("invalid bureau endpoint `{endpoint}`"))?;
        if base.cannot_be_a_base() {
            bail!("bureau endpoint `{endpoint}` cannot carry a path");
        }

        let mut builder = Client::builder().user_agent("credit-lens/0.3");
        if let Some(secs) = settings.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder
            .build()
            .context("failed to build bureau HTTP client")?;
        Ok(Self {
            http,
            base,
            api_key: settings.api_key.clone(),
        })
    }

    fn report_url(&self, bureau: Bureau, subject: &str) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["v1", "bureaus", bureau.slug(), "reports", subject]);
        }
        url
    }
}

#[async_trait]
impl BureauClient for HttpBureauClient {
    #[instrument(name = "bureau_fetch", skip_all, fields(bureau = %bureau))]
    async fn fetch(&self, bureau: Bureau, subject: &str) -> Result<Value, BureauError> {
        let url = self.report_url(bureau, subject);
        let mut request = self.http.get(url);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|err| BureauError::transport(bureau, format!("request failed: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BureauError::transport(
                bureau,
                format!("HTTP {status}: {}", truncate(body.trim(), 200)),
            ));
        }

        debug!(%status, "bureau responded");
        response
            .json::<Value>()
            .await
            .map_err(|err| BureauError::malformed(bureau, format!("body is not JSON: {err}")))
    }
}

fn truncate(input: &str, max_chars: usize) -> String {
    if input.chars().count() <= max_chars {
        return input.to_string();
    }
    input.chars().take(max_chars).collect::<String>() + "…"
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn base_settings(url: String) -> BureauSettings {
        BureauSettings {
            endpoint: Some(url),
            api_key: Some("test-key".into()),
            timeout_secs: Some(5),
            ..BureauSettings::default()
        }
    }

    #[test]
    fn report_url_appends_bureau_and_subject() {
        let client =
            HttpBureauClient::new(&base_settings("https://bureaus.example.com/api/".into()))
                .unwrap();
        assert_eq!(
            client.report_url(Bureau::CrifHighmark, "ABCDE1234F").as_str(),
            "https://bureaus.example.com/api/v1/bureaus/crif/reports/ABCDE1234F"
        );
    }

    #[test]
    fn report_url_escapes_subject() {
        let client =
            HttpBureauClient::new(&base_settings("https://bureaus.example.com".into())).unwrap();
        let url = client.report_url(Bureau::Cibil, "a/b c");
        assert_eq!(url.path(), "/v1/bureaus/cibil/reports/a%2Fb%20c");
    }

    #[test]
    fn rejects_invalid_endpoint() {
        let err = HttpBureauClient::new(&base_settings("not a url".into())).unwrap_err();
        assert!(err.to_string().contains("invalid bureau endpoint"));
    }

    #[tokio::test]
    #[ignore = "requires loopback networking"]
    async fn fetch_returns_document() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/v1/bureaus/cibil/reports/ABCDE1234F")
                .header("authorization", "Bearer test-key");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"status":"success","data":{"creditScore":765}}"#);
        });

        let client = HttpBureauClient::new(&base_settings(server.base_url())).unwrap();
        let raw = client.fetch(Bureau::Cibil, "ABCDE1234F").await.unwrap();
        assert_eq!(raw["data"]["creditScore"], 765);
        mock.assert();
    }

    #[tokio::test]
    #[ignore = "requires loopback networking"]
    async fn error_status_is_transport_failure_without_retry() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/v1/bureaus/equifax/reports/ABCDE1234F");
            then.status(503).body("maintenance");
        });

        let client = HttpBureauClient::new(&base_settings(server.base_url())).unwrap();
        let err = client
            .fetch(Bureau::Equifax, "ABCDE1234F")
            .await
            .unwrap_err();
        assert!(matches!(err, BureauError::Transport { bureau: Bureau::Equifax, .. }));
        assert!(err.to_string().contains("maintenance"));
        mock.assert_hits(1);
    }

    #[tokio::test]
    #[ignore = "requires loopback networking"]
    async fn non_json_body_is_malformed() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/v1/bureaus/experian/reports/X");
            then.status(200).body("<html>");
        });

        let client = HttpBureauClient::new(&base_settings(server.base_url())).unwrap();
        let err = client.fetch(Bureau::Experian, "X").await.unwrap_err();
        assert!(matches!(err, BureauError::MalformedResponse { .. }));
    }

    #[test]
    fn truncate_long_strings_adds_ellipsis() {
        assert_eq!(truncate("abcdefghijklmnopqrstuvwxyz", 5), "abcde…");
    }
}
