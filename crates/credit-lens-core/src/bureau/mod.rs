mod fixture;
mod http;
mod settings;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use crate::credit::Bureau;
use crate::error::BureauError;

pub use fixture::FixtureBureauClient;
pub use http::HttpBureauClient;
pub use settings::{BureauSettings, SourceKind};

/// Transport abstraction for retrieving one bureau's raw report document.
///
/// Implementations only move bytes: a document that arrives is returned as-is
/// and validated later by [`crate::credit::transform::transform_response`].
#[async_trait]
pub trait BureauClient: Send + Sync {
    /// Issue a single request for `subject` against `bureau`.
    async fn fetch(&self, bureau: Bureau, subject: &str) -> Result<Value, BureauError>;
}

/// Build the client selected by `settings.source`.
pub fn client_from_settings(settings: &BureauSettings) -> Result<Arc<dyn BureauClient>> {
    match settings.source {
        SourceKind::Http => Ok(Arc::new(HttpBureauClient::new(settings)?)),
        SourceKind::Fixture => Ok(Arc::new(FixtureBureauClient::new())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_source_requires_endpoint() {
        let settings = BureauSettings::default();
        let err = client_from_settings(&settings)
            .err()
            .expect("missing endpoint should error");
        assert!(err.to_string().contains("CREDIT_LENS_ENDPOINT"));
    }

    #[tokio::test]
    async fn fixture_source_serves_documents() {
        let settings = BureauSettings {
            source: SourceKind::Fixture,
            ..BureauSettings::default()
        };
        let client = client_from_settings(&settings).unwrap();
        let raw = client.fetch(Bureau::Equifax, "ABCDE1234F").await.unwrap();
        assert_eq!(raw["status"], "success");
    }
}
