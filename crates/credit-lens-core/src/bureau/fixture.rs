use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use super::BureauClient;
use crate::credit::Bureau;
use crate::error::BureauError;

/// Serves built-in sample documents instead of calling a report service.
///
/// Each bureau's document uses that bureau's own field spellings, so the
/// fixture exercises the same normalization path as live data. Any bureau can
/// be told to fail with a transport error.
#[derive(Debug, Clone)]
pub struct FixtureBureauClient {
    documents: HashMap<Bureau, Value>,
    failing: HashSet<Bureau>,
}

impl Default for FixtureBureauClient {
    fn default() -> Self {
        Self::new()
    }
}

impl FixtureBureauClient {
    pub fn new() -> Self {
        let documents = Bureau::ALL
            .into_iter()
            .map(|bureau| (bureau, sample_document(bureau)))
            .collect();
        Self {
            documents,
            failing: HashSet::new(),
        }
    }

    /// Make every fetch against `bureau` fail as if the endpoint were unreachable.
    pub fn with_failure(mut self, bureau: Bureau) -> Self {
        self.failing.insert(bureau);
        self
    }

    /// Replace the document served for `bureau`.
    pub fn with_document(mut self, bureau: Bureau, document: Value) -> Self {
        self.documents.insert(bureau, document);
        self
    }
}

#[async_trait]
impl BureauClient for FixtureBureauClient {
    async fn fetch(&self, bureau: Bureau, subject: &str) -> Result<Value, BureauError> {
        if self.failing.contains(&bureau) {
            return Err(BureauError::transport(bureau, "fixture configured to fail"));
        }
        debug!(%bureau, subject, "serving fixture document");
        self.documents
            .get(&bureau)
            .cloned()
            .ok_or_else(|| BureauError::transport(bureau, "no fixture document"))
    }
}

fn sample_document(bureau: Bureau) -> Value {
    match bureau {
        Bureau::Cibil => json!({
            "status": "success",
            "data": {
                "username": "Rahul Sharma",
                "creditScore": 765,
                "lastUpdated": "2023-05-15",
                "currentLoans": [
                    { "amount": 1500000, "bank": "HDFC Bank", "timePeriod": 60 },
                    { "amount": 200000, "bank": "ICICI Bank", "timePeriod": 12 }
                ],
                "settledLoans": [
                    { "amount": 500000, "bank": "SBI Bank", "timePeriod": 36 }
                ],
                "defaults": { "Axis Bank": 1 },
                "missedPayments": { "HDFC Bank": 2, "ICICI Bank": 1 }
            }
        }),
        Bureau::Experian => json!({
            "status": "success",
            "data": {
                "name": "Rahul Sharma",
                "score": 742,
                "last_updated": "2023-04-28",
                "current_loans": [
                    { "amount": 1500000, "bank": "HDFC Bank", "time_period": 60 },
                    { "amount": 200000, "bank": "ICICI Bank", "time_period": 12 },
                    { "amount": 50000, "bank": "Standard Chartered", "time_period": 6 }
                ],
                "settled_loans": [
                    { "amount": 500000, "bank": "SBI Bank", "time_period": 36 },
                    { "amount": 100000, "bank": "Kotak Bank", "time_period": 12 }
                ],
                "defaults": { "Axis Bank": 1 },
                "missed_payments": { "HDFC Bank": 1, "ICICI Bank": 1 }
            }
        }),
        Bureau::Equifax => json!({
            "status": "success",
            "data": {
                "subjectName": "Rahul Sharma",
                "creditScore": 754,
                "lastUpdated": "2023-05-10",
                "currentLoans": [
                    { "amount": 1500000, "bank": "HDFC Bank", "timePeriod": 60 },
                    { "amount": 200000, "bank": "ICICI Bank", "timePeriod": 12 }
                ],
                "settledLoans": [
                    { "amount": 500000, "bank": "SBI Bank", "timePeriod": 36 }
                ],
                "defaults": [{ "bank": "Axis Bank", "count": 0 }],
                "missedPayments": [{ "bank": "HDFC Bank", "count": 1 }]
            }
        }),
        Bureau::CrifHighmark => json!({
            "status": "success",
            "data": {
                "name": "Rahul Sharma",
                "score": 748,
                "lastUpdated": "2023-05-22",
                "currentLoans": [
                    { "amount": 1500000, "bank": "HDFC Bank", "term": 60 },
                    { "amount": 200000, "bank": "ICICI Bank", "term": 12 }
                ],
                "settledLoans": [
                    { "amount": 500000, "bank": "SBI Bank", "term": 36 }
                ],
                "defaults": { "Axis Bank": 1 },
                "missedPayments": { "HDFC Bank": 2, "ICICI Bank": 1 }
            }
        }),
    }
}
