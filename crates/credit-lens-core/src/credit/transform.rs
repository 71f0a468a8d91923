use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;
use tracing::trace;

use super::{today, BankCount, Bureau, CreditReport, Loan, ScoreRange};
use crate::error::BureauError;

const SUCCESS_STATUS: &str = "success";

/// Map one bureau's raw response document into the canonical report shape.
///
/// Pure mapping: collections absent from the payload become empty, count maps
/// become `{bank, count}` sequences ordered by bank name, and the score range is
/// pinned to the domain bounds. Records are kept exactly as the bureau reported
/// them; cross-bureau duplicates are resolved by the merger, not here.
pub fn transform_response(
    bureau: Bureau,
    subject_id: &str,
    raw: Value,
) -> Result<CreditReport, BureauError> {
    let envelope: RawEnvelope = serde_json::from_value(raw)
        .map_err(|err| BureauError::malformed(bureau, format!("unexpected document shape: {err}")))?;

    match envelope.status.as_deref() {
        Some(status) if status.eq_ignore_ascii_case(SUCCESS_STATUS) => {}
        Some(status) => {
            return Err(BureauError::malformed(
                bureau,
                format!("status `{status}` is not `{SUCCESS_STATUS}`"),
            ))
        }
        None => return Err(BureauError::malformed(bureau, "status field is missing")),
    }

    let data = envelope
        .data
        .ok_or_else(|| BureauError::malformed(bureau, "data payload is missing"))?;
    let credit_score = parse_score(bureau, data.credit_score.as_ref())?;
    trace!(%bureau, credit_score, "transformed bureau payload");

    Ok(CreditReport {
        bureau: bureau.into(),
        subject_id: subject_id.to_string(),
        subject_name: data.subject_name.unwrap_or_default().trim().to_string(),
        credit_score,
        score_range: ScoreRange::DOMAIN,
        last_updated: data.last_updated.unwrap_or_else(today),
        current_loans: loans(data.current_loans),
        settled_loans: loans(data.settled_loans),
        defaults: data.defaults.map(RawCounts::into_sequence).unwrap_or_default(),
        missed_payments: data
            .missed_payments
            .map(RawCounts::into_sequence)
            .unwrap_or_default(),
    })
}

fn parse_score(bureau: Bureau, value: Option<&Value>) -> Result<u32, BureauError> {
    let score = value
        .and_then(Value::as_f64)
        .ok_or_else(|| BureauError::malformed(bureau, "score field is missing or not a number"))?;
    if !score.is_finite() || score < 0.0 {
        return Err(BureauError::malformed(
            bureau,
            format!("score {score} is not a non-negative number"),
        ));
    }
    Ok(score.round() as u32)
}

fn loans(raw: Option<Vec<RawLoan>>) -> Vec<Loan> {
    raw.unwrap_or_default()
        .into_iter()
        .map(|loan| Loan {
            amount: loan.amount,
            bank: loan.bank,
            time_period: loan.time_period,
        })
        .collect()
}

#[derive(Deserialize)]
struct RawEnvelope {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    data: Option<RawReport>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReport {
    #[serde(default, alias = "name", alias = "username")]
    subject_name: Option<String>,
    #[serde(default, alias = "score")]
    credit_score: Option<Value>,
    #[serde(default, alias = "last_updated")]
    last_updated: Option<NaiveDate>,
    #[serde(default, alias = "current_loans")]
    current_loans: Option<Vec<RawLoan>>,
    #[serde(default, alias = "settled_loans")]
    settled_loans: Option<Vec<RawLoan>>,
    #[serde(default)]
    defaults: Option<RawCounts>,
    #[serde(default, alias = "missed_payments")]
    missed_payments: Option<RawCounts>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawLoan {
    amount: u64,
    bank: String,
    #[serde(default, alias = "time_period", alias = "term")]
    time_period: u32,
}

/// Bank tallies arrive either as a `bank -> count` object or as an explicit list.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawCounts {
    Map(BTreeMap<String, u32>),
    List(Vec<BankCount>),
}

impl RawCounts {
    fn into_sequence(self) -> Vec<BankCount> {
        match self {
            Self::Map(map) => map
                .into_iter()
                .map(|(bank, count)| BankCount { bank, count })
                .collect(),
            Self::List(list) => list,
        }
    }
}
