use std::{collections::BTreeMap, fmt};

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub mod merge;
pub mod normalize;
pub mod transform;

/// Lowest score any bureau in this domain reports.
pub const SCORE_MIN: u32 = 300;
/// Highest score any bureau in this domain reports.
pub const SCORE_MAX: u32 = 900;

/// Independent agency reporting a score and loan history for a subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Bureau {
    #[serde(rename = "CIBIL")]
    Cibil,
    Experian,
    Equifax,
    #[serde(rename = "CRIF Highmark")]
    CrifHighmark,
}

impl Bureau {
    pub const ALL: [Bureau; 4] = [
        Bureau::Cibil,
        Bureau::Experian,
        Bureau::Equifax,
        Bureau::CrifHighmark,
    ];

    /// Order in which bureau reports are consulted when records are merged.
    pub const MERGE_ORDER: [Bureau; 4] = [
        Bureau::Cibil,
        Bureau::Equifax,
        Bureau::Experian,
        Bureau::CrifHighmark,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Cibil => "CIBIL",
            Self::Experian => "Experian",
            Self::Equifax => "Equifax",
            Self::CrifHighmark => "CRIF Highmark",
        }
    }

    /// URL path segment identifying the bureau on the report service.
    pub fn slug(self) -> &'static str {
        match self {
            Self::Cibil => "cibil",
            Self::Experian => "experian",
            Self::Equifax => "equifax",
            Self::CrifHighmark => "crif",
        }
    }
}

impl fmt::Display for Bureau {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Key a report is published under: one of the bureaus or the synthetic aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ReportSource {
    #[serde(rename = "CIBIL")]
    Cibil,
    Experian,
    Equifax,
    #[serde(rename = "CRIF Highmark")]
    CrifHighmark,
    #[serde(rename = "Normalized Evaluation")]
    Normalized,
}

impl ReportSource {
    pub const ALL: [ReportSource; 5] = [
        ReportSource::Cibil,
        ReportSource::Experian,
        ReportSource::Equifax,
        ReportSource::CrifHighmark,
        ReportSource::Normalized,
    ];

    pub fn bureau(self) -> Option<Bureau> {
        match self {
            Self::Cibil => Some(Bureau::Cibil),
            Self::Experian => Some(Bureau::Experian),
            Self::Equifax => Some(Bureau::Equifax),
            Self::CrifHighmark => Some(Bureau::CrifHighmark),
            Self::Normalized => None,
        }
    }

    pub fn name(self) -> &'static str {
        self.bureau()
            .map(Bureau::name)
            .unwrap_or("Normalized Evaluation")
    }
}

impl From<Bureau> for ReportSource {
    fn from(bureau: Bureau) -> Self {
        match bureau {
            Bureau::Cibil => Self::Cibil,
            Bureau::Experian => Self::Experian,
            Bureau::Equifax => Self::Equifax,
            Bureau::CrifHighmark => Self::CrifHighmark,
        }
    }
}

impl fmt::Display for ReportSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Display bounds for a score; always `min < max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreRange {
    pub min: u32,
    pub max: u32,
}

impl ScoreRange {
    pub const DOMAIN: ScoreRange = ScoreRange {
        min: SCORE_MIN,
        max: SCORE_MAX,
    };
}

impl Default for ScoreRange {
    fn default() -> Self {
        Self::DOMAIN
    }
}

/// Qualitative band for a credit score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoreRating {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl ScoreRating {
    pub fn from_score(score: u32) -> Self {
        if score >= 750 {
            Self::Excellent
        } else if score >= 700 {
            Self::Good
        } else if score >= 650 {
            Self::Fair
        } else {
            Self::Poor
        }
    }
}

impl fmt::Display for ScoreRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Excellent => "Excellent",
            Self::Good => "Good",
            Self::Fair => "Fair",
            Self::Poor => "Poor",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Loan {
    /// Principal in rupees.
    pub amount: u64,
    pub bank: String,
    /// Term in months.
    pub time_period: u32,
}

impl Loan {
    pub fn new(amount: u64, bank: impl Into<String>, time_period: u32) -> Self {
        Self {
            amount,
            bank: bank.into(),
            time_period,
        }
    }
}

/// Per-bank tally used for defaults and missed payments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankCount {
    pub bank: String,
    pub count: u32,
}

impl BankCount {
    pub fn new(bank: impl Into<String>, count: u32) -> Self {
        Self {
            bank: bank.into(),
            count,
        }
    }
}

/// Canonical report shape every bureau payload is transformed into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditReport {
    pub bureau: ReportSource,
    /// Identifier (PAN) the report was requested for; empty on placeholders.
    pub subject_id: String,
    pub subject_name: String,
    /// `0` while no data has arrived.
    pub credit_score: u32,
    pub score_range: ScoreRange,
    pub last_updated: NaiveDate,
    pub current_loans: Vec<Loan>,
    pub settled_loans: Vec<Loan>,
    pub defaults: Vec<BankCount>,
    pub missed_payments: Vec<BankCount>,
}

impl CreditReport {
    /// Empty report shown before a bureau's data is available.
    pub fn placeholder(source: ReportSource) -> Self {
        Self {
            bureau: source,
            subject_id: String::new(),
            subject_name: String::new(),
            credit_score: 0,
            score_range: ScoreRange::DOMAIN,
            last_updated: today(),
            current_loans: Vec::new(),
            settled_loans: Vec::new(),
            defaults: Vec::new(),
            missed_payments: Vec::new(),
        }
    }

    /// True for reports that were never requested for a subject. A bureau may
    /// legitimately report a score of zero, so the score is not consulted.
    pub fn is_placeholder(&self) -> bool {
        self.subject_id.is_empty()
    }

    pub fn rating(&self) -> ScoreRating {
        ScoreRating::from_score(self.credit_score)
    }
}

pub(crate) fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// The four per-bureau reports of one successful fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BureauReports {
    pub cibil: CreditReport,
    pub experian: CreditReport,
    pub equifax: CreditReport,
    pub crif_highmark: CreditReport,
}

impl BureauReports {
    pub fn get(&self, bureau: Bureau) -> &CreditReport {
        match bureau {
            Bureau::Cibil => &self.cibil,
            Bureau::Experian => &self.experian,
            Bureau::Equifax => &self.equifax,
            Bureau::CrifHighmark => &self.crif_highmark,
        }
    }

    pub fn scores(&self) -> normalize::BureauScores {
        normalize::BureauScores {
            cibil: self.cibil.credit_score,
            crif: self.crif_highmark.credit_score,
            equifax: self.equifax.credit_score,
            experian: self.experian.credit_score,
        }
    }

    pub fn into_reports(self) -> impl Iterator<Item = CreditReport> {
        [self.cibil, self.experian, self.equifax, self.crif_highmark].into_iter()
    }
}

/// Five reports keyed by source, as exposed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ReportSet {
    reports: BTreeMap<ReportSource, CreditReport>,
}

impl ReportSet {
    /// Set of placeholders renderable before any data arrives.
    pub fn placeholder() -> Self {
        let reports = ReportSource::ALL
            .into_iter()
            .map(|source| (source, CreditReport::placeholder(source)))
            .collect();
        Self { reports }
    }

    pub fn new(bureaus: BureauReports, normalized: CreditReport) -> Self {
        let mut reports: BTreeMap<_, _> = bureaus
            .into_reports()
            .map(|report| (report.bureau, report))
            .collect();
        reports.insert(ReportSource::Normalized, normalized);
        Self { reports }
    }

    pub fn get(&self, source: ReportSource) -> Option<&CreditReport> {
        self.reports.get(&source)
    }

    pub fn normalized(&self) -> Option<&CreditReport> {
        self.get(ReportSource::Normalized)
    }

    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ReportSource, &CreditReport)> {
        self.reports.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_thresholds_match_dashboard_bands() {
        assert_eq!(ScoreRating::from_score(0), ScoreRating::Poor);
        assert_eq!(ScoreRating::from_score(649), ScoreRating::Poor);
        assert_eq!(ScoreRating::from_score(650), ScoreRating::Fair);
        assert_eq!(ScoreRating::from_score(700), ScoreRating::Good);
        assert_eq!(ScoreRating::from_score(750), ScoreRating::Excellent);
    }

    #[test]
    fn placeholder_set_covers_every_source() {
        let set = ReportSet::placeholder();
        assert_eq!(set.len(), 5);
        for source in ReportSource::ALL {
            let report = set.get(source).expect("placeholder present");
            assert!(report.is_placeholder());
            assert!(report.current_loans.is_empty());
            assert!(report.defaults.is_empty());
            assert!(report.score_range.min < report.score_range.max);
        }
    }

    #[test]
    fn report_set_serializes_with_display_keys() {
        let value = serde_json::to_value(ReportSet::placeholder()).unwrap();
        assert!(value.get("Normalized Evaluation").is_some());
        assert!(value.get("CRIF Highmark").is_some());
        assert_eq!(value["CIBIL"]["creditScore"], serde_json::json!(0));
        assert_eq!(value["CIBIL"]["scoreRange"]["max"], serde_json::json!(900));
    }
}
