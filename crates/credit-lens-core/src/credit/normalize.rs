use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use super::Bureau;
use crate::error::InvalidLoanPurpose;

/// Intended use of credit; selects the bureau weighting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoanPurpose {
    #[default]
    Personal,
    Business,
    Home,
    Car,
    Education,
}

impl LoanPurpose {
    pub const ALL: [LoanPurpose; 5] = [
        LoanPurpose::Personal,
        LoanPurpose::Business,
        LoanPurpose::Home,
        LoanPurpose::Car,
        LoanPurpose::Education,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Personal => "personal",
            Self::Business => "business",
            Self::Home => "home",
            Self::Car => "car",
            Self::Education => "education",
        }
    }

    pub fn weights(self) -> PurposeWeights {
        let (cibil, crif, equifax, experian) = match self {
            Self::Personal => (0.50, 0.20, 0.20, 0.10),
            Self::Business => (0.30, 0.40, 0.20, 0.10),
            Self::Home => (0.40, 0.30, 0.20, 0.10),
            Self::Car => (0.35, 0.25, 0.30, 0.10),
            Self::Education => (0.30, 0.30, 0.25, 0.15),
        };
        PurposeWeights {
            cibil,
            crif,
            equifax,
            experian,
        }
    }
}

impl FromStr for LoanPurpose {
    type Err = InvalidLoanPurpose;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let key = value.trim();
        Self::ALL
            .into_iter()
            .find(|purpose| purpose.as_str().eq_ignore_ascii_case(key))
            .ok_or_else(|| InvalidLoanPurpose(value.to_string()))
    }
}

impl fmt::Display for LoanPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the weight table; the four weights sum to 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PurposeWeights {
    pub cibil: f64,
    pub crif: f64,
    pub equifax: f64,
    pub experian: f64,
}

impl PurposeWeights {
    pub fn for_bureau(&self, bureau: Bureau) -> f64 {
        match bureau {
            Bureau::Cibil => self.cibil,
            Bureau::CrifHighmark => self.crif,
            Bureau::Equifax => self.equifax,
            Bureau::Experian => self.experian,
        }
    }

    pub fn total(&self) -> f64 {
        self.cibil + self.crif + self.equifax + self.experian
    }
}

/// Scores feeding the weighted evaluation, one per bureau.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BureauScores {
    pub cibil: u32,
    pub crif: u32,
    pub equifax: u32,
    pub experian: u32,
}

impl BureauScores {
    pub fn get(&self, bureau: Bureau) -> u32 {
        match bureau {
            Bureau::Cibil => self.cibil,
            Bureau::CrifHighmark => self.crif,
            Bureau::Equifax => self.equifax,
            Bureau::Experian => self.experian,
        }
    }
}

/// Column order of the weight table.
const WEIGHT_COLUMNS: [Bureau; 4] = [
    Bureau::Cibil,
    Bureau::CrifHighmark,
    Bureau::Equifax,
    Bureau::Experian,
];

/// Contribution of one bureau toward the normalized score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BureauContribution {
    pub bureau: Bureau,
    pub score: u32,
    pub weight: f64,
    pub weighted: f64,
}

/// Explains how a normalized score was derived.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub purpose: LoanPurpose,
    pub contributions: Vec<BureauContribution>,
    pub weighted_total: f64,
    pub score: u32,
}

pub fn score_breakdown(scores: &BureauScores, purpose: LoanPurpose) -> ScoreBreakdown {
    let weights = purpose.weights();
    let contributions: Vec<_> = WEIGHT_COLUMNS
        .into_iter()
        .map(|bureau| {
            let score = scores.get(bureau);
            let weight = weights.for_bureau(bureau);
            BureauContribution {
                bureau,
                score,
                weight,
                weighted: f64::from(score) * weight,
            }
        })
        .collect();
    let weighted_total: f64 = contributions.iter().map(|c| c.weighted).sum();
    ScoreBreakdown {
        purpose,
        contributions,
        weighted_total,
        score: weighted_total.round() as u32,
    }
}

/// Weighted sum of the four scores, rounded to the nearest integer.
pub fn normalize_score(scores: &BureauScores, purpose: LoanPurpose) -> u32 {
    score_breakdown(scores, purpose).score
}

/// String-keyed entry point; rejects unknown purposes before computing anything.
pub fn normalize(scores: &BureauScores, purpose: &str) -> Result<u32, InvalidLoanPurpose> {
    let purpose = purpose.parse::<LoanPurpose>()?;
    Ok(normalize_score(scores, purpose))
}
