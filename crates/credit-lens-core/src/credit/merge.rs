use std::{collections::HashSet, hash::Hash};

use tracing::trace;

use super::{BankCount, Bureau, BureauReports, Loan};

/// Deduplicated union of the records reported across all bureaus.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergedRecords {
    pub subject_name: String,
    pub current_loans: Vec<Loan>,
    pub settled_loans: Vec<Loan>,
    pub defaults: Vec<BankCount>,
    pub missed_payments: Vec<BankCount>,
}

/// Union the four bureau reports in [`Bureau::MERGE_ORDER`].
///
/// Loans are identified by `(bank, amount)` and bank tallies by bank alone; the
/// first record seen for an identity wins and later ones are dropped without
/// reconciling terms or counts. The subject name is the first non-empty one.
pub fn merge_records(reports: &BureauReports) -> MergedRecords {
    let ordered: Vec<_> = Bureau::MERGE_ORDER
        .iter()
        .map(|bureau| reports.get(*bureau))
        .collect();

    let subject_name = ordered
        .iter()
        .map(|report| report.subject_name.trim())
        .find(|name| !name.is_empty())
        .unwrap_or_default()
        .to_string();

    MergedRecords {
        subject_name,
        current_loans: union_by(
            ordered.iter().map(|report| report.current_loans.as_slice()),
            loan_identity,
        ),
        settled_loans: union_by(
            ordered.iter().map(|report| report.settled_loans.as_slice()),
            loan_identity,
        ),
        defaults: union_by(
            ordered.iter().map(|report| report.defaults.as_slice()),
            |record| record.bank.clone(),
        ),
        missed_payments: union_by(
            ordered.iter().map(|report| report.missed_payments.as_slice()),
            |record| record.bank.clone(),
        ),
    }
}

fn loan_identity(loan: &Loan) -> (String, u64) {
    (loan.bank.clone(), loan.amount)
}

fn union_by<'a, T, K, I, F>(sources: I, key: F) -> Vec<T>
where
    T: Clone + 'a,
    K: Eq + Hash,
    I: IntoIterator<Item = &'a [T]>,
    F: Fn(&T) -> K,
{
    let mut seen = HashSet::new();
    let mut merged = Vec::new();
    for source in sources {
        for record in source {
            if seen.insert(key(record)) {
                merged.push(record.clone());
            } else {
                trace!("dropping duplicate record already seen in an earlier bureau");
            }
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credit::{CreditReport, ReportSource};
    use proptest::prelude::*;

    fn placeholder(bureau: Bureau) -> CreditReport {
        CreditReport::placeholder(ReportSource::from(bureau))
    }

    fn reports_with(edit: impl Fn(Bureau, &mut CreditReport)) -> BureauReports {
        let build = |bureau: Bureau| {
            let mut report = placeholder(bureau);
            edit(bureau, &mut report);
            report
        };
        BureauReports {
            cibil: build(Bureau::Cibil),
            experian: build(Bureau::Experian),
            equifax: build(Bureau::Equifax),
            crif_highmark: build(Bureau::CrifHighmark),
        }
    }

    #[test]
    fn same_bank_and_amount_is_one_loan_regardless_of_term() {
        let reports = reports_with(|bureau, report| match bureau {
            Bureau::Cibil => report.current_loans = vec![Loan::new(1_500_000, "HDFC Bank", 60)],
            Bureau::Experian => report.current_loans = vec![Loan::new(1_500_000, "HDFC Bank", 48)],
            _ => {}
        });
        let merged = merge_records(&reports);
        assert_eq!(merged.current_loans, vec![Loan::new(1_500_000, "HDFC Bank", 60)]);
    }

    #[test]
    fn different_amounts_at_same_bank_are_distinct_loans() {
        let reports = reports_with(|bureau, report| match bureau {
            Bureau::Cibil => report.current_loans = vec![Loan::new(1_500_000, "HDFC Bank", 60)],
            Bureau::Equifax => report.current_loans = vec![Loan::new(200_000, "HDFC Bank", 12)],
            _ => {}
        });
        assert_eq!(merge_records(&reports).current_loans.len(), 2);
    }

    #[test]
    fn default_present_in_one_bureau_appears_once() {
        let reports = reports_with(|bureau, report| {
            if bureau == Bureau::Experian {
                report.defaults = vec![BankCount::new("Axis Bank", 1)];
            }
        });
        assert_eq!(
            merge_records(&reports).defaults,
            vec![BankCount::new("Axis Bank", 1)]
        );
    }

    #[test]
    fn first_bureau_in_merge_order_wins_tally_conflicts() {
        // Equifax precedes Experian and CRIF in merge order even though it is fetched later.
        let reports = reports_with(|bureau, report| match bureau {
            Bureau::Equifax => report.defaults = vec![BankCount::new("Axis Bank", 0)],
            Bureau::Experian | Bureau::CrifHighmark => {
                report.defaults = vec![BankCount::new("Axis Bank", 1)]
            }
            Bureau::Cibil => {}
        });
        assert_eq!(
            merge_records(&reports).defaults,
            vec![BankCount::new("Axis Bank", 0)]
        );
    }

    #[test]
    fn missed_payments_dedupe_by_bank() {
        let reports = reports_with(|bureau, report| match bureau {
            Bureau::Cibil => {
                report.missed_payments =
                    vec![BankCount::new("HDFC Bank", 2), BankCount::new("ICICI Bank", 1)]
            }
            _ => report.missed_payments = vec![BankCount::new("HDFC Bank", 1)],
        });
        assert_eq!(
            merge_records(&reports).missed_payments,
            vec![BankCount::new("HDFC Bank", 2), BankCount::new("ICICI Bank", 1)]
        );
    }

    #[test]
    fn subject_name_is_first_non_empty_in_merge_order() {
        let reports = reports_with(|bureau, report| match bureau {
            Bureau::Equifax => report.subject_name = "R. Sharma".into(),
            Bureau::Experian => report.subject_name = "Rahul Sharma".into(),
            _ => report.subject_name = "  ".into(),
        });
        assert_eq!(merge_records(&reports).subject_name, "R. Sharma");
    }

    #[test]
    fn current_and_settled_loans_are_merged_separately() {
        let reports = reports_with(|bureau, report| {
            if bureau == Bureau::Cibil {
                report.current_loans = vec![Loan::new(500_000, "SBI Bank", 36)];
            } else {
                report.settled_loans = vec![Loan::new(500_000, "SBI Bank", 36)];
            }
        });
        let merged = merge_records(&reports);
        assert_eq!(merged.current_loans.len(), 1);
        assert_eq!(merged.settled_loans.len(), 1);
    }

    fn loan_strategy() -> impl Strategy<Value = Loan> {
        (
            prop::sample::select(vec!["HDFC Bank", "ICICI Bank", "SBI Bank", "Axis Bank"]),
            prop::sample::select(vec![50_000u64, 200_000, 1_500_000]),
            1u32..120,
        )
            .prop_map(|(bank, amount, term)| Loan::new(amount, bank, term))
    }

    proptest! {
        #[test]
        fn merged_loans_are_unique_and_cover_every_identity(
            cibil in prop::collection::vec(loan_strategy(), 0..6),
            experian in prop::collection::vec(loan_strategy(), 0..6),
            equifax in prop::collection::vec(loan_strategy(), 0..6),
            crif in prop::collection::vec(loan_strategy(), 0..6),
        ) {
            let inputs = [cibil, experian, equifax, crif];
            let reports = reports_with(|bureau, report| {
                let idx = Bureau::ALL.iter().position(|b| *b == bureau).unwrap_or(0);
                report.current_loans = inputs[idx].clone();
            });
            let merged = merge_records(&reports).current_loans;

            let identities: HashSet<_> = merged.iter().map(loan_identity).collect();
            prop_assert_eq!(identities.len(), merged.len());
            for loan in inputs.iter().flatten() {
                prop_assert!(identities.contains(&loan_identity(loan)));
            }
        }
    }
}
