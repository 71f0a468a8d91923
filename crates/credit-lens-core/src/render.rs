use std::fmt::Write;

use serde::Serialize;

use crate::aggregate::{Snapshot, SnapshotStatus};
use crate::credit::normalize::{LoanPurpose, ScoreBreakdown};
use crate::credit::{BankCount, Bureau, CreditReport, Loan, ReportSet, ReportSource};

/// Format styles supported when rendering a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Human,
    Json,
    Yaml,
}

/// Produce a printable view of a snapshot in the desired format.
pub fn render_snapshot(snapshot: &Snapshot, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Human => render_human(snapshot),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&SnapshotView::from(snapshot))?),
        OutputFormat::Yaml => Ok(serde_yaml::to_string(&SnapshotView::from(snapshot))?),
    }
}

/// Human-readable explanation of a normalized score.
pub fn render_breakdown(breakdown: &ScoreBreakdown) -> anyhow::Result<String> {
    let mut out = String::new();
    writeln!(out, "Score breakdown ({}):", breakdown.purpose)?;
    for contribution in &breakdown.contributions {
        writeln!(
            out,
            "  - {bureau:<13}: {score:>3} x {weight:.2} = {weighted:.1}",
            bureau = contribution.bureau.name(),
            score = contribution.score,
            weight = contribution.weight,
            weighted = contribution.weighted,
        )?;
    }
    writeln!(
        out,
        "Weighted total: {:.1} • Normalized score: {}",
        breakdown.weighted_total, breakdown.score
    )?;
    Ok(out)
}

/// Tabular view of the per-purpose bureau weights.
pub fn render_weight_table() -> anyhow::Result<String> {
    let mut out = String::new();
    writeln!(
        out,
        "{:<10} {:>6} {:>6} {:>8} {:>9}",
        "purpose", "cibil", "crif", "equifax", "experian"
    )?;
    for purpose in LoanPurpose::ALL {
        let weights = purpose.weights();
        writeln!(
            out,
            "{:<10} {:>6.2} {:>6.2} {:>8.2} {:>9.2}",
            purpose.as_str(),
            weights.cibil,
            weights.crif,
            weights.equifax,
            weights.experian
        )?;
    }
    Ok(out)
}

fn render_human(snapshot: &Snapshot) -> anyhow::Result<String> {
    let mut out = String::new();
    match &snapshot.subject {
        Some(subject) => {
            let name = snapshot
                .reports
                .normalized()
                .map(|report| report.subject_name.as_str())
                .filter(|name| !name.is_empty())
                .unwrap_or("unknown subject");
            writeln!(out, "Subject: {name} ({subject})")?;
        }
        None => writeln!(out, "Subject: none selected (placeholder reports)")?,
    }
    writeln!(
        out,
        "Status: {} • snapshot v{}",
        status_label(&snapshot.status),
        snapshot.version
    )?;

    for source in display_order() {
        if let Some(report) = snapshot.reports.get(source) {
            writeln!(out)?;
            render_report(&mut out, report)?;
        }
    }

    if let Some(breakdown) = &snapshot.breakdown {
        writeln!(out)?;
        out.push_str(&render_breakdown(breakdown)?);
    }
    Ok(out)
}

fn display_order() -> impl Iterator<Item = ReportSource> {
    std::iter::once(ReportSource::Normalized).chain(Bureau::ALL.into_iter().map(ReportSource::from))
}

fn status_label(status: &SnapshotStatus) -> String {
    match status {
        SnapshotStatus::Idle => "idle".into(),
        SnapshotStatus::Loading => "loading".into(),
        SnapshotStatus::Ready => "ready".into(),
        SnapshotStatus::Failed(message) => format!("failed ({message})"),
    }
}

fn render_report(out: &mut String, report: &CreditReport) -> anyhow::Result<()> {
    if report.is_placeholder() {
        writeln!(out, "{}: no data", report.bureau)?;
        return Ok(());
    }
    writeln!(
        out,
        "{source}: {score} ({rating}) [{min}-{max}] updated {updated}",
        source = report.bureau,
        score = report.credit_score,
        rating = report.rating(),
        min = report.score_range.min,
        max = report.score_range.max,
        updated = report.last_updated,
    )?;
    render_loans(out, "Current loans", &report.current_loans)?;
    render_loans(out, "Settled loans", &report.settled_loans)?;
    render_counts(out, "Defaults", &report.defaults)?;
    render_counts(out, "Missed payments", &report.missed_payments)?;
    Ok(())
}

fn render_loans(out: &mut String, label: &str, loans: &[Loan]) -> anyhow::Result<()> {
    if loans.is_empty() {
        writeln!(out, "  {label}: none")?;
        return Ok(());
    }
    writeln!(out, "  {label}:")?;
    for loan in loans {
        writeln!(
            out,
            "    - {bank}: ₹{amount} over {months} months",
            bank = loan.bank,
            amount = loan.amount,
            months = loan.time_period
        )?;
    }
    Ok(())
}

fn render_counts(out: &mut String, label: &str, counts: &[BankCount]) -> anyhow::Result<()> {
    if counts.is_empty() {
        writeln!(out, "  {label}: none")?;
        return Ok(());
    }
    let joined = counts
        .iter()
        .map(|entry| format!("{} ({})", entry.bank, entry.count))
        .collect::<Vec<_>>()
        .join(", ");
    writeln!(out, "  {label}: {joined}")?;
    Ok(())
}

#[derive(Debug, Serialize)]
struct SnapshotView<'a> {
    version: u64,
    status: &'a SnapshotStatus,
    subject: Option<&'a str>,
    purpose: Option<LoanPurpose>,
    reports: &'a ReportSet,
    breakdown: Option<&'a ScoreBreakdown>,
}

impl<'a> From<&'a Snapshot> for SnapshotView<'a> {
    fn from(snapshot: &'a Snapshot) -> Self {
        Self {
            version: snapshot.version,
            status: &snapshot.status,
            subject: snapshot.subject.as_deref(),
            purpose: snapshot.purpose,
            reports: &snapshot.reports,
            breakdown: snapshot.breakdown.as_ref(),
        }
    }
}
