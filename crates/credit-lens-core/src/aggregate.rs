use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, instrument, warn};

use crate::bureau::BureauClient;
use crate::credit::merge::{merge_records, MergedRecords};
use crate::credit::normalize::{score_breakdown, LoanPurpose, ScoreBreakdown};
use crate::credit::transform::transform_response;
use crate::credit::{
    today, Bureau, BureauReports, CreditReport, ReportSet, ReportSource, ScoreRange,
};
use crate::error::{AggregationError, BureauError, InvalidLoanPurpose};
use crate::notify::{Notification, NotificationSink};

/// Subject identifier and loan purpose as received from navigation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregationRequest {
    pub subject: Option<String>,
    pub purpose: Option<String>,
}

impl AggregationRequest {
    pub fn new(subject: Option<String>, purpose: Option<String>) -> Self {
        Self { subject, purpose }
    }

    pub fn for_subject(subject: impl Into<String>) -> Self {
        Self {
            subject: Some(subject.into()),
            purpose: None,
        }
    }

    pub fn with_purpose(mut self, purpose: impl Into<String>) -> Self {
        self.purpose = Some(purpose.into());
        self
    }

    fn subject(&self) -> Option<&str> {
        self.subject
            .as_deref()
            .map(str::trim)
            .filter(|subject| !subject.is_empty())
    }

    fn purpose(&self) -> Result<LoanPurpose, InvalidLoanPurpose> {
        match self.purpose.as_deref().map(str::trim) {
            Some(purpose) if !purpose.is_empty() => purpose.parse(),
            _ => Ok(LoanPurpose::default()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "message", rename_all = "lowercase")]
pub enum SnapshotStatus {
    Idle,
    Loading,
    Ready,
    Failed(String),
}

/// Immutable view handed to readers; replaced wholesale on every publish.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Incremented each time the report set is replaced.
    pub version: u64,
    pub status: SnapshotStatus,
    pub subject: Option<String>,
    pub purpose: Option<LoanPurpose>,
    pub reports: Arc<ReportSet>,
    pub breakdown: Option<ScoreBreakdown>,
}

impl Snapshot {
    /// Placeholder state before any subject has been loaded.
    pub fn initial() -> Self {
        Self {
            version: 0,
            status: SnapshotStatus::Idle,
            subject: None,
            purpose: None,
            reports: Arc::new(ReportSet::placeholder()),
            breakdown: None,
        }
    }
}

/// Coordinates the four bureau fetches and publishes the resulting report set.
pub struct Aggregator {
    client: Arc<dyn BureauClient>,
    notifier: Arc<dyn NotificationSink>,
    snapshot: watch::Sender<Arc<Snapshot>>,
    /// Sequence number handed to each refresh as it starts.
    requests: AtomicU64,
    /// Highest sequence number that has written the snapshot.
    applied: AtomicU64,
}

impl Aggregator {
    pub fn new(client: Arc<dyn BureauClient>, notifier: Arc<dyn NotificationSink>) -> Self {
        let (snapshot, _) = watch::channel(Arc::new(Snapshot::initial()));
        Self {
            client,
            notifier,
            snapshot,
            requests: AtomicU64::new(0),
            applied: AtomicU64::new(0),
        }
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.snapshot.subscribe()
    }

    /// Run one aggregation attempt.
    ///
    /// Without a subject the placeholder set is published and nothing is fetched.
    /// Otherwise all four bureaus are fetched concurrently; the new set is
    /// published only if every bureau succeeded, and exactly one notification
    /// is emitted either way.
    ///
    /// Overlapping calls resolve in request order: once a later call has
    /// written the snapshot, an earlier one still in flight returns
    /// [`AggregationError::Superseded`] without publishing or notifying.
    #[instrument(name = "aggregate_reports", skip_all, fields(subject = request.subject.as_deref().unwrap_or("")))]
    pub async fn refresh(
        &self,
        request: &AggregationRequest,
    ) -> Result<Arc<Snapshot>, AggregationError> {
        let ticket = self.requests.fetch_add(1, Ordering::SeqCst) + 1;
        let Some(subject) = request.subject() else {
            debug!("no subject supplied; publishing placeholder reports");
            return self
                .publish(ticket, Snapshot::initial())
                .ok_or(AggregationError::Superseded);
        };
        let purpose = match request.purpose() {
            Ok(purpose) => purpose,
            Err(err) => {
                self.notifier.notify(Notification::failure(err.to_string()));
                return Err(err.into());
            }
        };

        if !self.set_status(ticket, SnapshotStatus::Loading) {
            debug!(ticket, "newer request already published; skipping fetch");
            return Err(AggregationError::Superseded);
        }
        let (cibil, experian, equifax, crif) = tokio::join!(
            self.fetch_report(Bureau::Cibil, subject),
            self.fetch_report(Bureau::Experian, subject),
            self.fetch_report(Bureau::Equifax, subject),
            self.fetch_report(Bureau::CrifHighmark, subject),
        );

        let reports = match collect_reports(cibil, experian, equifax, crif) {
            Ok(reports) => reports,
            Err(err) => {
                let message = err.to_string();
                if !self.set_status(ticket, SnapshotStatus::Failed(message.clone())) {
                    debug!(ticket, error = %message, "discarding failure of superseded request");
                    return Err(AggregationError::Superseded);
                }
                self.notifier.notify(Notification::failure(format!(
                    "Failed to load credit data. Please try again. ({message})"
                )));
                return Err(err);
            }
        };

        let breakdown = score_breakdown(&reports.scores(), purpose);
        let normalized = normalized_report(subject, merge_records(&reports), breakdown.score);
        let display_name = if normalized.subject_name.is_empty() {
            subject.to_string()
        } else {
            normalized.subject_name.clone()
        };
        let description = format!(
            "Loaded all four bureau reports for {display_name}; normalized {purpose} score {}.",
            breakdown.score
        );

        let Some(published) = self.publish(ticket, Snapshot {
            version: 0,
            status: SnapshotStatus::Ready,
            subject: Some(subject.to_string()),
            purpose: Some(purpose),
            reports: Arc::new(ReportSet::new(reports, normalized)),
            breakdown: Some(breakdown),
        }) else {
            debug!(ticket, "discarding report set of superseded request");
            return Err(AggregationError::Superseded);
        };
        debug!(version = published.version, "published report set");
        self.notifier.notify(Notification::success(description));
        Ok(published)
    }

    async fn fetch_report(&self, bureau: Bureau, subject: &str) -> Result<CreditReport, BureauError> {
        let result = self
            .client
            .fetch(bureau, subject)
            .await
            .and_then(|raw| transform_response(bureau, subject, raw));
        if let Err(err) = &result {
            warn!(bureau = %err.bureau(), error = %err, "bureau report unavailable");
        }
        result
    }

    /// Run `update` against the snapshot unless a later request already wrote it.
    ///
    /// The check and the write happen under the channel's write lock, so two
    /// requests can never interleave between them.
    fn apply(&self, ticket: u64, update: impl FnOnce(&mut Arc<Snapshot>)) -> bool {
        self.snapshot.send_if_modified(|current| {
            if ticket < self.applied.load(Ordering::SeqCst) {
                return false;
            }
            self.applied.store(ticket, Ordering::SeqCst);
            update(current);
            true
        })
    }

    fn set_status(&self, ticket: u64, status: SnapshotStatus) -> bool {
        self.apply(ticket, |current| {
            let mut next = Snapshot::clone(current);
            next.status = status;
            *current = Arc::new(next);
        })
    }

    fn publish(&self, ticket: u64, snapshot: Snapshot) -> Option<Arc<Snapshot>> {
        let mut published = Arc::new(snapshot);
        let applied = self.apply(ticket, |current| {
            Arc::make_mut(&mut published).version = current.version + 1;
            *current = Arc::clone(&published);
        });
        applied.then_some(published)
    }
}

fn collect_reports(
    cibil: Result<CreditReport, BureauError>,
    experian: Result<CreditReport, BureauError>,
    equifax: Result<CreditReport, BureauError>,
    crif: Result<CreditReport, BureauError>,
) -> Result<BureauReports, AggregationError> {
    match (cibil, experian, equifax, crif) {
        (Ok(cibil), Ok(experian), Ok(equifax), Ok(crif_highmark)) => Ok(BureauReports {
            cibil,
            experian,
            equifax,
            crif_highmark,
        }),
        (cibil, experian, equifax, crif) => {
            let mut available = Vec::new();
            let mut missing = Vec::new();
            let mut failures = Vec::new();
            let outcomes = [
                (Bureau::Cibil, cibil.err()),
                (Bureau::Experian, experian.err()),
                (Bureau::Equifax, equifax.err()),
                (Bureau::CrifHighmark, crif.err()),
            ];
            for (bureau, failure) in outcomes {
                match failure {
                    Some(err) => {
                        missing.push(bureau);
                        failures.push(err);
                    }
                    None => available.push(bureau),
                }
            }
            Err(AggregationError::Incomplete {
                available,
                missing,
                failures,
            })
        }
    }
}

fn normalized_report(subject_id: &str, merged: MergedRecords, score: u32) -> CreditReport {
    CreditReport {
        bureau: ReportSource::Normalized,
        subject_id: subject_id.to_string(),
        subject_name: merged.subject_name,
        credit_score: score,
        score_range: ScoreRange::DOMAIN,
        last_updated: today(),
        current_loans: merged.current_loans,
        settled_loans: merged.settled_loans,
        defaults: merged.defaults,
        missed_payments: merged.missed_payments,
    }
}
