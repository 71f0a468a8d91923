pub mod aggregate;
pub mod bureau;
pub mod credit;
pub mod error;
pub mod notify;
pub mod render;

pub use aggregate::{AggregationRequest, Aggregator, Snapshot, SnapshotStatus};
pub use bureau::{
    client_from_settings, BureauClient, BureauSettings, FixtureBureauClient, HttpBureauClient,
    SourceKind,
};
pub use credit::normalize::{
    normalize, normalize_score, score_breakdown, BureauScores, LoanPurpose, ScoreBreakdown,
};
pub use credit::{
    BankCount, Bureau, CreditReport, Loan, ReportSet, ReportSource, ScoreRange, ScoreRating,
};
pub use error::{AggregationError, BureauError, InvalidLoanPurpose};
pub use notify::{Notification, NotificationKind, NotificationSink, RecordingNotifier, TracingNotifier};
pub use render::{render_breakdown, render_snapshot, render_weight_table, OutputFormat};
