//! Persistent records: tasks, questions and reports.

pub mod question;
pub mod report;
pub mod task;

pub use question::{
    Alternative, Assertion, LedgerEntry, LedgerKey, Question, QuestionDraft, QuestionError,
    QuestionMetadata, QuestionType,
};
pub use report::{
    QuestionOutcome, Rejection, Report, ReportContent, ReportStep, ReportType,
};
pub use task::Task;
