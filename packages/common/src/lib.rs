pub mod config;
pub mod judge_job;
pub mod language;
pub mod manifest;
pub mod mq;
pub mod storage;
pub mod submission_status;
pub mod submission_type;
pub mod worker;

pub use language::ProgrammingLanguage;
pub use manifest::{TestdataCase, TestdataManifest};
pub use submission_status::SubmissionStatus;
pub use submission_type::SubmissionType;
