pub mod service;

pub use service::SubmissionService;
