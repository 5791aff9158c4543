pub mod service;
pub mod template;
pub mod validator;

pub use service::PipelineService;
