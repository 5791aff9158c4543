pub mod pipeline;
pub mod submission;
pub mod testdata;
