pub mod pipeline;
pub mod shared;
pub mod submission;
pub mod testdata;
