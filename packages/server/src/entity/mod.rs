pub mod course;
pub mod course_member;
pub mod course_problem;
pub mod problem;
pub mod submission;
pub mod testdata_version;
pub mod user;
