pub mod artifact_key;
pub mod filename;
pub mod jwt;
pub mod multipart;
pub mod permission;
