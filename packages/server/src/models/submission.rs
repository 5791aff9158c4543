use chrono::{DateTime, Utc};
use common::{ProgrammingLanguage, SubmissionStatus, SubmissionType};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entity::submission;

/// Inline submission for SINGLE_FILE and FUNCTION_ONLY problems.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubmissionRequest {
    /// One of `C`, `CPP`, `JAVA`, `PYTHON` (case-insensitive).
    #[schema(example = "CPP")]
    pub language: String,
    /// Full program, or the function body for FUNCTION_ONLY problems.
    #[schema(example = "#include <cstdio>\nint main() { return 0; }")]
    pub source: String,
}

/// Multipart form for MULTI_FILE problems. Documentation only; the handler
/// reads the parts itself.
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct ArchiveSubmissionForm {
    #[schema(example = "CPP")]
    pub language: String,
    /// Zip archive of the project.
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionResponse {
    #[schema(example = 1)]
    pub id: i32,
    pub problem_id: i32,
    pub language: ProgrammingLanguage,
    pub submission_type: SubmissionType,
    /// Testdata version frozen at intake; grading always uses this version.
    #[schema(example = 2)]
    pub testdata_version: i32,
    pub status: SubmissionStatus,
    pub created_at: DateTime<Utc>,
}

impl From<submission::Model> for SubmissionResponse {
    fn from(s: submission::Model) -> Self {
        Self {
            id: s.id,
            problem_id: s.problem_id,
            language: s.language,
            submission_type: s.submission_type,
            testdata_version: s.testdata_version,
            status: s.status,
            created_at: s.created_at,
        }
    }
}
