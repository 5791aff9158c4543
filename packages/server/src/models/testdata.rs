use chrono::{DateTime, Utc};
use common::TestdataManifest;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entity::testdata_version;

/// One row of the version history.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TestdataVersionResponse {
    pub id: i32,
    #[schema(example = 2)]
    pub version: i32,
    pub is_active: bool,
    pub case_count: usize,
    /// Sum of non-sample case points.
    pub total_points: f64,
    pub zip_sha256: String,
    pub uploaded_by_id: i32,
    pub uploaded_at: DateTime<Utc>,
}

impl TestdataVersionResponse {
    pub fn from_model(model: &testdata_version::Model) -> Self {
        let manifest: Option<TestdataManifest> = serde_json::from_value(model.manifest.clone()).ok();
        Self {
            id: model.id,
            version: model.version,
            is_active: model.is_active,
            case_count: manifest.as_ref().map_or(0, |m| m.cases.len()),
            total_points: manifest.as_ref().map_or(0.0, TestdataManifest::max_score),
            zip_sha256: model.zip_sha256.clone(),
            uploaded_by_id: model.uploaded_by_id,
            uploaded_at: model.uploaded_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActivateTestdataRequest {
    #[schema(example = 2)]
    pub version: i32,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActiveManifestResponse {
    pub version: i32,
    pub manifest: TestdataManifest,
}

/// A sample case with its file contents, safe to show to learners.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SampleCaseResponse {
    pub name: String,
    pub input: String,
    pub output: String,
}

/// One subtask of a generated manifest.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubtaskSpec {
    /// Number of cases, 1-100.
    pub case_count: u32,
    /// Total points for the subtask, split across its cases.
    pub points: u32,
    pub time_limit_ms: Option<u32>,
    pub memory_limit_kb: Option<u32>,
}

/// Drives manifest generation for archives of `sstt.in` / `sstt.out` files.
/// Subtask 0 holds the sample cases.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubtaskConfig {
    pub subtasks: Vec<SubtaskSpec>,
    #[schema(example = 1000)]
    pub default_time_limit_ms: u32,
    #[schema(example = 262144)]
    pub default_memory_limit_kb: u32,
}
