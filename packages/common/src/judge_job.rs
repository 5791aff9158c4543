use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::language::ProgrammingLanguage;
use crate::manifest::TestdataManifest;
use crate::mq::Message;
use crate::submission_type::SubmissionType;

/// How the judge should build a multi-file project.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BuildPlan {
    /// Use the Makefile stored for the problem; it overrides anything in the archive.
    ProblemMakefile { makefile_key: String },
    /// The archive ships its own top-level Makefile.
    ArchiveMakefile,
    /// No Makefile anywhere; the judge synthesizes a build command.
    Default,
}

/// Normalized submission payload, already validated against the problem's
/// submission type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JudgePayload {
    /// A single source file stored at `source_key`.
    SingleFile { source_key: String, filename: String },
    /// A zip archive stored at `source_key`.
    Project { source_key: String, build: BuildPlan },
    /// Learner code already merged into the problem template.
    Function {
        source_key: String,
        filename: String,
        template_key: String,
    },
}

impl JudgePayload {
    pub fn source_key(&self) -> &str {
        match self {
            Self::SingleFile { source_key, .. }
            | Self::Project { source_key, .. }
            | Self::Function { source_key, .. } => source_key,
        }
    }
}

/// Checker attached to a problem; key and language always travel together.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckerRef {
    pub key: String,
    pub language: ProgrammingLanguage,
}

/// A judge job message sent to the judge queue.
///
/// Everything the judge needs is snapshotted here at submission time, so later
/// configuration edits or testdata activations do not affect a queued run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PipelineJudgeJob {
    /// Job identifier (UUID)
    pub job_id: String,
    pub submission_id: i32,
    pub problem_id: i32,
    pub language: ProgrammingLanguage,
    pub submission_type: SubmissionType,
    /// Ordered stage descriptors, opaque to this service.
    pub pipeline_config: serde_json::Value,
    pub artifact_paths: Vec<String>,
    pub network_config: Option<serde_json::Value>,
    pub checker: Option<CheckerRef>,
    pub payload: JudgePayload,
    /// Testdata version frozen on the submission.
    pub testdata_version: i32,
    pub testdata_zip_key: String,
    pub manifest: TestdataManifest,
}

/// Problem-side fields snapshotted into a job.
pub struct PipelineSnapshot {
    pub submission_type: SubmissionType,
    pub pipeline_config: serde_json::Value,
    pub artifact_paths: Vec<String>,
    pub network_config: Option<serde_json::Value>,
    pub checker: Option<CheckerRef>,
}

/// Testdata-side fields snapshotted into a job.
pub struct TestdataSnapshot {
    pub version: i32,
    pub zip_key: String,
    pub manifest: TestdataManifest,
}

impl PipelineJudgeJob {
    /// Create a new judge job with a generated UUID.
    pub fn new(
        submission_id: i32,
        problem_id: i32,
        language: ProgrammingLanguage,
        pipeline: PipelineSnapshot,
        payload: JudgePayload,
        testdata: TestdataSnapshot,
    ) -> Self {
        Self {
            job_id: Uuid::new_v4().to_string(),
            submission_id,
            problem_id,
            language,
            submission_type: pipeline.submission_type,
            pipeline_config: pipeline.pipeline_config,
            artifact_paths: pipeline.artifact_paths,
            network_config: pipeline.network_config,
            checker: pipeline.checker,
            payload,
            testdata_version: testdata.version,
            testdata_zip_key: testdata.zip_key,
            manifest: testdata.manifest,
        }
    }
}

impl Message for PipelineJudgeJob {
    fn message_type() -> &'static str {
        "pipeline_judge_job"
    }

    fn message_id(&self) -> &str {
        &self.job_id
    }
}
