use chrono::Utc;
use common::judge_job::{JudgePayload, PipelineJudgeJob, PipelineSnapshot, TestdataSnapshot};
use common::storage::ObjectStore;
use common::{ProgrammingLanguage, SubmissionStatus};
use sea_orm::*;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::BucketConfig;
use crate::dispatch::JudgeDispatcher;
use crate::entity::{problem, submission};
use crate::error::AppError;
use crate::pipeline::template;
use crate::pipeline::validator::{
    NormalizedSubmission, SubmissionPayload, SubmissionRules, validate_submission,
};
use crate::testdata::service::active_version;
use crate::utils::artifact_key::{Artifact, ArtifactKind};

/// Accepts submissions: validates, freezes the active testdata version,
/// stores the source and hands a job to the judge.
pub struct SubmissionService<'a> {
    db: &'a DatabaseConnection,
    store: &'a dyn ObjectStore,
    buckets: &'a BucketConfig,
    dispatcher: Option<&'a dyn JudgeDispatcher>,
}

/// Name the judge gives a single-file source.
fn source_filename(language: ProgrammingLanguage) -> String {
    match language {
        ProgrammingLanguage::Java => "Main.java".into(),
        other => format!("main.{}", other.extension()),
    }
}

impl<'a> SubmissionService<'a> {
    pub fn new(
        db: &'a DatabaseConnection,
        store: &'a dyn ObjectStore,
        buckets: &'a BucketConfig,
        dispatcher: Option<&'a dyn JudgeDispatcher>,
    ) -> Self {
        Self {
            db,
            store,
            buckets,
            dispatcher,
        }
    }

    /// Record and dispatch a submission.
    ///
    /// The `Pending` row is committed before the job is published, so the
    /// judge never sees a submission ID that does not exist yet. If publishing
    /// fails the row and its source are removed again and the caller gets
    /// `JUDGE_UNAVAILABLE`.
    pub async fn submit(
        &self,
        problem: &problem::Model,
        user_id: i32,
        language: &str,
        payload: SubmissionPayload<'_>,
    ) -> Result<submission::Model, AppError> {
        let rules = SubmissionRules::from_problem(problem);
        let (language, normalized) = validate_submission(&rules, language, payload)?;

        let dispatcher = self
            .dispatcher
            .ok_or_else(|| AppError::JudgeUnavailable("no judge queue configured".into()))?;

        let txn = self.db.begin().await?;
        let (testdata, manifest) = match active_version(&txn, problem.id).await {
            Ok(found) => found,
            Err(AppError::NotFound(_)) => {
                return Err(AppError::bad_request(
                    "NO_ACTIVE_TESTDATA",
                    "This problem has no active testdata version",
                ));
            }
            Err(e) => return Err(e),
        };

        let id = Uuid::new_v4();
        let (source_key, judge_payload) = match normalized {
            NormalizedSubmission::SingleFile => {
                let SubmissionPayload::Inline(source) = payload else {
                    return Err(AppError::Internal("single-file payload is not inline".into()));
                };
                let key = self.put_source(id, Some(language), source.as_bytes()).await?;
                let judge_payload = JudgePayload::SingleFile {
                    source_key: key.clone(),
                    filename: source_filename(language),
                };
                (key, judge_payload)
            }
            NormalizedSubmission::Function { template_key } => {
                let SubmissionPayload::Inline(code) = payload else {
                    return Err(AppError::Internal("function payload is not inline".into()));
                };
                let merged = self.merge_with_template(&template_key, code).await?;
                let key = self.put_source(id, Some(language), merged.as_bytes()).await?;
                let judge_payload = JudgePayload::Function {
                    source_key: key.clone(),
                    filename: source_filename(language),
                    template_key,
                };
                (key, judge_payload)
            }
            NormalizedSubmission::Project { build } => {
                let SubmissionPayload::Archive(data) = payload else {
                    return Err(AppError::Internal("project payload is not an archive".into()));
                };
                let key = self.put_source(id, None, data).await?;
                let judge_payload = JudgePayload::Project {
                    source_key: key.clone(),
                    build,
                };
                (key, judge_payload)
            }
        };

        let row = submission::ActiveModel {
            problem_id: Set(problem.id),
            user_id: Set(user_id),
            language: Set(language),
            submission_type: Set(problem.submission_type),
            source_key: Set(source_key),
            testdata_version: Set(testdata.version),
            status: Set(SubmissionStatus::Pending),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;

        let job = PipelineJudgeJob::new(
            row.id,
            problem.id,
            language,
            PipelineSnapshot {
                submission_type: problem.submission_type,
                pipeline_config: problem.pipeline_config.clone(),
                artifact_paths: problem.artifact_paths(),
                network_config: problem.network_config.clone(),
                checker: problem.checker(),
            },
            judge_payload,
            TestdataSnapshot {
                version: testdata.version,
                zip_key: testdata.zip_key,
                manifest,
            },
        );
        if let Err(e) = dispatcher.dispatch(&job).await {
            self.discard(&row).await?;
            return Err(AppError::JudgeUnavailable(e.to_string()));
        }

        info!(
            submission_id = row.id,
            problem_id = problem.id,
            testdata_version = row.testdata_version,
            job_id = %job.job_id,
            "Submission accepted"
        );
        Ok(row)
    }

    /// Undo a committed submission whose job never reached the judge.
    async fn discard(&self, row: &submission::Model) -> Result<(), AppError> {
        submission::Entity::delete_by_id(row.id).exec(self.db).await?;
        let bucket = self.buckets.bucket_for(ArtifactKind::SubmissionSource);
        if let Err(e) = self.store.delete(bucket, &row.source_key).await {
            warn!(
                submission_id = row.id,
                source_key = %row.source_key,
                error = %e,
                "Failed to remove source of undispatched submission"
            );
        }
        warn!(submission_id = row.id, "Submission discarded after failed dispatch");
        Ok(())
    }

    async fn merge_with_template(&self, template_key: &str, code: &str) -> Result<String, AppError> {
        let bytes = self
            .store
            .get(self.buckets.bucket_for(ArtifactKind::Template), template_key)
            .await?;
        let text = String::from_utf8(bytes)
            .map_err(|_| AppError::Internal(format!("template {template_key} is not UTF-8")))?;
        template::merge_template(&text, code)
            .map_err(|e| AppError::bad_request("TEMPLATE_MARKER_MISSING", e.to_string()))
    }

    async fn put_source(
        &self,
        id: Uuid,
        language: Option<ProgrammingLanguage>,
        data: &[u8],
    ) -> Result<String, AppError> {
        let artifact = Artifact::SubmissionSource { id, language };
        let key = artifact
            .key()
            .map_err(|e| AppError::Internal(e.to_string()))?;
        let content_type = match language {
            Some(_) => "text/plain",
            None => "application/zip",
        };
        self.store
            .put(self.buckets.bucket_for(artifact.kind()), &key, data, content_type)
            .await?;
        Ok(key)
    }
}
