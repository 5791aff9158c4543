use std::str::FromStr;

use chrono::Utc;
use common::ProgrammingLanguage;
use common::storage::ObjectStore;
use sea_orm::{ActiveModelTrait, ConnectionTrait, IntoActiveModel, Set};
use tracing::{info, warn};

use super::template;
use crate::config::BucketConfig;
use crate::entity::problem;
use crate::error::AppError;
use crate::models::pipeline::UpdatePipelineConfigRequest;
use crate::utils::artifact_key::{Artifact, ArtifactKeyError};
use crate::utils::filename::is_makefile_name;
use crate::utils::multipart::UploadedFile;

/// Mutations of a problem's pipeline configuration.
///
/// Callers are expected to have passed `ensure_can_modify` already; the
/// service trusts the `problem::Model` it is handed.
pub struct PipelineService<'a, C: ConnectionTrait> {
    conn: &'a C,
    store: &'a dyn ObjectStore,
    buckets: &'a BucketConfig,
}

impl<'a, C: ConnectionTrait> PipelineService<'a, C> {
    pub fn new(conn: &'a C, store: &'a dyn ObjectStore, buckets: &'a BucketConfig) -> Self {
        Self {
            conn,
            store,
            buckets,
        }
    }

    /// Apply a partial update. An empty patch returns the problem unchanged.
    pub async fn update_config(
        &self,
        problem: problem::Model,
        patch: UpdatePipelineConfigRequest,
    ) -> Result<problem::Model, AppError> {
        if patch.is_empty() {
            return Ok(problem);
        }

        let mut active = problem.into_active_model();
        if let Some(submission_type) = patch.submission_type {
            active.submission_type = Set(submission_type);
        }
        if let Some(pipeline_config) = patch.pipeline_config {
            active.pipeline_config = Set(pipeline_config);
        }
        if let Some(paths) = patch.artifact_paths {
            let paths: Vec<String> = paths.into_iter().map(|p| p.trim().to_string()).collect();
            active.artifact_paths = Set(serde_json::json!(paths));
        }
        if let Some(network_config) = patch.network_config {
            active.network_config = Set(network_config);
        }
        if let Some(mut languages) = patch.allowed_languages {
            languages.sort();
            languages.dedup();
            active.allowed_languages = Set(serde_json::json!(languages));
        }
        active.updated_at = Set(Utc::now());

        Ok(active.update(self.conn).await?)
    }

    /// Store a checker and point the problem at it.
    ///
    /// The language is checked before anything is written. Key and language
    /// are updated in the same statement so they never disagree.
    pub async fn upload_checker(
        &self,
        problem: problem::Model,
        language: Option<&str>,
        file: UploadedFile,
    ) -> Result<problem::Model, AppError> {
        let language = language
            .ok_or_else(|| {
                AppError::bad_request("INVALID_LANGUAGE", "Query parameter 'language' is required")
            })
            .and_then(|raw| {
                ProgrammingLanguage::from_str(raw)
                    .map_err(|e| AppError::bad_request("INVALID_LANGUAGE", e.to_string()))
            })?;

        let filename = uploaded_filename(&file)?;
        let artifact = Artifact::Checker {
            display_id: &problem.display_id,
            filename: &filename,
        };
        let key = artifact.key().map_err(key_error)?;
        self.put_blob(&artifact, &key, &file).await?;

        let display_id = problem.display_id.clone();
        let mut active = problem.into_active_model();
        active.checker_key = Set(Some(key.clone()));
        active.checker_language = Set(Some(language));
        active.updated_at = Set(Utc::now());
        let updated = active.update(self.conn).await?;

        info!(display_id = %display_id, key = %key, language = %language, "Checker uploaded");
        Ok(updated)
    }

    /// Store a FUNCTION_ONLY template. The template must carry a student code marker.
    pub async fn upload_template(
        &self,
        problem: problem::Model,
        file: UploadedFile,
    ) -> Result<problem::Model, AppError> {
        let filename = uploaded_filename(&file)?;
        let text = std::str::from_utf8(&file.data)
            .map_err(|_| AppError::Validation("Template must be UTF-8 text".into()))?;
        if !template::has_marker(text) {
            return Err(AppError::bad_request(
                "TEMPLATE_MARKER_MISSING",
                template::MarkerMissing.to_string(),
            ));
        }

        let artifact = Artifact::Template {
            display_id: &problem.display_id,
            filename: &filename,
        };
        let key = artifact.key().map_err(key_error)?;
        self.put_blob(&artifact, &key, &file).await?;

        let display_id = problem.display_id.clone();
        let mut active = problem.into_active_model();
        active.template_key = Set(Some(key.clone()));
        active.updated_at = Set(Utc::now());
        let updated = active.update(self.conn).await?;

        info!(display_id = %display_id, key = %key, "Template uploaded");
        Ok(updated)
    }

    /// Store the problem's Makefile. Re-uploads overwrite the same key.
    pub async fn upload_makefile(
        &self,
        problem: problem::Model,
        file: UploadedFile,
    ) -> Result<problem::Model, AppError> {
        let name = file.filename.as_deref().unwrap_or_default();
        if !is_makefile_name(name) {
            return Err(AppError::bad_request(
                "INVALID_MAKEFILE_NAME",
                format!("File must be named 'Makefile', got '{name}'"),
            ));
        }
        if file.data.is_empty() {
            return Err(AppError::Validation("Makefile must not be empty".into()));
        }

        let artifact = Artifact::Makefile {
            display_id: &problem.display_id,
        };
        let key = artifact.key().map_err(key_error)?;
        let bucket = self.buckets.bucket_for(artifact.kind());
        self.store.put(bucket, &key, &file.data, "text/plain").await?;

        let display_id = problem.display_id.clone();
        let mut active = problem.into_active_model();
        active.makefile_key = Set(Some(key.clone()));
        active.updated_at = Set(Utc::now());
        let updated = active.update(self.conn).await?;

        info!(display_id = %display_id, key = %key, "Makefile uploaded");
        Ok(updated)
    }

    /// Drop the Makefile reference. The blob delete is best-effort: a failure
    /// is logged and the reference is cleared anyway.
    pub async fn delete_makefile(&self, problem: problem::Model) -> Result<problem::Model, AppError> {
        let Some(key) = problem.makefile_key.clone() else {
            return Ok(problem);
        };

        let bucket = self.buckets.bucket_for(
            Artifact::Makefile {
                display_id: &problem.display_id,
            }
            .kind(),
        );
        if let Err(e) = self.store.delete(bucket, &key).await {
            warn!(display_id = %problem.display_id, key = %key, error = %e, "Failed to delete Makefile blob");
        }

        let mut active = problem.into_active_model();
        active.makefile_key = Set(None);
        active.updated_at = Set(Utc::now());
        Ok(active.update(self.conn).await?)
    }

    async fn put_blob(
        &self,
        artifact: &Artifact<'_>,
        key: &str,
        file: &UploadedFile,
    ) -> Result<(), AppError> {
        if file.data.is_empty() {
            return Err(AppError::Validation("Uploaded file must not be empty".into()));
        }
        let content_type = file.content_type.clone().unwrap_or_else(|| {
            mime_guess::from_path(key)
                .first_or_octet_stream()
                .essence_str()
                .to_string()
        });
        let bucket = self.buckets.bucket_for(artifact.kind());
        self.store.put(bucket, key, &file.data, &content_type).await?;
        Ok(())
    }
}

fn uploaded_filename(file: &UploadedFile) -> Result<String, AppError> {
    file.filename
        .as_deref()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .ok_or_else(|| AppError::Validation("Uploaded file must have a filename".into()))
}

fn key_error(err: ArtifactKeyError) -> AppError {
    AppError::Validation(err.to_string())
}
