use common::{ProgrammingLanguage, SubmissionType};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::shared::double_option;
use crate::entity::problem;
use crate::error::AppError;

/// Partial update of a problem's pipeline configuration. Absent fields are
/// left untouched.
#[derive(Debug, Deserialize, Default, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdatePipelineConfigRequest {
    pub submission_type: Option<SubmissionType>,
    /// Ordered stage descriptors. Must be a JSON array; element shape is not
    /// interpreted by this service.
    #[schema(value_type = Option<Vec<Object>>)]
    pub pipeline_config: Option<serde_json::Value>,
    pub artifact_paths: Option<Vec<String>>,
    /// `null` clears the policy.
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<Object>, nullable)]
    pub network_config: Option<Option<serde_json::Value>>,
    pub allowed_languages: Option<Vec<ProgrammingLanguage>>,
}

impl UpdatePipelineConfigRequest {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Read projection of a problem's pipeline configuration.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PipelineConfigResponse {
    pub submission_type: SubmissionType,
    #[schema(value_type = Vec<Object>)]
    pub pipeline_config: serde_json::Value,
    pub checker_key: Option<String>,
    pub checker_language: Option<ProgrammingLanguage>,
    pub template_key: Option<String>,
    pub makefile_key: Option<String>,
    pub artifact_paths: Vec<String>,
    #[schema(value_type = Option<Object>)]
    pub network_config: Option<serde_json::Value>,
    pub allowed_languages: Vec<ProgrammingLanguage>,
}

impl From<&problem::Model> for PipelineConfigResponse {
    fn from(p: &problem::Model) -> Self {
        Self {
            submission_type: p.submission_type,
            pipeline_config: p.pipeline_config.clone(),
            checker_key: p.checker_key.clone(),
            checker_language: p.checker_language,
            template_key: p.template_key.clone(),
            makefile_key: p.makefile_key.clone(),
            artifact_paths: p.artifact_paths(),
            network_config: p.network_config.clone(),
            allowed_languages: p.allowed_languages(),
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CheckerUploadQuery {
    /// One of `C`, `CPP`, `JAVA`, `PYTHON` (case-insensitive).
    pub language: Option<String>,
}

/// Maximum number of artifact globs per problem.
const MAX_ARTIFACT_PATHS: usize = 32;

pub fn validate_update_pipeline_config(req: &UpdatePipelineConfigRequest) -> Result<(), AppError> {
    if let Some(ref config) = req.pipeline_config
        && !config.is_array()
    {
        return Err(AppError::Validation("pipelineConfig must be an array".into()));
    }

    if let Some(ref paths) = req.artifact_paths {
        if paths.len() > MAX_ARTIFACT_PATHS {
            return Err(AppError::Validation(format!(
                "artifactPaths accepts at most {MAX_ARTIFACT_PATHS} entries"
            )));
        }
        for path in paths {
            let path = path.trim();
            if path.is_empty() || path.len() > 256 {
                return Err(AppError::Validation(
                    "artifactPaths entries must be 1-256 characters".into(),
                ));
            }
            if path.starts_with('/') || path.split('/').any(|s| s == "..") {
                return Err(AppError::Validation(format!(
                    "artifactPaths entry '{path}' must be relative without '..'"
                )));
            }
        }
    }

    if let Some(Some(ref network)) = req.network_config
        && !network.is_object()
    {
        return Err(AppError::Validation(
            "networkConfig must be an object or null".into(),
        ));
    }

    if let Some(ref langs) = req.allowed_languages
        && langs.is_empty()
    {
        return Err(AppError::Validation(
            "allowedLanguages must not be empty".into(),
        ));
    }

    Ok(())
}
