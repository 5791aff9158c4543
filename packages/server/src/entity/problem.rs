use common::judge_job::CheckerRef;
use common::{ProgrammingLanguage, SubmissionType};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "UPPERCASE")]
pub enum Visibility {
    #[sea_orm(string_value = "PUBLIC")]
    Public,
    #[sea_orm(string_value = "UNLISTED")]
    Unlisted,
    #[sea_orm(string_value = "PRIVATE")]
    Private,
}

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "problem")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Human-readable identifier used in URLs, e.g. "P1001".
    #[sea_orm(unique)]
    pub display_id: String,
    pub title: String,

    pub owner_id: Option<i32>,
    #[sea_orm(belongs_to, from = "owner_id", to = "id")]
    pub owner: Option<super::user::Entity>,

    pub visibility: Visibility,

    pub submission_type: SubmissionType,
    /// Ordered stage descriptors. Opaque here; interpreted by the judge.
    #[sea_orm(column_type = "JsonBinary")]
    pub pipeline_config: serde_json::Value,
    /// Glob list of files the judge collects after a run.
    #[sea_orm(column_type = "JsonBinary")]
    pub artifact_paths: serde_json::Value,
    #[sea_orm(column_type = "JsonBinary")]
    pub network_config: Option<serde_json::Value>,
    #[sea_orm(column_type = "JsonBinary")]
    pub allowed_languages: serde_json::Value,

    pub checker_key: Option<String>,
    pub checker_language: Option<ProgrammingLanguage>,
    pub template_key: Option<String>,
    pub makefile_key: Option<String>,

    #[sea_orm(has_many)]
    pub testdata_versions: HasMany<super::testdata_version::Entity>,

    #[sea_orm(has_many)]
    pub submissions: HasMany<super::submission::Entity>,

    #[sea_orm(has_many, via = "course_problem")]
    pub courses: HasMany<super::course::Entity>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Languages a submission may declare. Rows are only written through the
    /// pipeline service, so an unparsable value is treated as "none allowed".
    pub fn allowed_languages(&self) -> Vec<ProgrammingLanguage> {
        serde_json::from_value(self.allowed_languages.clone()).unwrap_or_default()
    }

    pub fn artifact_paths(&self) -> Vec<String> {
        serde_json::from_value(self.artifact_paths.clone()).unwrap_or_default()
    }

    /// The configured checker, present only when key and language are both set.
    pub fn checker(&self) -> Option<CheckerRef> {
        match (&self.checker_key, self.checker_language) {
            (Some(key), Some(language)) => Some(CheckerRef {
                key: key.clone(),
                language,
            }),
            _ => None,
        }
    }
}

/// Column defaults for a freshly created problem's pipeline fields.
pub fn default_allowed_languages() -> serde_json::Value {
    serde_json::json!(ProgrammingLanguage::ALL)
}
