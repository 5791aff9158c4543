use common::{ProgrammingLanguage, SubmissionStatus, SubmissionType};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "submission")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub problem_id: i32,
    #[sea_orm(belongs_to, from = "problem_id", to = "id")]
    pub problem: HasOne<super::problem::Entity>,

    pub user_id: i32,
    #[sea_orm(belongs_to, from = "user_id", to = "id")]
    pub user: HasOne<super::user::Entity>,

    pub language: ProgrammingLanguage,
    pub submission_type: SubmissionType,
    /// Object key of the stored source (file or archive).
    pub source_key: String,
    /// Testdata version active when the submission was accepted. Never rewritten.
    pub testdata_version: i32,
    pub status: SubmissionStatus,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
