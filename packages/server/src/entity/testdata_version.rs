use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One uploaded grading dataset. Rows are append-only; only `is_active` ever
/// changes after insert.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "testdata_version")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub problem_id: i32,
    #[sea_orm(belongs_to, from = "problem_id", to = "id")]
    pub problem: HasOne<super::problem::Entity>,

    /// 1-based, strictly increasing per problem.
    pub version: i32,

    /// The manifest exactly as stored in the archive.
    #[sea_orm(column_type = "JsonBinary")]
    pub manifest: serde_json::Value,
    pub zip_key: String,
    /// Hex SHA-256 of the stored archive.
    pub zip_sha256: String,

    #[sea_orm(default_value = false)]
    pub is_active: bool,

    pub uploaded_by_id: i32,
    #[sea_orm(belongs_to, from = "uploaded_by_id", to = "id")]
    pub uploaded_by: HasOne<super::user::Entity>,

    pub uploaded_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
