use chrono::Utc;
use common::TestdataManifest;
use common::storage::{ContentHash, ObjectStore};
use sea_orm::sea_query::{Expr, LockType};
use sea_orm::*;
use tracing::{info, warn};

use super::archive::{self, PreparedTestdata};
use crate::config::BucketConfig;
use crate::entity::{problem, testdata_version};
use crate::error::AppError;
use crate::models::testdata::SampleCaseResponse;
use crate::utils::artifact_key::{Artifact, ArtifactKind};

/// Versioned grading datasets.
///
/// Versions are append-only and numbered 1, 2, 3, ... per problem. A new
/// version is always stored inactive; [`TestdataService::activate`] is the
/// only way a version becomes authoritative. Both paths lock the problem row,
/// which serializes version assignment and activation per problem.
pub struct TestdataService<'a> {
    db: &'a DatabaseConnection,
    store: &'a dyn ObjectStore,
    buckets: &'a BucketConfig,
}

impl<'a> TestdataService<'a> {
    pub fn new(db: &'a DatabaseConnection, store: &'a dyn ObjectStore, buckets: &'a BucketConfig) -> Self {
        Self { db, store, buckets }
    }

    fn bucket(&self) -> &str {
        self.buckets.bucket_for(ArtifactKind::Testdata)
    }

    /// Store a prepared archive as the next version. The blob is written
    /// before the row; a failed insert leaves an orphaned blob, never a row
    /// without a blob.
    pub async fn create_version(
        &self,
        problem_id: i32,
        prepared: PreparedTestdata,
        uploaded_by_id: i32,
    ) -> Result<testdata_version::Model, AppError> {
        let PreparedTestdata { zip, manifest } = prepared;
        let manifest_json = serde_json::to_value(&manifest)
            .map_err(|e| AppError::Internal(format!("serialize manifest: {e}")))?;

        let txn = self.db.begin().await?;
        find_problem_for_update(&txn, problem_id).await?;

        let latest: Option<i32> = testdata_version::Entity::find()
            .filter(testdata_version::Column::ProblemId.eq(problem_id))
            .select_only()
            .column_as(testdata_version::Column::Version.max(), "max_version")
            .into_tuple::<Option<i32>>()
            .one(&txn)
            .await?
            .flatten();
        let version = latest.unwrap_or(0) + 1;

        let zip_key = Artifact::Testdata {
            problem_id,
            version,
        }
        .key()
        .map_err(|e| AppError::Internal(e.to_string()))?;
        let sha256 = ContentHash::compute(&zip).to_hex();
        self.store
            .put(self.bucket(), &zip_key, &zip, "application/zip")
            .await?;

        let row = testdata_version::ActiveModel {
            problem_id: Set(problem_id),
            version: Set(version),
            manifest: Set(manifest_json),
            zip_key: Set(zip_key),
            zip_sha256: Set(sha256),
            is_active: Set(false),
            uploaded_by_id: Set(uploaded_by_id),
            uploaded_at: Set(Utc::now()),
            ..Default::default()
        };
        let model = match row.insert(&txn).await {
            Ok(model) => model,
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                return Err(AppError::Conflict(format!(
                    "Testdata version {version} was created concurrently, please retry"
                )));
            }
            Err(e) => return Err(e.into()),
        };
        txn.commit().await?;

        info!(
            problem_id,
            version,
            cases = manifest.cases.len(),
            bytes = zip.len(),
            "Testdata version created"
        );
        Ok(model)
    }

    /// Make `version` the single active version of the problem.
    pub async fn activate(
        &self,
        problem_id: i32,
        version: i32,
    ) -> Result<testdata_version::Model, AppError> {
        let txn = self.db.begin().await?;
        find_problem_for_update(&txn, problem_id).await?;

        let target = find_version(&txn, problem_id, version).await?;
        if target.is_active {
            txn.commit().await?;
            return Ok(target);
        }

        let previous: Option<i32> = testdata_version::Entity::find()
            .filter(testdata_version::Column::ProblemId.eq(problem_id))
            .filter(testdata_version::Column::IsActive.eq(true))
            .select_only()
            .column(testdata_version::Column::Version)
            .into_tuple::<i32>()
            .one(&txn)
            .await?;

        testdata_version::Entity::update_many()
            .col_expr(testdata_version::Column::IsActive, Expr::value(false))
            .filter(testdata_version::Column::ProblemId.eq(problem_id))
            .filter(testdata_version::Column::IsActive.eq(true))
            .exec(&txn)
            .await?;

        let mut active: testdata_version::ActiveModel = target.into();
        active.is_active = Set(true);
        let model = active.update(&txn).await?;
        txn.commit().await?;

        info!(problem_id, version, previous = ?previous, "Testdata version activated");
        Ok(model)
    }

    /// The active version and its parsed manifest.
    pub async fn get_active_manifest(
        &self,
        problem_id: i32,
    ) -> Result<(testdata_version::Model, TestdataManifest), AppError> {
        active_version(self.db, problem_id).await
    }

    /// All versions, newest first.
    pub async fn list_versions(
        &self,
        problem_id: i32,
    ) -> Result<Vec<testdata_version::Model>, AppError> {
        Ok(testdata_version::Entity::find()
            .filter(testdata_version::Column::ProblemId.eq(problem_id))
            .order_by_desc(testdata_version::Column::Version)
            .all(self.db)
            .await?)
    }

    /// A stored archive, checked against the hash recorded at upload.
    pub async fn download(
        &self,
        problem_id: i32,
        version: i32,
    ) -> Result<(testdata_version::Model, Vec<u8>), AppError> {
        let row = find_version(self.db, problem_id, version).await?;
        let data = self.store.get(self.bucket(), &row.zip_key).await?;
        match ContentHash::from_hex(&row.zip_sha256) {
            Ok(hash) if !hash.matches(&data) => {
                return Err(AppError::Internal(format!(
                    "testdata {} does not match its recorded hash",
                    row.zip_key
                )));
            }
            Ok(_) => {}
            Err(e) => warn!(key = %row.zip_key, error = %e, "Unreadable testdata hash"),
        }
        Ok((row, data))
    }

    /// Sample cases of the active version with their contents. Non-sample
    /// cases are never read.
    pub async fn sample_cases(&self, problem_id: i32) -> Result<Vec<SampleCaseResponse>, AppError> {
        let (row, manifest) = active_version(self.db, problem_id).await?;
        let samples: Vec<_> = manifest.samples().collect();
        if samples.is_empty() {
            return Ok(Vec::new());
        }

        let data = self.store.get(self.bucket(), &row.zip_key).await?;
        let paths: Vec<&str> = samples
            .iter()
            .flat_map(|c| [c.input_file.as_str(), c.output_file.as_str()])
            .collect();
        let texts = archive::read_text_files(&data, &paths)
            .map_err(|e| AppError::Internal(format!("read samples from {}: {e}", row.zip_key)))?;

        Ok(samples
            .iter()
            .zip(texts.chunks_exact(2))
            .map(|(case, pair)| SampleCaseResponse {
                name: case.name.clone(),
                input: pair[0].clone(),
                output: pair[1].clone(),
            })
            .collect())
    }
}

/// The active version of a problem, or `NotFound` when none has been activated.
pub async fn active_version<C: ConnectionTrait>(
    db: &C,
    problem_id: i32,
) -> Result<(testdata_version::Model, TestdataManifest), AppError> {
    let row = testdata_version::Entity::find()
        .filter(testdata_version::Column::ProblemId.eq(problem_id))
        .filter(testdata_version::Column::IsActive.eq(true))
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("No active testdata version".into()))?;
    let manifest = serde_json::from_value(row.manifest.clone()).map_err(|e| {
        AppError::Internal(format!(
            "stored manifest of testdata {} is unreadable: {e}",
            row.id
        ))
    })?;
    Ok((row, manifest))
}

async fn find_version<C: ConnectionTrait>(
    db: &C,
    problem_id: i32,
    version: i32,
) -> Result<testdata_version::Model, AppError> {
    testdata_version::Entity::find()
        .filter(testdata_version::Column::ProblemId.eq(problem_id))
        .filter(testdata_version::Column::Version.eq(version))
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Testdata version {version} not found")))
}

pub(crate) async fn find_problem_for_update(
    txn: &DatabaseTransaction,
    id: i32,
) -> Result<problem::Model, AppError> {
    problem::Entity::find_by_id(id)
        .lock(LockType::Update)
        .one(txn)
        .await?
        .ok_or_else(|| AppError::NotFound("Problem not found".into()))
}
