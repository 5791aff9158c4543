use sea_orm::sea_query::{Index, PostgresQueryBuilder};
use sea_orm::*;
use tracing::{info, warn};

use crate::entity::{course_member, submission, testdata_version};

/// Ensure required database indexes exist.
///
/// SeaORM's schema-sync handles single-column uniqueness only, so composite
/// and partial indexes are created here on startup.
pub async fn ensure_indexes(db: &DatabaseConnection) -> Result<(), DbErr> {
    // Version numbers are never reused within a problem.
    let stmt = Index::create()
        .if_not_exists()
        .unique()
        .name("idx_testdata_problem_version")
        .table(testdata_version::Entity)
        .col(testdata_version::Column::ProblemId)
        .col(testdata_version::Column::Version)
        .to_string(PostgresQueryBuilder);
    run_index(db, "idx_testdata_problem_version", &stmt).await;

    // At most one active version per problem. sea-query has no partial index
    // builder for Postgres, so this one is raw SQL.
    let stmt = "CREATE UNIQUE INDEX IF NOT EXISTS idx_testdata_one_active \
                ON testdata_version (problem_id) WHERE is_active";
    run_index(db, "idx_testdata_one_active", stmt).await;

    // Permission lookups: active memberships of a user.
    let stmt = Index::create()
        .if_not_exists()
        .name("idx_course_member_user_course")
        .table(course_member::Entity)
        .col(course_member::Column::UserId)
        .col(course_member::Column::CourseId)
        .to_string(PostgresQueryBuilder);
    run_index(db, "idx_course_member_user_course", &stmt).await;

    let stmt = Index::create()
        .if_not_exists()
        .name("idx_submission_problem_created")
        .table(submission::Entity)
        .col(submission::Column::ProblemId)
        .col(submission::Column::CreatedAt)
        .to_string(PostgresQueryBuilder);
    run_index(db, "idx_submission_problem_created", &stmt).await;

    Ok(())
}

async fn run_index(db: &DatabaseConnection, name: &str, stmt: &str) {
    match db.execute_unprepared(stmt).await {
        Ok(_) => {
            info!("Ensured index {} exists", name);
        }
        Err(e) => {
            warn!("Failed to create index {}: {}", name, e);
        }
    }
}
