//! Problem-level authorization.
//!
//! The rules live in two pure predicates, [`can_modify`] and [`can_view`],
//! evaluated over [`AccessFacts`] loaded once per request. The async
//! `ensure_*` wrappers load the facts and turn a denial into an error.

use sea_orm::sea_query::Query;
use sea_orm::*;

use crate::entity::course_member::{self, CourseRole};
use crate::entity::course_problem;
use crate::entity::problem::{self, Visibility};
use crate::error::AppError;
use crate::extractors::auth::AuthUser;

/// What authorization needs to know about a problem and one principal.
#[derive(Debug, Clone, Copy)]
pub struct AccessFacts<'a> {
    pub owner_id: Option<i32>,
    pub visibility: Visibility,
    /// The principal's roles in active memberships of courses linked to the
    /// problem. Empty for anonymous callers.
    pub course_roles: &'a [CourseRole],
}

/// Owner, platform admin, or active teacher/TA of a linked course.
pub fn can_modify(facts: &AccessFacts<'_>, principal: Option<&AuthUser>) -> bool {
    let Some(user) = principal else {
        return false;
    };
    user.is_admin()
        || facts.owner_id == Some(user.user_id)
        || facts
            .course_roles
            .iter()
            .any(|role| matches!(role, CourseRole::Teacher | CourseRole::Ta))
}

/// Anyone for public problems; otherwise owner, admin, or any active member
/// of a linked course, students included.
pub fn can_view(facts: &AccessFacts<'_>, principal: Option<&AuthUser>) -> bool {
    if facts.visibility == Visibility::Public {
        return true;
    }
    let Some(user) = principal else {
        return false;
    };
    user.is_admin() || facts.owner_id == Some(user.user_id) || !facts.course_roles.is_empty()
}

pub async fn find_problem_by_display_id<C: ConnectionTrait>(
    db: &C,
    display_id: &str,
) -> Result<problem::Model, AppError> {
    problem::Entity::find()
        .filter(problem::Column::DisplayId.eq(display_id))
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Problem not found".into()))
}

/// Roles the user holds in non-left memberships of courses linked to the problem.
pub async fn active_course_roles<C: ConnectionTrait>(
    db: &C,
    problem_id: i32,
    user_id: i32,
) -> Result<Vec<CourseRole>, DbErr> {
    course_member::Entity::find()
        .select_only()
        .column(course_member::Column::RoleInCourse)
        .filter(course_member::Column::UserId.eq(user_id))
        .filter(course_member::Column::LeftAt.is_null())
        .filter(
            course_member::Column::CourseId.in_subquery(
                Query::select()
                    .column(course_problem::Column::CourseId)
                    .from(course_problem::Entity)
                    .and_where(course_problem::Column::ProblemId.eq(problem_id))
                    .to_owned(),
            ),
        )
        .into_tuple::<CourseRole>()
        .all(db)
        .await
}

async fn load_roles<C: ConnectionTrait>(
    db: &C,
    problem: &problem::Model,
    principal: Option<&AuthUser>,
) -> Result<Vec<CourseRole>, DbErr> {
    match principal {
        // Admins and owners never need the membership lookup.
        Some(user) if !user.is_admin() && problem.owner_id != Some(user.user_id) => {
            active_course_roles(db, problem.id, user.user_id).await
        }
        _ => Ok(Vec::new()),
    }
}

/// Load the problem and require modify permission.
///
/// `NotFound` takes precedence over `Forbidden`.
pub async fn ensure_can_modify<C: ConnectionTrait>(
    db: &C,
    display_id: &str,
    principal: Option<&AuthUser>,
) -> Result<problem::Model, AppError> {
    let problem = find_problem_by_display_id(db, display_id).await?;
    let roles = load_roles(db, &problem, principal).await?;
    let facts = AccessFacts {
        owner_id: problem.owner_id,
        visibility: problem.visibility,
        course_roles: &roles,
    };
    if can_modify(&facts, principal) {
        Ok(problem)
    } else {
        Err(AppError::PermissionDenied)
    }
}

/// Load the problem and require view permission.
pub async fn ensure_can_view<C: ConnectionTrait>(
    db: &C,
    display_id: &str,
    principal: Option<&AuthUser>,
) -> Result<problem::Model, AppError> {
    let problem = find_problem_by_display_id(db, display_id).await?;
    if problem.visibility == Visibility::Public {
        return Ok(problem);
    }
    let roles = load_roles(db, &problem, principal).await?;
    let facts = AccessFacts {
        owner_id: problem.owner_id,
        visibility: problem.visibility,
        course_roles: &roles,
    };
    if can_view(&facts, principal) {
        Ok(problem)
    } else {
        Err(AppError::PermissionDenied)
    }
}
