use axum::Json;
use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::MaybeAuthUser;
use crate::extractors::json::AppJson;
use crate::models::pipeline::*;
use crate::pipeline::PipelineService;
use crate::state::AppState;
use crate::utils::multipart::MultipartForm;
use crate::utils::permission::{ensure_can_modify, ensure_can_view};

fn service(state: &AppState) -> PipelineService<'_, sea_orm::DatabaseConnection> {
    PipelineService::new(&state.db, state.store.as_ref(), &state.config.storage.buckets)
}

#[utoipa::path(
    get,
    path = "/config",
    tag = "Pipeline",
    operation_id = "getPipelineConfig",
    summary = "Get a problem's pipeline configuration",
    description = "Returns the pipeline configuration and artifact keys. Anonymous callers may read PUBLIC problems; otherwise the caller must own the problem, be an admin, or be an active member of a linked course.",
    params(("display_id" = String, Path, description = "Problem display ID")),
    responses(
        (status = 200, description = "Pipeline configuration", body = PipelineConfigResponse),
        (status = 401, description = "Malformed token (TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Problem not found (NOT_FOUND)", body = ErrorBody),
    ),
    security((), ("jwt" = [])),
)]
#[instrument(skip(state, principal))]
pub async fn get_config(
    MaybeAuthUser(principal): MaybeAuthUser,
    State(state): State<AppState>,
    Path(display_id): Path<String>,
) -> Result<Json<PipelineConfigResponse>, AppError> {
    let problem = ensure_can_view(&state.db, &display_id, principal.as_ref()).await?;
    Ok(Json(PipelineConfigResponse::from(&problem)))
}

#[utoipa::path(
    patch,
    path = "/config",
    tag = "Pipeline",
    operation_id = "updatePipelineConfig",
    summary = "Update a problem's pipeline configuration",
    description = "Partial update: absent fields are left unchanged, `networkConfig: null` clears the policy. An empty body changes nothing. Requires modify permission (owner, admin, or active TEACHER/TA of a linked course).",
    params(("display_id" = String, Path, description = "Problem display ID")),
    request_body = UpdatePipelineConfigRequest,
    responses(
        (status = 200, description = "Updated configuration", body = PipelineConfigResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Malformed token (TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Problem not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, principal, payload))]
pub async fn update_config(
    MaybeAuthUser(principal): MaybeAuthUser,
    State(state): State<AppState>,
    Path(display_id): Path<String>,
    AppJson(payload): AppJson<UpdatePipelineConfigRequest>,
) -> Result<Json<PipelineConfigResponse>, AppError> {
    let problem = ensure_can_modify(&state.db, &display_id, principal.as_ref()).await?;
    validate_update_pipeline_config(&payload)?;

    let updated = service(&state).update_config(problem, payload).await?;
    Ok(Json(PipelineConfigResponse::from(&updated)))
}

#[utoipa::path(
    post,
    path = "/checker",
    tag = "Pipeline",
    operation_id = "uploadChecker",
    summary = "Upload a checker program",
    description = "Stores the multipart `file` part as the problem's checker and records its language. An unknown language is rejected before anything is stored. Body limit: 128 MB.",
    params(
        ("display_id" = String, Path, description = "Problem display ID"),
        CheckerUploadQuery,
    ),
    request_body(content_type = "multipart/form-data", description = "Checker source in the `file` part"),
    responses(
        (status = 200, description = "Updated configuration", body = PipelineConfigResponse),
        (status = 400, description = "Bad request (INVALID_LANGUAGE, FILE_REQUIRED, VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Malformed token (TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Problem not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, principal, query, multipart))]
pub async fn upload_checker(
    MaybeAuthUser(principal): MaybeAuthUser,
    State(state): State<AppState>,
    Path(display_id): Path<String>,
    Query(query): Query<CheckerUploadQuery>,
    multipart: Multipart,
) -> Result<Json<PipelineConfigResponse>, AppError> {
    let problem = ensure_can_modify(&state.db, &display_id, principal.as_ref()).await?;
    let file = MultipartForm::read(multipart).await?.take_file("file")?;

    let updated = service(&state)
        .upload_checker(problem, query.language.as_deref(), file)
        .await?;
    Ok(Json(PipelineConfigResponse::from(&updated)))
}

#[utoipa::path(
    post,
    path = "/template",
    tag = "Pipeline",
    operation_id = "uploadTemplate",
    summary = "Upload a FUNCTION_ONLY template",
    description = "Stores the multipart `file` part as the problem's template. The template must contain `// STUDENT_CODE_HERE` or a `// === STUDENT_CODE_START ===` / `// === STUDENT_CODE_END ===` region. Body limit: 128 MB.",
    params(("display_id" = String, Path, description = "Problem display ID")),
    request_body(content_type = "multipart/form-data", description = "Template source in the `file` part"),
    responses(
        (status = 200, description = "Updated configuration", body = PipelineConfigResponse),
        (status = 400, description = "Bad request (TEMPLATE_MARKER_MISSING, FILE_REQUIRED, VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Malformed token (TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Problem not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, principal, multipart))]
pub async fn upload_template(
    MaybeAuthUser(principal): MaybeAuthUser,
    State(state): State<AppState>,
    Path(display_id): Path<String>,
    multipart: Multipart,
) -> Result<Json<PipelineConfigResponse>, AppError> {
    let problem = ensure_can_modify(&state.db, &display_id, principal.as_ref()).await?;
    let file = MultipartForm::read(multipart).await?.take_file("file")?;

    let updated = service(&state).upload_template(problem, file).await?;
    Ok(Json(PipelineConfigResponse::from(&updated)))
}

#[utoipa::path(
    post,
    path = "/makefile",
    tag = "Pipeline",
    operation_id = "uploadMakefile",
    summary = "Upload a Makefile for MULTI_FILE builds",
    description = "Stores the multipart `file` part as the problem's Makefile. The uploaded filename must be `Makefile` (case-insensitive). A problem Makefile takes precedence over one inside a submitted archive. Body limit: 128 MB.",
    params(("display_id" = String, Path, description = "Problem display ID")),
    request_body(content_type = "multipart/form-data", description = "Makefile in the `file` part"),
    responses(
        (status = 200, description = "Updated configuration", body = PipelineConfigResponse),
        (status = 400, description = "Bad request (INVALID_MAKEFILE_NAME, FILE_REQUIRED, VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Malformed token (TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Problem not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, principal, multipart))]
pub async fn upload_makefile(
    MaybeAuthUser(principal): MaybeAuthUser,
    State(state): State<AppState>,
    Path(display_id): Path<String>,
    multipart: Multipart,
) -> Result<Json<PipelineConfigResponse>, AppError> {
    let problem = ensure_can_modify(&state.db, &display_id, principal.as_ref()).await?;
    let file = MultipartForm::read(multipart).await?.take_file("file")?;

    let updated = service(&state).upload_makefile(problem, file).await?;
    Ok(Json(PipelineConfigResponse::from(&updated)))
}

#[utoipa::path(
    post,
    path = "/makefile/delete",
    tag = "Pipeline",
    operation_id = "deleteMakefile",
    summary = "Remove the problem's Makefile",
    description = "Clears the Makefile reference. Deleting the stored blob is best-effort. Succeeds when no Makefile is configured.",
    params(("display_id" = String, Path, description = "Problem display ID")),
    responses(
        (status = 200, description = "Updated configuration", body = PipelineConfigResponse),
        (status = 401, description = "Malformed token (TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Problem not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, principal))]
pub async fn delete_makefile(
    MaybeAuthUser(principal): MaybeAuthUser,
    State(state): State<AppState>,
    Path(display_id): Path<String>,
) -> Result<Json<PipelineConfigResponse>, AppError> {
    let problem = ensure_can_modify(&state.db, &display_id, principal.as_ref()).await?;
    let updated = service(&state).delete_makefile(problem).await?;
    Ok(Json(PipelineConfigResponse::from(&updated)))
}

/// Body limit layer for artifact upload routes (128MB).
pub fn upload_body_limit() -> DefaultBodyLimit {
    DefaultBodyLimit::max(128 * 1024 * 1024)
}
