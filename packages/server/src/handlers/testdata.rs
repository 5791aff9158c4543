use axum::Json;
use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::{AuthUser, MaybeAuthUser};
use crate::extractors::json::AppJson;
use crate::models::testdata::*;
use crate::state::AppState;
use crate::testdata::{TestdataService, archive};
use crate::utils::multipart::MultipartForm;
use crate::utils::permission::{ensure_can_modify, ensure_can_view};

fn service(state: &AppState) -> TestdataService<'_> {
    TestdataService::new(&state.db, state.store.as_ref(), &state.config.storage.buckets)
}

/// Modify permission is never granted anonymously, so this only fails if
/// the permission check was skipped.
fn uploader_id(principal: Option<&AuthUser>) -> Result<i32, AppError> {
    principal
        .map(|user| user.user_id)
        .ok_or(AppError::PermissionDenied)
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Testdata",
    operation_id = "uploadTestdata",
    summary = "Upload a new testdata version",
    description = "Stores a zip archive as the next testdata version. The manifest is read from the optional `manifest` part, or from `manifest.json` inside the archive. Every file the manifest references must be present. New versions are always inactive. Body limit: 200 MB.",
    params(("display_id" = String, Path, description = "Problem display ID")),
    request_body(content_type = "multipart/form-data", description = "`file`: zip archive; `manifest`: optional JSON manifest overriding the embedded one"),
    responses(
        (status = 201, description = "Version created", body = TestdataVersionResponse),
        (status = 400, description = "Bad request (FILE_REQUIRED, INVALID_ARCHIVE, MANIFEST_INVALID)", body = ErrorBody),
        (status = 401, description = "Malformed token (TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Problem not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Concurrent upload won the version number (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, principal, multipart))]
pub async fn upload_testdata(
    MaybeAuthUser(principal): MaybeAuthUser,
    State(state): State<AppState>,
    Path(display_id): Path<String>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let problem = ensure_can_modify(&state.db, &display_id, principal.as_ref()).await?;
    let uploader = uploader_id(principal.as_ref())?;

    let mut form = MultipartForm::read(multipart).await?;
    let file = form.take_file("file")?;
    let manifest = form.take_text("manifest")?;
    let prepared = archive::prepare_upload(&file.data, manifest.as_deref())?;

    let model = service(&state)
        .create_version(problem.id, prepared, uploader)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(TestdataVersionResponse::from_model(&model)),
    ))
}

#[utoipa::path(
    post,
    path = "/subtasks",
    tag = "Testdata",
    operation_id = "uploadSubtaskTestdata",
    summary = "Upload subtask-structured testdata",
    description = "The archive holds `sstt.in` / `sstt.out` pairs (two-digit subtask and case numbers). The manifest is generated from the `config` part; subtask 0 holds the samples and carries no points. Body limit: 200 MB.",
    params(("display_id" = String, Path, description = "Problem display ID")),
    request_body(content_type = "multipart/form-data", description = "`file`: zip archive; `config`: JSON SubtaskConfig"),
    responses(
        (status = 201, description = "Version created", body = TestdataVersionResponse),
        (status = 400, description = "Bad request (FILE_REQUIRED, INVALID_ARCHIVE, MANIFEST_INVALID, VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Malformed token (TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Problem not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Concurrent upload won the version number (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, principal, multipart))]
pub async fn upload_subtask_testdata(
    MaybeAuthUser(principal): MaybeAuthUser,
    State(state): State<AppState>,
    Path(display_id): Path<String>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let problem = ensure_can_modify(&state.db, &display_id, principal.as_ref()).await?;
    let uploader = uploader_id(principal.as_ref())?;

    let mut form = MultipartForm::read(multipart).await?;
    let file = form.take_file("file")?;
    let raw_config = form
        .take_text("config")?
        .ok_or_else(|| AppError::Validation("Missing 'config' field".into()))?;
    let config: SubtaskConfig = serde_json::from_str(&raw_config)
        .map_err(|e| AppError::Validation(format!("Invalid subtask config: {e}")))?;
    let prepared = archive::prepare_subtask_upload(&file.data, &config)?;

    let model = service(&state)
        .create_version(problem.id, prepared, uploader)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(TestdataVersionResponse::from_model(&model)),
    ))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Testdata",
    operation_id = "listTestdataVersions",
    summary = "List testdata versions",
    description = "All versions of the problem, newest first. Exactly one is active once a version has been activated.",
    params(("display_id" = String, Path, description = "Problem display ID")),
    responses(
        (status = 200, description = "Versions", body = Vec<TestdataVersionResponse>),
        (status = 401, description = "Malformed token (TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Problem not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, principal))]
pub async fn list_versions(
    MaybeAuthUser(principal): MaybeAuthUser,
    State(state): State<AppState>,
    Path(display_id): Path<String>,
) -> Result<Json<Vec<TestdataVersionResponse>>, AppError> {
    let problem = ensure_can_modify(&state.db, &display_id, principal.as_ref()).await?;
    let versions = service(&state).list_versions(problem.id).await?;
    Ok(Json(
        versions
            .iter()
            .map(TestdataVersionResponse::from_model)
            .collect(),
    ))
}

#[utoipa::path(
    patch,
    path = "/activate",
    tag = "Testdata",
    operation_id = "activateTestdataVersion",
    summary = "Activate a testdata version",
    description = "Makes the given version the single active one; the previously active version is deactivated in the same transaction. Submissions already accepted keep the version they were frozen to.",
    params(("display_id" = String, Path, description = "Problem display ID")),
    request_body = ActivateTestdataRequest,
    responses(
        (status = 200, description = "Activated version", body = TestdataVersionResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Malformed token (TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Problem or version not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, principal, payload), fields(version = payload.version))]
pub async fn activate_version(
    MaybeAuthUser(principal): MaybeAuthUser,
    State(state): State<AppState>,
    Path(display_id): Path<String>,
    AppJson(payload): AppJson<ActivateTestdataRequest>,
) -> Result<Json<TestdataVersionResponse>, AppError> {
    let problem = ensure_can_modify(&state.db, &display_id, principal.as_ref()).await?;
    if payload.version < 1 {
        return Err(AppError::Validation("version must be at least 1".into()));
    }
    let model = service(&state).activate(problem.id, payload.version).await?;
    Ok(Json(TestdataVersionResponse::from_model(&model)))
}

#[utoipa::path(
    get,
    path = "/active",
    tag = "Testdata",
    operation_id = "getActiveManifest",
    summary = "Get the active manifest",
    description = "The active version number and its manifest. 404 until a version has been activated.",
    params(("display_id" = String, Path, description = "Problem display ID")),
    responses(
        (status = 200, description = "Active manifest", body = ActiveManifestResponse),
        (status = 401, description = "Malformed token (TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Problem not found or nothing active (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, principal))]
pub async fn get_active_manifest(
    MaybeAuthUser(principal): MaybeAuthUser,
    State(state): State<AppState>,
    Path(display_id): Path<String>,
) -> Result<Json<ActiveManifestResponse>, AppError> {
    let problem = ensure_can_modify(&state.db, &display_id, principal.as_ref()).await?;
    let (row, manifest) = service(&state).get_active_manifest(problem.id).await?;
    Ok(Json(ActiveManifestResponse {
        version: row.version,
        manifest,
    }))
}

#[utoipa::path(
    get,
    path = "/{version}/download",
    tag = "Testdata",
    operation_id = "downloadTestdataVersion",
    summary = "Download a testdata archive",
    description = "The stored zip of a version, including its `manifest.json`.",
    params(
        ("display_id" = String, Path, description = "Problem display ID"),
        ("version" = i32, Path, description = "Version number"),
    ),
    responses(
        (status = 200, description = "Zip archive", content_type = "application/zip"),
        (status = 401, description = "Malformed token (TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Problem or version not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, principal))]
pub async fn download_version(
    MaybeAuthUser(principal): MaybeAuthUser,
    State(state): State<AppState>,
    Path((display_id, version)): Path<(String, i32)>,
) -> Result<Response, AppError> {
    let problem = ensure_can_modify(&state.db, &display_id, principal.as_ref()).await?;
    let (row, data) = service(&state).download(problem.id, version).await?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/zip")
        .header(header::CONTENT_LENGTH, data.len().to_string())
        .header(
            header::CONTENT_DISPOSITION,
            format!(
                "attachment; filename=\"testdata-{}-v{}.zip\"",
                problem.display_id, row.version
            ),
        )
        .header(header::ETAG, format!("\"{}\"", row.zip_sha256))
        .body(data.into())
        .map_err(|e| AppError::Internal(format!("Failed to build response: {e}")))
}

#[utoipa::path(
    get,
    path = "/samples",
    tag = "Testdata",
    operation_id = "getSampleCases",
    summary = "Get sample cases",
    description = "Sample cases of the active version with their input and expected output. Anyone who can view the problem may read them; non-sample cases are never exposed.",
    params(("display_id" = String, Path, description = "Problem display ID")),
    responses(
        (status = 200, description = "Sample cases", body = Vec<SampleCaseResponse>),
        (status = 401, description = "Malformed token (TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Problem not found or nothing active (NOT_FOUND)", body = ErrorBody),
    ),
    security((), ("jwt" = [])),
)]
#[instrument(skip(state, principal))]
pub async fn get_samples(
    MaybeAuthUser(principal): MaybeAuthUser,
    State(state): State<AppState>,
    Path(display_id): Path<String>,
) -> Result<Json<Vec<SampleCaseResponse>>, AppError> {
    let problem = ensure_can_view(&state.db, &display_id, principal.as_ref()).await?;
    Ok(Json(service(&state).sample_cases(problem.id).await?))
}

/// Body limit layer for testdata upload routes (200MB).
pub fn testdata_body_limit() -> DefaultBodyLimit {
    DefaultBodyLimit::max(200 * 1024 * 1024)
}
