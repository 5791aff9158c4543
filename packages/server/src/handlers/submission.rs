use axum::Json;
use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::submission::*;
use crate::pipeline::validator::SubmissionPayload;
use crate::state::AppState;
use crate::submission::SubmissionService;
use crate::utils::multipart::MultipartForm;
use crate::utils::permission::ensure_can_view;

fn service(state: &AppState) -> SubmissionService<'_> {
    SubmissionService::new(
        &state.db,
        state.store.as_ref(),
        &state.config.storage.buckets,
        state.dispatcher.as_deref(),
    )
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Submissions",
    operation_id = "createSubmission",
    summary = "Submit inline source",
    description = "For SINGLE_FILE and FUNCTION_ONLY problems. The language must be in the problem's allowed list. FUNCTION_ONLY sources are merged into the problem template before judging. The submission is frozen to the testdata version active right now.",
    params(("display_id" = String, Path, description = "Problem display ID")),
    request_body = CreateSubmissionRequest,
    responses(
        (status = 201, description = "Submission accepted", body = SubmissionResponse),
        (status = 400, description = "Bad request (SUBMISSION_TYPE_MISMATCH, LANGUAGE_NOT_ALLOWED, TEMPLATE_NOT_CONFIGURED, TEMPLATE_MARKER_MISSING, NO_ACTIVE_TESTDATA, VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Problem not found (NOT_FOUND)", body = ErrorBody),
        (status = 503, description = "Judge unavailable, nothing recorded (JUDGE_UNAVAILABLE)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id, language = %payload.language))]
pub async fn create_submission(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(display_id): Path<String>,
    AppJson(payload): AppJson<CreateSubmissionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let problem = ensure_can_view(&state.db, &display_id, Some(&auth_user)).await?;

    let model = service(&state)
        .submit(
            &problem,
            auth_user.user_id,
            &payload.language,
            SubmissionPayload::Inline(&payload.source),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(SubmissionResponse::from(model))))
}

#[utoipa::path(
    post,
    path = "/archive",
    tag = "Submissions",
    operation_id = "createArchiveSubmission",
    summary = "Submit a project archive",
    description = "For MULTI_FILE problems. The `file` part is a zip of the project; it is built with the problem Makefile if one is configured, else with a top-level Makefile in the archive, else with the language default. Body limit: 128 MB.",
    params(("display_id" = String, Path, description = "Problem display ID")),
    request_body(content_type = "multipart/form-data", content = ArchiveSubmissionForm),
    responses(
        (status = 201, description = "Submission accepted", body = SubmissionResponse),
        (status = 400, description = "Bad request (SUBMISSION_TYPE_MISMATCH, LANGUAGE_NOT_ALLOWED, INVALID_ARCHIVE, FILE_REQUIRED, NO_ACTIVE_TESTDATA, VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Problem not found (NOT_FOUND)", body = ErrorBody),
        (status = 503, description = "Judge unavailable, nothing recorded (JUDGE_UNAVAILABLE)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, multipart), fields(user_id = auth_user.user_id))]
pub async fn create_archive_submission(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(display_id): Path<String>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let problem = ensure_can_view(&state.db, &display_id, Some(&auth_user)).await?;

    let mut form = MultipartForm::read(multipart).await?;
    let language = form
        .take_text("language")?
        .ok_or_else(|| AppError::Validation("Missing 'language' field".into()))?;
    let file = form.take_file("file")?;

    let model = service(&state)
        .submit(
            &problem,
            auth_user.user_id,
            &language,
            SubmissionPayload::Archive(&file.data),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(SubmissionResponse::from(model))))
}

/// Body limit layer for archive submissions (128MB).
pub fn submission_body_limit() -> DefaultBodyLimit {
    DefaultBodyLimit::max(128 * 1024 * 1024)
}
