mod v1;

use utoipa_axum::router::OpenApiRouter;

use crate::state::AppState;

/// Every API version, mounted under `/api` by [`crate::build_router`].
/// Problem routes are keyed by display ID, never by the numeric row ID.
pub fn api_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().nest("/v1", v1::problem_routes())
}
