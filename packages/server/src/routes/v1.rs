use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::handlers;
use crate::state::AppState;

pub fn problem_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .nest("/problems/{display_id}/pipeline", pipeline_routes())
        .nest("/problems/{display_id}/testdata", testdata_routes())
        .nest("/problems/{display_id}/submissions", submission_routes())
}

fn pipeline_routes() -> OpenApiRouter<AppState> {
    let config = OpenApiRouter::new()
        .routes(routes!(
            handlers::pipeline::get_config,
            handlers::pipeline::update_config
        ))
        .routes(routes!(handlers::pipeline::delete_makefile));

    let upload = OpenApiRouter::new()
        .routes(routes!(handlers::pipeline::upload_checker))
        .routes(routes!(handlers::pipeline::upload_template))
        .routes(routes!(handlers::pipeline::upload_makefile))
        .layer(handlers::pipeline::upload_body_limit());

    config.merge(upload)
}

fn testdata_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::testdata::list_versions,
            handlers::testdata::upload_testdata
        ))
        .routes(routes!(handlers::testdata::upload_subtask_testdata))
        .routes(routes!(handlers::testdata::activate_version))
        .routes(routes!(handlers::testdata::get_active_manifest))
        .routes(routes!(handlers::testdata::download_version))
        .routes(routes!(handlers::testdata::get_samples))
        .layer(handlers::testdata::testdata_body_limit())
}

fn submission_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::submission::create_submission))
        .routes(routes!(handlers::submission::create_archive_submission))
        .layer(handlers::submission::submission_body_limit())
}
