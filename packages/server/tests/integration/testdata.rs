use std::io::Read;

use ::common::{SubmissionType, TestdataManifest};
use futures::future::join_all;
use pipeline_server::entity::course_member::CourseRole;
use pipeline_server::entity::problem::Visibility;
use pipeline_server::entity::testdata_version;
use pipeline_server::entity::user::UserRole;
use reqwest::multipart::{Form, Part};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};

use crate::common::{TestApp, TestUser, build_zip, routes, sample_manifest, standard_testdata_zip};

async fn setup(app: &TestApp) -> (TestUser, i32) {
    let owner = app.create_user("owner", UserRole::User).await;
    let problem = app
        .create_problem("P1", Some(owner.id), Visibility::Private, SubmissionType::SingleFile)
        .await;
    (owner, problem.id)
}

async fn active_versions(app: &TestApp, problem_id: i32) -> Vec<i32> {
    testdata_version::Entity::find()
        .filter(testdata_version::Column::ProblemId.eq(problem_id))
        .filter(testdata_version::Column::IsActive.eq(true))
        .all(&app.db)
        .await
        .unwrap()
        .into_iter()
        .map(|v| v.version)
        .collect()
}

#[tokio::test]
async fn fresh_upload_is_inactive_until_activated() {
    let app = TestApp::spawn().await;
    let (owner, problem_id) = setup(&app).await;

    let res = app
        .upload(&routes::testdata("P1"), "td.zip", standard_testdata_zip(), Some(&owner.token))
        .await;
    assert_eq!(res.status, 201, "{}", res.text);
    assert_eq!(res.body["version"], 1);
    assert_eq!(res.body["isActive"], false);
    assert_eq!(res.body["caseCount"], 2);
    assert_eq!(res.body["totalPoints"], 100.0);

    let res = app.get(&routes::testdata_active("P1"), Some(&owner.token)).await;
    assert_eq!(res.status, 404);
    assert!(active_versions(&app, problem_id).await.is_empty());

    let res = app.activate("P1", 1, &owner.token).await;
    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["isActive"], true);

    let res = app.get(&routes::testdata_active("P1"), Some(&owner.token)).await;
    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["version"], 1);
    assert_eq!(res.body["manifest"]["cases"][0]["name"], "Sample 1");
}

#[tokio::test]
async fn activation_swaps_the_active_version() {
    let app = TestApp::spawn().await;
    let (owner, problem_id) = setup(&app).await;

    assert_eq!(app.upload_testdata("P1", &owner.token).await, 1);
    assert_eq!(app.upload_testdata("P1", &owner.token).await, 2);

    app.activate("P1", 1, &owner.token).await;
    assert_eq!(active_versions(&app, problem_id).await, vec![1]);

    let res = app.activate("P1", 2, &owner.token).await;
    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(active_versions(&app, problem_id).await, vec![2]);

    // Re-activating the active version is a no-op.
    let res = app.activate("P1", 2, &owner.token).await;
    assert_eq!(res.status, 200);
    assert_eq!(active_versions(&app, problem_id).await, vec![2]);

    let res = app.get(&routes::testdata("P1"), Some(&owner.token)).await;
    assert_eq!(res.status, 200);
    let listed: Vec<(i64, bool)> = res
        .body
        .as_array()
        .unwrap()
        .iter()
        .map(|v| (v["version"].as_i64().unwrap(), v["isActive"].as_bool().unwrap()))
        .collect();
    assert_eq!(listed, vec![(2, true), (1, false)]);
}

#[tokio::test]
async fn activating_unknown_version_is_not_found() {
    let app = TestApp::spawn().await;
    let (owner, _) = setup(&app).await;
    app.upload_testdata("P1", &owner.token).await;

    let res = app.activate("P1", 7, &owner.token).await;
    assert_eq!(res.status, 404);
    assert_eq!(res.code(), "NOT_FOUND");
}

#[tokio::test]
async fn concurrent_uploads_get_gapless_versions() {
    let app = TestApp::spawn().await;
    let (owner, problem_id) = setup(&app).await;

    let path = routes::testdata("P1");
    let results = join_all((0..6).map(|_| {
        app.upload(&path, "td.zip", standard_testdata_zip(), Some(&owner.token))
    }))
    .await;
    for res in &results {
        assert_eq!(res.status, 201, "{}", res.text);
    }

    let versions: Vec<i32> = testdata_version::Entity::find()
        .filter(testdata_version::Column::ProblemId.eq(problem_id))
        .order_by_asc(testdata_version::Column::Version)
        .all(&app.db)
        .await
        .unwrap()
        .into_iter()
        .map(|v| v.version)
        .collect();
    assert_eq!(versions, (1..=6).collect::<Vec<_>>());
}

#[tokio::test]
async fn concurrent_activations_leave_one_active() {
    let app = TestApp::spawn().await;
    let (owner, problem_id) = setup(&app).await;
    for _ in 0..4 {
        app.upload_testdata("P1", &owner.token).await;
    }

    let results = join_all((1..=4).map(|v| app.activate("P1", v, &owner.token))).await;
    for res in &results {
        assert_eq!(res.status, 200, "{}", res.text);
    }
    assert_eq!(active_versions(&app, problem_id).await.len(), 1);
}

#[tokio::test]
async fn archive_without_manifest_is_rejected() {
    let app = TestApp::spawn().await;
    let (owner, _) = setup(&app).await;

    let zip = build_zip(&[("1.in", "1"), ("1.out", "1")]);
    let res = app
        .upload(&routes::testdata("P1"), "td.zip", zip, Some(&owner.token))
        .await;
    assert_eq!(res.status, 400);
    assert_eq!(res.code(), "MANIFEST_INVALID");
}

#[tokio::test]
async fn manifest_referencing_missing_files_is_rejected() {
    let app = TestApp::spawn().await;
    let (owner, problem_id) = setup(&app).await;

    let manifest = sample_manifest();
    let zip = build_zip(&[("manifest.json", manifest.as_str()), ("1.in", "1"), ("1.out", "1")]);
    let res = app
        .upload(&routes::testdata("P1"), "td.zip", zip, Some(&owner.token))
        .await;
    assert_eq!(res.status, 400);
    assert_eq!(res.code(), "MANIFEST_INVALID");
    assert!(res.body["message"].as_str().unwrap().contains("2.in"));

    let count = testdata_version::Entity::find()
        .filter(testdata_version::Column::ProblemId.eq(problem_id))
        .all(&app.db)
        .await
        .unwrap()
        .len();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn unsafe_archive_paths_are_rejected() {
    let app = TestApp::spawn().await;
    let (owner, _) = setup(&app).await;

    let manifest = sample_manifest();
    let zip = build_zip(&[("manifest.json", manifest.as_str()), ("../escape.in", "x")]);
    let res = app
        .upload(&routes::testdata("P1"), "td.zip", zip, Some(&owner.token))
        .await;
    assert_eq!(res.status, 400);
    assert_eq!(res.code(), "INVALID_ARCHIVE");

    let res = app
        .upload(&routes::testdata("P1"), "td.zip", b"not a zip".to_vec(), Some(&owner.token))
        .await;
    assert_eq!(res.status, 400);
    assert_eq!(res.code(), "INVALID_ARCHIVE");
}

#[tokio::test]
async fn manifest_part_overrides_embedded_manifest() {
    let app = TestApp::spawn().await;
    let (owner, _) = setup(&app).await;

    let zip = build_zip(&[("a.in", "1"), ("a.out", "1")]);
    let manifest = serde_json::json!({
        "version": "1.0",
        "defaultTimeLimitMs": 2000,
        "defaultMemoryLimitKb": 65536,
        "cases": [
            { "name": "Only", "inputFile": "a.in", "outputFile": "a.out", "points": 10, "isSample": false }
        ]
    })
    .to_string();
    let form = Form::new()
        .part("file", Part::bytes(zip).file_name("td.zip"))
        .text("manifest", manifest);
    let res = app
        .post_form(&routes::testdata("P1"), form, Some(&owner.token))
        .await;
    assert_eq!(res.status, 201, "{}", res.text);

    // The stored archive carries the override as manifest.json.
    let res = app.get(&routes::testdata_download("P1", 1), Some(&owner.token)).await;
    assert_eq!(res.status, 200);
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(res.bytes)).unwrap();
    let mut text = String::new();
    archive
        .by_name("manifest.json")
        .unwrap()
        .read_to_string(&mut text)
        .unwrap();
    let stored: TestdataManifest = serde_json::from_str(&text).unwrap();
    assert_eq!(stored.default_time_limit_ms, 2000);
    assert_eq!(stored.cases.len(), 1);
}

#[tokio::test]
async fn download_names_the_archive_after_problem_and_version() {
    let app = TestApp::spawn().await;
    let (owner, _) = setup(&app).await;
    let zip = standard_testdata_zip();
    app.upload(&routes::testdata("P1"), "td.zip", zip.clone(), Some(&owner.token))
        .await;

    let res = app.get(&routes::testdata_download("P1", 1), Some(&owner.token)).await;
    assert_eq!(res.status, 200);
    assert_eq!(res.headers["content-type"], "application/zip");
    assert_eq!(
        res.headers["content-disposition"],
        "attachment; filename=\"testdata-P1-v1.zip\""
    );
    assert_eq!(res.bytes, zip);

    let res = app.get(&routes::testdata_download("P1", 9), Some(&owner.token)).await;
    assert_eq!(res.status, 404);
}

#[tokio::test]
async fn subtask_upload_generates_manifest() {
    let app = TestApp::spawn().await;
    let (owner, _) = setup(&app).await;

    let zip = build_zip(&[
        ("0000.in", "s"),
        ("0000.out", "s"),
        ("0100.in", "a"),
        ("0100.out", "a"),
        ("0101.in", "b"),
        ("0101.out", "b"),
        ("0102.in", "c"),
        ("0102.out", "c"),
    ]);
    let config = serde_json::json!({
        "defaultTimeLimitMs": 1000,
        "defaultMemoryLimitKb": 262144,
        "subtasks": [
            { "caseCount": 1, "points": 0 },
            { "caseCount": 3, "points": 100, "timeLimitMs": 2000 }
        ]
    })
    .to_string();
    let form = Form::new()
        .part("file", Part::bytes(zip).file_name("subtasks.zip"))
        .text("config", config);
    let res = app
        .post_form(&routes::testdata_subtasks("P1"), form, Some(&owner.token))
        .await;
    assert_eq!(res.status, 201, "{}", res.text);
    assert_eq!(res.body["caseCount"], 4);

    app.activate("P1", 1, &owner.token).await;
    let res = app.get(&routes::testdata_active("P1"), Some(&owner.token)).await;
    let cases = res.body["manifest"]["cases"].as_array().unwrap();
    assert_eq!(cases[0]["isSample"], true);
    assert_eq!(cases[0]["inputFile"], "0000.in");
    let points: Vec<f64> = cases[1..].iter().map(|c| c["points"].as_f64().unwrap()).collect();
    assert_eq!(points, vec![34.0, 33.0, 33.0]);
    assert_eq!(cases[1]["name"], "Subtask 2 - Case 1");
    assert_eq!(cases[1]["timeLimitMs"], 2000);
}

#[tokio::test]
async fn subtask_upload_with_missing_case_files_is_rejected() {
    let app = TestApp::spawn().await;
    let (owner, _) = setup(&app).await;

    let zip = build_zip(&[("0000.in", "s"), ("0000.out", "s")]);
    let config = serde_json::json!({
        "defaultTimeLimitMs": 1000,
        "defaultMemoryLimitKb": 262144,
        "subtasks": [{ "caseCount": 2, "points": 0 }]
    })
    .to_string();
    let form = Form::new()
        .part("file", Part::bytes(zip).file_name("subtasks.zip"))
        .text("config", config);
    let res = app
        .post_form(&routes::testdata_subtasks("P1"), form, Some(&owner.token))
        .await;
    assert_eq!(res.status, 400);
    assert_eq!(res.code(), "MANIFEST_INVALID");
}

#[tokio::test]
async fn samples_are_visible_to_course_students_only_as_samples() {
    let app = TestApp::spawn().await;
    let (owner, problem_id) = setup(&app).await;
    let student = app.create_user("student", UserRole::User).await;
    let course_id = app.create_course_with_problem(problem_id).await;
    app.add_member(course_id, student.id, CourseRole::Student, false).await;

    app.upload_testdata("P1", &owner.token).await;
    let res = app.get(&routes::testdata_samples("P1"), Some(&student.token)).await;
    assert_eq!(res.status, 404, "nothing active yet: {}", res.text);

    app.activate("P1", 1, &owner.token).await;
    let res = app.get(&routes::testdata_samples("P1"), Some(&student.token)).await;
    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(
        res.body,
        serde_json::json!([{ "name": "Sample 1", "input": "1 2\n", "output": "3\n" }])
    );

    // Version management stays with staff.
    let res = app.get(&routes::testdata("P1"), Some(&student.token)).await;
    assert_eq!(res.status, 403);
    let res = app.get(&routes::testdata_download("P1", 1), Some(&student.token)).await;
    assert_eq!(res.status, 403);
    let res = app.activate("P1", 1, &student.token).await;
    assert_eq!(res.status, 403);
}
