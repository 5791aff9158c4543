use ::common::SubmissionType;
use pipeline_server::entity::course_member::CourseRole;
use pipeline_server::entity::problem::Visibility;
use pipeline_server::entity::user::UserRole;

use crate::common::{TestApp, routes};

fn patch_body() -> serde_json::Value {
    serde_json::json!({ "artifactPaths": ["out/report.txt"] })
}

#[tokio::test]
async fn owner_and_admin_can_modify() {
    let app = TestApp::spawn().await;
    let owner = app.create_user("owner", UserRole::User).await;
    let admin = app.create_user("admin", UserRole::Admin).await;
    app.create_problem("P1001", Some(owner.id), Visibility::Private, SubmissionType::SingleFile)
        .await;

    for token in [&owner.token, &admin.token] {
        let res = app
            .patch_json(&routes::pipeline_config("P1001"), &patch_body(), Some(token))
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
    }
}

#[tokio::test]
async fn course_teacher_and_ta_can_modify_but_student_cannot() {
    let app = TestApp::spawn().await;
    let teacher = app.create_user("teacher", UserRole::User).await;
    let ta = app.create_user("ta", UserRole::User).await;
    let student = app.create_user("student", UserRole::User).await;
    let problem = app
        .create_problem("P1002", None, Visibility::Private, SubmissionType::SingleFile)
        .await;
    let course_id = app.create_course_with_problem(problem.id).await;
    app.add_member(course_id, teacher.id, CourseRole::Teacher, false).await;
    app.add_member(course_id, ta.id, CourseRole::Ta, false).await;
    app.add_member(course_id, student.id, CourseRole::Student, false).await;

    for token in [&teacher.token, &ta.token] {
        let res = app
            .patch_json(&routes::pipeline_config("P1002"), &patch_body(), Some(token))
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
    }

    let res = app
        .patch_json(&routes::pipeline_config("P1002"), &patch_body(), Some(&student.token))
        .await;
    assert_eq!(res.status, 403);
    assert_eq!(res.code(), "PERMISSION_DENIED");

    // Students can still read the configuration.
    let res = app.get(&routes::pipeline_config("P1002"), Some(&student.token)).await;
    assert_eq!(res.status, 200, "{}", res.text);
}

#[tokio::test]
async fn former_teacher_has_no_access() {
    let app = TestApp::spawn().await;
    let former = app.create_user("former", UserRole::User).await;
    let problem = app
        .create_problem("P1003", None, Visibility::Private, SubmissionType::SingleFile)
        .await;
    let course_id = app.create_course_with_problem(problem.id).await;
    app.add_member(course_id, former.id, CourseRole::Teacher, true).await;

    let res = app
        .patch_json(&routes::pipeline_config("P1003"), &patch_body(), Some(&former.token))
        .await;
    assert_eq!(res.status, 403);

    let res = app.get(&routes::pipeline_config("P1003"), Some(&former.token)).await;
    assert_eq!(res.status, 403);
}

#[tokio::test]
async fn teacher_of_unrelated_course_cannot_modify() {
    let app = TestApp::spawn().await;
    let teacher = app.create_user("teacher", UserRole::User).await;
    let mine = app
        .create_problem("P1004", None, Visibility::Private, SubmissionType::SingleFile)
        .await;
    let other = app
        .create_problem("P1005", None, Visibility::Private, SubmissionType::SingleFile)
        .await;
    let course_id = app.create_course_with_problem(mine.id).await;
    app.add_member(course_id, teacher.id, CourseRole::Teacher, false).await;
    app.create_course_with_problem(other.id).await;

    let res = app
        .patch_json(&routes::pipeline_config("P1005"), &patch_body(), Some(&teacher.token))
        .await;
    assert_eq!(res.status, 403);
}

#[tokio::test]
async fn anonymous_access_depends_on_visibility() {
    let app = TestApp::spawn().await;
    app.create_problem("PUB", None, Visibility::Public, SubmissionType::SingleFile)
        .await;
    app.create_problem("HIDDEN", None, Visibility::Unlisted, SubmissionType::SingleFile)
        .await;

    let res = app.get(&routes::pipeline_config("PUB"), None).await;
    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["submissionType"], "SINGLE_FILE");

    let res = app.get(&routes::pipeline_config("HIDDEN"), None).await;
    assert_eq!(res.status, 403);
    assert_eq!(res.code(), "PERMISSION_DENIED");

    // Anonymous callers never modify, even public problems.
    let res = app
        .patch_json(&routes::pipeline_config("PUB"), &patch_body(), None)
        .await;
    assert_eq!(res.status, 403);
}

#[tokio::test]
async fn unknown_problem_is_not_found_before_forbidden() {
    let app = TestApp::spawn().await;
    let stranger = app.create_user("stranger", UserRole::User).await;

    let res = app
        .patch_json(&routes::pipeline_config("NOPE"), &patch_body(), Some(&stranger.token))
        .await;
    assert_eq!(res.status, 404);
    assert_eq!(res.code(), "NOT_FOUND");

    let res = app.get(&routes::pipeline_config("NOPE"), None).await;
    assert_eq!(res.status, 404);
}

#[tokio::test]
async fn malformed_token_is_rejected() {
    let app = TestApp::spawn().await;
    app.create_problem("PUB", None, Visibility::Public, SubmissionType::SingleFile)
        .await;

    let res = app
        .get(&routes::pipeline_config("PUB"), Some("not-a-jwt"))
        .await;
    assert_eq!(res.status, 401);
    assert_eq!(res.code(), "TOKEN_INVALID");
}
