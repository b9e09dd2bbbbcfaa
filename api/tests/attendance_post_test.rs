mod helpers;

use axum::http::StatusCode;
use chrono::{DateTime, Duration, Utc};
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use serde_json::json;
use tower::ServiceExt;

use api::auth::generate_jwt;
use db::models::attendance_session::ActiveModel as SessionActiveModel;
use db::models::class::Model as ClassModel;
use db::models::class_membership::{Model as ClassMembership, Role};
use db::models::user::Model as UserModel;

use helpers::app::{authed_post, make_test_app, read_json};

struct TestCtx {
    lecturer: UserModel,
    student: UserModel,
    outsider: UserModel,
    admin: UserModel,
    class: ClassModel,
}

async fn setup(db: &DatabaseConnection) -> TestCtx {
    let lecturer = UserModel::create(db, "post_lect", "post_lect@test.com", false)
        .await
        .unwrap();
    let student = UserModel::create(db, "post_student", "post_student@test.com", false)
        .await
        .unwrap();
    let outsider = UserModel::create(db, "post_outsider", "post_outsider@test.com", false)
        .await
        .unwrap();
    let admin = UserModel::create(db, "post_admin", "post_admin@test.com", true)
        .await
        .unwrap();

    let class = ClassModel::create(db, "ATT201", "Attendance Post Tests", 2026)
        .await
        .unwrap();
    let other = ClassModel::create(db, "ATT202", "The Other Class", 2026)
        .await
        .unwrap();

    ClassMembership::assign_user_to_class(db, lecturer.id, class.id, Role::Lecturer)
        .await
        .unwrap();
    ClassMembership::assign_user_to_class(db, student.id, class.id, Role::Student)
        .await
        .unwrap();
    ClassMembership::assign_user_to_class(db, outsider.id, other.id, Role::Student)
        .await
        .unwrap();

    TestCtx {
        lecturer,
        student,
        outsider,
        admin,
        class,
    }
}

// ---------------------------
// create_session
// ---------------------------

#[tokio::test]
async fn test_create_session_as_lecturer_minimal() {
    let (app, state) = make_test_app().await;
    let ctx = setup(state.db()).await;

    let (token, _) = generate_jwt(ctx.lecturer.id, ctx.lecturer.admin);
    let body = json!({ "classId": ctx.class.id });

    let res = app
        .oneshot(authed_post("/api/attendance/sessions", &token, &body))
        .await
        .unwrap();
    let (status, json) = read_json(res).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["success"], true);

    let data = &json["data"];
    assert_eq!(data["classId"], ctx.class.id);
    assert_eq!(data["createdBy"], ctx.lecturer.id);
    assert_eq!(data["joinedCount"], 0);

    let code = data["code"].as_str().unwrap();
    assert_eq!(code.len(), 6);
    assert!(code.bytes().all(|b| b.is_ascii_digit()));

    // default window is 15 minutes
    let start = DateTime::parse_from_rfc3339(data["startTime"].as_str().unwrap()).unwrap();
    let end = DateTime::parse_from_rfc3339(data["endTime"].as_str().unwrap()).unwrap();
    assert_eq!(end - start, Duration::minutes(15));
}

#[tokio::test]
async fn test_create_session_echoes_topic_and_links() {
    let (app, state) = make_test_app().await;
    let ctx = setup(state.db()).await;

    let (token, _) = generate_jwt(ctx.lecturer.id, ctx.lecturer.admin);
    let body = json!({
        "classId": ctx.class.id,
        "durationMinutes": 30,
        "topic": "Graphs II",
        "resourceLinks": ["https://example.com/slides.pdf"],
    });

    let res = app
        .oneshot(authed_post("/api/attendance/sessions", &token, &body))
        .await
        .unwrap();
    let (status, json) = read_json(res).await;

    assert_eq!(status, StatusCode::CREATED);
    let data = &json["data"];
    assert_eq!(data["topic"], "Graphs II");
    assert_eq!(data["resourceLinks"][0], "https://example.com/slides.pdf");

    let start = DateTime::parse_from_rfc3339(data["startTime"].as_str().unwrap()).unwrap();
    let end = DateTime::parse_from_rfc3339(data["endTime"].as_str().unwrap()).unwrap();
    assert_eq!(end - start, Duration::minutes(30));
}

#[tokio::test]
async fn test_create_session_as_student_forbidden() {
    let (app, state) = make_test_app().await;
    let ctx = setup(state.db()).await;

    let (token, _) = generate_jwt(ctx.student.id, ctx.student.admin);
    let body = json!({ "classId": ctx.class.id });

    let res = app
        .oneshot(authed_post("/api/attendance/sessions", &token, &body))
        .await
        .unwrap();
    let (status, json) = read_json(res).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["success"], false);
}

#[tokio::test]
async fn test_create_session_requires_auth() {
    let (app, state) = make_test_app().await;
    let ctx = setup(state.db()).await;

    let req = axum::http::Request::builder()
        .method("POST")
        .uri("/api/attendance/sessions")
        .header("Content-Type", "application/json")
        .body(axum::body::Body::from(
            json!({ "classId": ctx.class.id }).to_string(),
        ))
        .unwrap();

    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_create_session_unknown_class_not_found() {
    let (app, state) = make_test_app().await;
    let ctx = setup(state.db()).await;

    let (token, _) = generate_jwt(ctx.admin.id, ctx.admin.admin);
    let body = json!({ "classId": 99999 });

    let res = app
        .oneshot(authed_post("/api/attendance/sessions", &token, &body))
        .await
        .unwrap();
    let (status, json) = read_json(res).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["success"], false);
}

#[tokio::test]
async fn test_create_session_rejects_half_a_coordinate_pair() {
    let (app, state) = make_test_app().await;
    let ctx = setup(state.db()).await;

    let (token, _) = generate_jwt(ctx.lecturer.id, ctx.lecturer.admin);
    let body = json!({ "classId": ctx.class.id, "latitude": 41.015 });

    let res = app
        .oneshot(authed_post("/api/attendance/sessions", &token, &body))
        .await
        .unwrap();
    let (status, _) = read_json(res).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_session_rejects_zero_duration() {
    let (app, state) = make_test_app().await;
    let ctx = setup(state.db()).await;

    let (token, _) = generate_jwt(ctx.lecturer.id, ctx.lecturer.admin);
    let body = json!({ "classId": ctx.class.id, "durationMinutes": 0 });

    let res = app
        .oneshot(authed_post("/api/attendance/sessions", &token, &body))
        .await
        .unwrap();
    let (status, _) = read_json(res).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ---------------------------
// join_session
// ---------------------------

async fn create_session_via_api(
    app: &axum::Router,
    token: &str,
    body: serde_json::Value,
) -> serde_json::Value {
    let res = app
        .clone()
        .oneshot(authed_post("/api/attendance/sessions", token, &body))
        .await
        .unwrap();
    let (status, json) = read_json(res).await;
    assert_eq!(status, StatusCode::CREATED);
    json["data"].clone()
}

#[tokio::test]
async fn test_join_open_session_without_coordinates() {
    let (app, state) = make_test_app().await;
    let ctx = setup(state.db()).await;

    let (lect_token, _) = generate_jwt(ctx.lecturer.id, false);
    let session = create_session_via_api(&app, &lect_token, json!({ "classId": ctx.class.id })).await;

    let (token, _) = generate_jwt(ctx.student.id, false);
    let body = json!({ "code": session["code"] });

    let res = app
        .oneshot(authed_post("/api/attendance/join", &token, &body))
        .await
        .unwrap();
    let (status, json) = read_json(res).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert!(json.get("reason").is_none());
    assert!(json["message"].is_string());
}

#[tokio::test]
async fn test_join_unknown_code() {
    let (app, state) = make_test_app().await;
    let ctx = setup(state.db()).await;

    let (token, _) = generate_jwt(ctx.student.id, false);
    let body = json!({ "code": "no-such-code" });

    let res = app
        .oneshot(authed_post("/api/attendance/join", &token, &body))
        .await
        .unwrap();
    let (status, json) = read_json(res).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], false);
    assert_eq!(json["reason"], "INVALID_CODE");
}

#[tokio::test]
async fn test_join_blank_code_is_bad_request() {
    let (app, state) = make_test_app().await;
    let ctx = setup(state.db()).await;

    let (token, _) = generate_jwt(ctx.student.id, false);
    let body = json!({ "code": "" });

    let res = app
        .oneshot(authed_post("/api/attendance/join", &token, &body))
        .await
        .unwrap();
    let (status, json) = read_json(res).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);
}

#[tokio::test]
async fn test_join_wrong_cohort() {
    let (app, state) = make_test_app().await;
    let ctx = setup(state.db()).await;

    let (lect_token, _) = generate_jwt(ctx.lecturer.id, false);
    let session = create_session_via_api(&app, &lect_token, json!({ "classId": ctx.class.id })).await;

    let (token, _) = generate_jwt(ctx.outsider.id, false);
    let body = json!({ "code": session["code"] });

    let res = app
        .oneshot(authed_post("/api/attendance/join", &token, &body))
        .await
        .unwrap();
    let (status, json) = read_json(res).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], false);
    assert_eq!(json["reason"], "WRONG_COHORT");
}

#[tokio::test]
async fn test_join_twice_is_already_joined() {
    let (app, state) = make_test_app().await;
    let ctx = setup(state.db()).await;

    let (lect_token, _) = generate_jwt(ctx.lecturer.id, false);
    let session = create_session_via_api(&app, &lect_token, json!({ "classId": ctx.class.id })).await;

    let (token, _) = generate_jwt(ctx.student.id, false);
    let body = json!({ "code": session["code"] });

    let res = app
        .clone()
        .oneshot(authed_post("/api/attendance/join", &token, &body))
        .await
        .unwrap();
    let (_, first) = read_json(res).await;
    assert_eq!(first["success"], true);

    let res = app
        .oneshot(authed_post("/api/attendance/join", &token, &body))
        .await
        .unwrap();
    let (status, second) = read_json(res).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["success"], false);
    assert_eq!(second["reason"], "ALREADY_JOINED");
}

#[tokio::test]
async fn test_join_geofenced_without_location_consumes_the_slot() {
    let (app, state) = make_test_app().await;
    let ctx = setup(state.db()).await;

    let (lect_token, _) = generate_jwt(ctx.lecturer.id, false);
    let session = create_session_via_api(
        &app,
        &lect_token,
        json!({ "classId": ctx.class.id, "latitude": 41.015, "longitude": 28.979 }),
    )
    .await;

    let (token, _) = generate_jwt(ctx.student.id, false);

    let res = app
        .clone()
        .oneshot(authed_post(
            "/api/attendance/join",
            &token,
            &json!({ "code": session["code"] }),
        ))
        .await
        .unwrap();
    let (_, first) = read_json(res).await;
    assert_eq!(first["success"], false);
    assert_eq!(first["reason"], "LOCATION_MISSING");

    // retrying with a perfect location no longer helps
    let res = app
        .oneshot(authed_post(
            "/api/attendance/join",
            &token,
            &json!({ "code": session["code"], "latitude": 41.015, "longitude": 28.979 }),
        ))
        .await
        .unwrap();
    let (_, second) = read_json(res).await;
    assert_eq!(second["reason"], "ALREADY_JOINED");
}

#[tokio::test]
async fn test_join_geofenced_rejects_distant_member() {
    let (app, state) = make_test_app().await;
    let ctx = setup(state.db()).await;

    let (lect_token, _) = generate_jwt(ctx.lecturer.id, false);
    let session = create_session_via_api(
        &app,
        &lect_token,
        json!({ "classId": ctx.class.id, "latitude": 41.015, "longitude": 28.979 }),
    )
    .await;

    let (token, _) = generate_jwt(ctx.student.id, false);
    // ~500 m north of the origin
    let body = json!({ "code": session["code"], "latitude": 41.0195, "longitude": 28.979 });

    let res = app
        .oneshot(authed_post("/api/attendance/join", &token, &body))
        .await
        .unwrap();
    let (status, json) = read_json(res).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], false);
    assert_eq!(json["reason"], "LOCATION_REJECTED");
}

#[tokio::test]
async fn test_join_geofenced_accepts_nearby_member() {
    let (app, state) = make_test_app().await;
    let ctx = setup(state.db()).await;

    let (lect_token, _) = generate_jwt(ctx.lecturer.id, false);
    let session = create_session_via_api(
        &app,
        &lect_token,
        json!({ "classId": ctx.class.id, "latitude": 41.015, "longitude": 28.979 }),
    )
    .await;

    let (token, _) = generate_jwt(ctx.student.id, false);
    // ~5 m north of the origin
    let body = json!({ "code": session["code"], "latitude": 41.015045, "longitude": 28.979 });

    let res = app
        .oneshot(authed_post("/api/attendance/join", &token, &body))
        .await
        .unwrap();
    let (status, json) = read_json(res).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
}

#[tokio::test]
async fn test_join_expired_session() {
    let (app, state) = make_test_app().await;
    let ctx = setup(state.db()).await;
    let now = Utc::now();

    // a session whose window elapsed before the attempt
    SessionActiveModel {
        class_id: Set(ctx.class.id),
        created_by: Set(ctx.lecturer.id),
        code: Set("424242".into()),
        start_time: Set(now - Duration::minutes(30)),
        end_time: Set(now - Duration::minutes(15)),
        created_at: Set(now - Duration::minutes(30)),
        ..Default::default()
    }
    .insert(state.db())
    .await
    .unwrap();

    let (token, _) = generate_jwt(ctx.student.id, false);
    let body = json!({ "code": "424242" });

    let res = app
        .oneshot(authed_post("/api/attendance/join", &token, &body))
        .await
        .unwrap();
    let (status, json) = read_json(res).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], false);
    assert_eq!(json["reason"], "EXPIRED");
}
