//! End-to-end tests of the HTTP surface over the in-memory store

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use registrar::auth::{BootstrapAdmin, JwtConfig, LockoutConfig, PasswordConfig};
use registrar::config::Config;
use registrar::handlers::router;
use registrar::state::AppState;
use registrar::store::MemoryStore;

const ADMIN_EMAIL: &str = "admin@example.com";
const ADMIN_PASSWORD: &str = "admin-password";

fn test_config() -> Config {
    let mut config = Config::default();
    config.auth.jwt = JwtConfig {
        secret: "0123456789abcdef0123456789abcdef".to_string(),
        ..JwtConfig::default()
    };
    config.auth.password = PasswordConfig {
        memory_cost_kib: 1024,
        time_cost: 1,
        parallelism: 1,
        min_password_length: 8,
    };
    config.auth.bootstrap_admin = Some(BootstrapAdmin {
        email: ADMIN_EMAIL.to_string(),
        password: ADMIN_PASSWORD.to_string(),
    });
    config
}

async fn app() -> Router {
    let state = AppState::with_backend(
        test_config(),
        MemoryStore::new().into(),
        CancellationToken::new(),
    )
    .await
    .expect("state");
    router(state)
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Option<String>, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let location = response
        .headers()
        .get(header::LOCATION)
        .map(|v| v.to_str().unwrap().to_string());
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, location, json)
}

async fn login(app: &Router, email: &str, password: &str) -> String {
    let (status, _, body) = send(
        app,
        Method::POST,
        "/api/authentication/login",
        None,
        Some(json!({ "email": email, "password": password })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {}", body);
    body["token"].as_str().unwrap().to_string()
}

async fn admin_token(app: &Router) -> String {
    login(app, ADMIN_EMAIL, ADMIN_PASSWORD).await
}

#[tokio::test]
async fn test_course_listing_is_paged() {
    let app = app().await;
    let token = admin_token(&app).await;

    for i in 1..=25 {
        let (status, _, _) = send(
            &app,
            Method::POST,
            "/api/courses",
            Some(&token),
            Some(json!({ "title": format!("Course {}", i), "credits": 3 })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, _, body) = send(
        &app,
        Method::GET,
        "/api/courses?pageNumber=3&pageSize=10",
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalCount"], 25);
    assert_eq!(body["totalPages"], 3);
    assert_eq!(body["pageNumber"], 3);
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 5);
    assert_eq!(items[0]["title"], "Course 21");

    // out of range sizes clamp instead of failing
    let (status, _, body) = send(
        &app,
        Method::GET,
        "/api/courses?pageNumber=0&pageSize=500",
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pageSize"], 100);
    assert_eq!(body["pageNumber"], 1);
    assert_eq!(body["items"].as_array().unwrap().len(), 25);

    let (status, _, body) = send(&app, Method::GET, "/api/courses?pageNumber=9", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["items"].as_array().unwrap().is_empty());
    assert_eq!(body["totalPages"], 3);
}

#[tokio::test]
async fn test_writes_require_admin() {
    let app = app().await;
    let course = json!({ "title": "Algebra", "credits": 4 });

    let (status, _, _) = send(&app, Method::POST, "/api/courses", None, Some(course.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _, body) = send(
        &app,
        Method::POST,
        "/api/authentication/register",
        None,
        Some(json!({ "email": "user@example.com", "password": "user-password" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["email"], "user@example.com");

    let user_token = login(&app, "user@example.com", "user-password").await;
    let (status, _, _) = send(
        &app,
        Method::POST,
        "/api/courses",
        Some(&user_token),
        Some(course),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _, body) = send(&app, Method::GET, "/api/courses", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalCount"], 0);
}

#[tokio::test]
async fn test_course_lifecycle() {
    let app = app().await;
    let token = admin_token(&app).await;

    let (status, location, body) = send(
        &app,
        Method::POST,
        "/api/courses",
        Some(&token),
        Some(json!({ "title": "Algebra", "credits": 4 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["id"].as_i64().unwrap();
    assert_eq!(location.as_deref(), Some(format!("/api/courses/{}", id).as_str()));

    let uri = format!("/api/courses/{}", id);
    let (status, _, body) = send(
        &app,
        Method::PUT,
        &uri,
        Some(&token),
        Some(json!({ "id": id + 1, "title": "Geometry", "credits": 2 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Route ID and course ID do not match.");

    let (status, _, _) = send(
        &app,
        Method::PUT,
        &uri,
        Some(&token),
        Some(json!({ "id": id, "title": "Geometry", "credits": 2 })),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _, body) = send(&app, Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Geometry");
    assert_eq!(body["credits"], 2);

    let (status, _, _) = send(&app, Method::DELETE, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _, _) = send(&app, Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, _) = send(&app, Method::DELETE, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, _) = send(
        &app,
        Method::PUT,
        &uri,
        Some(&token),
        Some(json!({ "id": id, "title": "Geometry", "credits": 2 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_student_and_enrollment_flow() {
    let app = app().await;
    let token = admin_token(&app).await;

    let (status, _, course) = send(
        &app,
        Method::POST,
        "/api/courses",
        Some(&token),
        Some(json!({ "title": "Biology", "credits": 3 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, location, student) = send(
        &app,
        Method::POST,
        "/api/Student",
        Some(&token),
        Some(json!({
            "firstName": "Ada",
            "lastName": "Lovelace",
            "dateOfBirth": "1815-12-10",
            "idNumber": "S-0001"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let student_id = student["id"].as_i64().unwrap();
    assert_eq!(
        location.as_deref(),
        Some(format!("/api/Student/{}", student_id).as_str())
    );

    let (status, location, enrollment) = send(
        &app,
        Method::POST,
        "/api/Enrollment",
        Some(&token),
        Some(json!({ "courseId": course["id"], "studentId": student_id })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let enrollment_id = enrollment["id"].as_i64().unwrap();
    assert_eq!(
        location.as_deref(),
        Some(format!("/api/Enrollment/{}", enrollment_id).as_str())
    );

    let (status, _, body) = send(
        &app,
        Method::PUT,
        &format!("/api/Enrollment/{}", enrollment_id),
        Some(&token),
        Some(json!({ "id": 999, "courseId": course["id"], "studentId": student_id })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Route ID and body ID do not match.");

    let (status, _, _) = send(
        &app,
        Method::POST,
        "/api/Enrollment",
        Some(&token),
        Some(json!({ "courseId": 999, "studentId": student_id })),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let (status, _, body) = send(&app, Method::GET, "/api/Enrollment", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalCount"], 1);

    let (status, _, _) = send(&app, Method::GET, "/api/Student/999", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_deleting_referenced_rows_is_a_conflict() {
    let app = app().await;
    let token = admin_token(&app).await;

    let (_, _, course) = send(
        &app,
        Method::POST,
        "/api/courses",
        Some(&token),
        Some(json!({ "title": "Chemistry", "credits": 5 })),
    )
    .await;
    let (_, _, student) = send(
        &app,
        Method::POST,
        "/api/Student",
        Some(&token),
        Some(json!({
            "firstName": "Rosalind",
            "lastName": "Franklin",
            "dateOfBirth": "1920-07-25",
            "idNumber": "S-0002"
        })),
    )
    .await;
    let (status, _, enrollment) = send(
        &app,
        Method::POST,
        "/api/Enrollment",
        Some(&token),
        Some(json!({ "courseId": course["id"], "studentId": student["id"] })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let course_uri = format!("/api/courses/{}", course["id"]);
    let (status, _, body) = send(&app, Method::DELETE, &course_uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");
    assert_eq!(body["operation"], "delete");

    let student_uri = format!("/api/Student/{}", student["id"]);
    let (status, _, _) = send(&app, Method::DELETE, &student_uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _, _) = send(&app, Method::GET, &course_uri, None, None).await;
    assert_eq!(status, StatusCode::OK);

    let enrollment_uri = format!("/api/Enrollment/{}", enrollment["id"]);
    let (status, _, _) = send(&app, Method::DELETE, &enrollment_uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _, _) = send(&app, Method::DELETE, &course_uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _, _) = send(&app, Method::DELETE, &student_uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_login_validation_and_rejection() {
    let app = app().await;

    let (status, _, body) = send(
        &app,
        Method::POST,
        "/api/authentication/login",
        None,
        Some(json!({ "email": "", "password": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let codes: Vec<&str> = body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["code"].as_str().unwrap())
        .collect();
    assert!(codes.contains(&"EmailRequired"));
    assert!(codes.contains(&"PasswordRequired"));

    let (status, _, _) = send(
        &app,
        Method::POST,
        "/api/authentication/login",
        None,
        Some(json!({ "email": ADMIN_EMAIL, "password": "wrong-password" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_repeated_wrong_passwords_lock_the_account() {
    let app = app().await;
    let (status, _, _) = send(
        &app,
        Method::POST,
        "/api/authentication/register",
        None,
        Some(json!({ "email": "user@example.com", "password": "user-password" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let max_attempts = LockoutConfig::default().max_attempts;
    for _ in 0..max_attempts {
        let (status, _, _) = send(
            &app,
            Method::POST,
            "/api/authentication/login",
            None,
            Some(json!({ "email": ADMIN_EMAIL, "password": "wrong-password" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    let (status, _, locked) = send(
        &app,
        Method::POST,
        "/api/authentication/login",
        None,
        Some(json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (_, _, unknown) = send(
        &app,
        Method::POST,
        "/api/authentication/login",
        None,
        Some(json!({ "email": "nobody@example.com", "password": "whatever-password" })),
    )
    .await;
    assert_eq!(locked, unknown);

    login(&app, "user@example.com", "user-password").await;
}

#[tokio::test]
async fn test_health_probes() {
    let app = app().await;

    let (status, _, body) = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, _, body) = send(&app, Method::GET, "/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ready"], true);
}
