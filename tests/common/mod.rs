//! In-process mock of the student-records API (axum on an ephemeral port).
//! Every request is recorded as "METHOD /path" and any route can be forced to
//! answer with a chosen status, an unreadable body, or no answer in time.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::extract::{Path, Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::{from_fn_with_state, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use base64::Engine;
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::json;

use studentdesk::api::{ApiClient, Student, StudentDraft};
use studentdesk::dispatcher::Dispatcher;
use studentdesk::identity::SessionStore;

pub const ADMIN_USER: &str = "alice";
pub const ADMIN_EMAIL: &str = "alice@school.org";
pub const ADMIN_PASSWORD: &str = "s3cret";
pub const STANDARD_USER: &str = "bob";
pub const STANDARD_PASSWORD: &str = "hunter2";

#[derive(Debug, Clone)]
struct MockUser {
    username: String,
    name: String,
    email: String,
    password: String,
    role: String,
}

#[derive(Default)]
struct Inner {
    users: Vec<MockUser>,
    students: Vec<Student>,
    next_id: i64,
    exams: HashMap<i64, Vec<serde_json::Value>>,
    fees: HashMap<i64, Vec<serde_json::Value>>,
    logins: Vec<serde_json::Value>,
    hits: Vec<String>,
    failures: HashMap<String, u16>,
    garbled: HashSet<String>,
    stalled: HashSet<String>,
}

#[derive(Clone, Default)]
pub struct MockApi {
    inner: Arc<Mutex<Inner>>,
}

impl MockApi {
    /// Seeded with an ADMIN (alice, role "ROLE_ADMIN"), a STANDARD user (bob) and
    /// students 1..=7. Student 3 has two exams and one fee record.
    pub fn new() -> Self {
        let api = MockApi::default();
        {
            let mut g = api.inner.lock();
            g.users.push(MockUser {
                username: ADMIN_USER.into(),
                name: "Alice Admin".into(),
                email: ADMIN_EMAIL.into(),
                password: ADMIN_PASSWORD.into(),
                role: "ROLE_ADMIN".into(),
            });
            g.users.push(MockUser {
                username: STANDARD_USER.into(),
                name: "Bob Teacher".into(),
                email: "bob@school.org".into(),
                password: STANDARD_PASSWORD.into(),
                role: "USER".into(),
            });
            let names = ["Asha Rao", "Ben Ode", "Chidi Obi", "Dana Kim", "Eli Park", "Fay Wong", "Gus Lee"];
            for (i, n) in names.iter().enumerate() {
                let id = i as i64 + 1;
                let email = format!("{}@students.org", n.split(' ').next().unwrap_or("x").to_lowercase());
                g.students.push(Student { id, name: n.to_string(), email });
            }
            g.next_id = names.len() as i64 + 1;
            g.exams.insert(
                3,
                vec![
                    json!({"semester": "S1", "subject": "Math", "marksObtained": 42, "maxMarks": 50, "examDate": "2024-03-01"}),
                    json!({"semester": null, "subject": "Physics", "marksObtained": 37.5, "maxMarks": 50, "examDate": null}),
                ],
            );
            g.fees.insert(3, vec![json!({"term": "2024-T1", "amount": 1200.5, "paid": false, "dueDate": "2024-04-30"})]);
        }
        api
    }

    pub async fn spawn(&self) -> Result<String> { self.spawn_at("").await }

    /// Serve the API below `prefix` (e.g. "/records"); the returned base URL includes it.
    pub async fn spawn_at(&self, prefix: &str) -> Result<String> {
        let api = Router::new()
            .route("/api/auth/login", post(login))
            .route("/api/auth/signup", post(signup))
            .route("/api/students", get(list_students).post(create_student))
            .route("/api/students/{id}", put(update_student).delete(delete_student))
            .route("/api/students/{id}/exams", get(list_exams))
            .route("/api/students/{id}/fees", get(list_fees))
            .route("/api/admin/logins", get(admin_logins))
            .layer(from_fn_with_state(self.clone(), record))
            .with_state(self.clone());
        let app = if prefix.is_empty() { api } else { Router::new().nest(prefix, api) };
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Ok(format!("http://{}{}", addr, prefix))
    }

    pub fn fail(&self, method: &str, path: &str, status: u16) {
        self.inner.lock().failures.insert(format!("{} {}", method, path), status);
    }

    /// Answer 200 with a body that is not JSON.
    pub fn garble(&self, method: &str, path: &str) {
        self.inner.lock().garbled.insert(format!("{} {}", method, path));
    }

    /// Hold the request far longer than any client timeout used in the tests.
    pub fn stall(&self, method: &str, path: &str) {
        self.inner.lock().stalled.insert(format!("{} {}", method, path));
    }

    pub fn clear_failures(&self) {
        let mut g = self.inner.lock();
        g.failures.clear();
        g.garbled.clear();
        g.stalled.clear();
    }

    pub fn hits(&self) -> Vec<String> { self.inner.lock().hits.clone() }

    pub fn hit_count(&self, key: &str) -> usize { self.inner.lock().hits.iter().filter(|h| *h == key).count() }

    pub fn reset_hits(&self) { self.inner.lock().hits.clear(); }

    pub fn student_ids(&self) -> Vec<i64> { self.inner.lock().students.iter().map(|s| s.id).collect() }
}

/// Spawn a mock and build a dispatcher with in-memory session storage against it.
pub async fn start() -> Result<(MockApi, Dispatcher)> {
    let mock = MockApi::new();
    let base = mock.spawn().await?;
    let dispatcher = Dispatcher::new(ApiClient::new(&base)?, SessionStore::in_memory());
    Ok((mock, dispatcher))
}

/// Like [`start`], but requests give up after `timeout`, so stalled routes surface as transport failures.
pub async fn start_with_timeout(timeout: Duration) -> Result<(MockApi, Dispatcher)> {
    let mock = MockApi::new();
    let base = mock.spawn().await?;
    let dispatcher = Dispatcher::new(ApiClient::with_timeout(&base, Some(timeout))?, SessionStore::in_memory());
    Ok((mock, dispatcher))
}

async fn record(State(api): State<MockApi>, req: Request, next: Next) -> Response {
    let key = format!("{} {}", req.method(), req.uri().path());
    let (forced, garbled, stalled) = {
        let mut g = api.inner.lock();
        g.hits.push(key.clone());
        (g.failures.get(&key).copied(), g.garbled.contains(&key), g.stalled.contains(&key))
    };
    if stalled {
        tokio::time::sleep(Duration::from_secs(30)).await;
    }
    if garbled {
        return (StatusCode::OK, "<html>maintenance</html>").into_response();
    }
    if let Some(status) = forced {
        let code = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        return (code, Json(json!({"error": "FORCED"}))).into_response();
    }
    next.run(req).await
}

fn is_admin_role(role: &str) -> bool {
    let r = role.trim().to_ascii_uppercase();
    r == "ADMIN" || r == "ROLE_ADMIN"
}

/// Resolve the Basic credential to a user or answer 401.
fn authenticate(api: &MockApi, headers: &HeaderMap) -> Result<MockUser, Response> {
    let unauthorized = || StatusCode::UNAUTHORIZED.into_response();
    let value = headers.get("authorization").and_then(|v| v.to_str().ok()).ok_or_else(unauthorized)?;
    let encoded = value.strip_prefix("Basic ").ok_or_else(unauthorized)?;
    let decoded = base64::engine::general_purpose::STANDARD.decode(encoded).map_err(|_| unauthorized())?;
    let text = String::from_utf8(decoded).map_err(|_| unauthorized())?;
    let (user, pass) = text.split_once(':').ok_or_else(unauthorized)?;
    let g = api.inner.lock();
    g.users
        .iter()
        .find(|u| u.username == user && u.password == pass)
        .cloned()
        .ok_or_else(unauthorized)
}

fn require_admin(api: &MockApi, headers: &HeaderMap) -> Result<MockUser, Response> {
    let user = authenticate(api, headers)?;
    if is_admin_role(&user.role) { Ok(user) } else { Err(StatusCode::FORBIDDEN.into_response()) }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginBody {
    login_id: String,
    password: String,
}

async fn login(State(api): State<MockApi>, Json(body): Json<LoginBody>) -> Response {
    let mut g = api.inner.lock();
    let Some(user) = g.users.iter().find(|u| u.username == body.login_id || u.email == body.login_id).cloned() else {
        return (StatusCode::NOT_FOUND, Json(json!({"error": "NO_USER"}))).into_response();
    };
    if user.password != body.password {
        return (StatusCode::UNAUTHORIZED, Json(json!({"error": "WRONG_PASSWORD"}))).into_response();
    }
    g.logins.push(json!({"username": user.username, "loginTime": "2024-05-01T10:11:12.123"}));
    Json(json!({"username": user.username, "name": user.name, "email": user.email, "role": user.role})).into_response()
}

#[derive(Deserialize)]
struct SignupBody {
    name: String,
    email: String,
    password: String,
}

async fn signup(State(api): State<MockApi>, Json(body): Json<SignupBody>) -> Response {
    let mut g = api.inner.lock();
    if g.users.iter().any(|u| u.email == body.email) {
        return (StatusCode::CONFLICT, Json(json!({"error": "EMAIL_EXISTS"}))).into_response();
    }
    g.users.push(MockUser {
        username: body.email.clone(),
        name: body.name,
        email: body.email,
        password: body.password,
        role: "USER".into(),
    });
    StatusCode::CREATED.into_response()
}

async fn list_students(State(api): State<MockApi>, headers: HeaderMap) -> Response {
    if let Err(r) = authenticate(&api, &headers) { return r; }
    let g = api.inner.lock();
    Json(g.students.clone()).into_response()
}

async fn create_student(State(api): State<MockApi>, headers: HeaderMap, Json(draft): Json<StudentDraft>) -> Response {
    if let Err(r) = require_admin(&api, &headers) { return r; }
    let mut g = api.inner.lock();
    let student = Student { id: g.next_id, name: draft.name, email: draft.email };
    g.next_id += 1;
    g.students.push(student.clone());
    (StatusCode::CREATED, Json(student)).into_response()
}

async fn update_student(
    State(api): State<MockApi>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(draft): Json<StudentDraft>,
) -> Response {
    if let Err(r) = require_admin(&api, &headers) { return r; }
    let mut g = api.inner.lock();
    match g.students.iter_mut().find(|s| s.id == id) {
        Some(s) => {
            s.name = draft.name;
            s.email = draft.email;
            Json(s.clone()).into_response()
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn delete_student(State(api): State<MockApi>, Path(id): Path<i64>, headers: HeaderMap) -> Response {
    if let Err(r) = require_admin(&api, &headers) { return r; }
    let mut g = api.inner.lock();
    let before = g.students.len();
    g.students.retain(|s| s.id != id);
    if g.students.len() == before { StatusCode::NOT_FOUND.into_response() } else { StatusCode::NO_CONTENT.into_response() }
}

async fn list_exams(State(api): State<MockApi>, Path(id): Path<i64>, headers: HeaderMap) -> Response {
    if let Err(r) = authenticate(&api, &headers) { return r; }
    let g = api.inner.lock();
    Json(g.exams.get(&id).cloned().unwrap_or_default()).into_response()
}

async fn list_fees(State(api): State<MockApi>, Path(id): Path<i64>, headers: HeaderMap) -> Response {
    if let Err(r) = authenticate(&api, &headers) { return r; }
    let g = api.inner.lock();
    Json(g.fees.get(&id).cloned().unwrap_or_default()).into_response()
}

async fn admin_logins(State(api): State<MockApi>, headers: HeaderMap) -> Response {
    if let Err(r) = require_admin(&api, &headers) { return r; }
    let g = api.inner.lock();
    Json(g.logins.clone()).into_response()
}
