use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::header::AUTHORIZATION;
use reqwest::{RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::error::{AuthError, NetworkError, ResourceError, SignupError};
use crate::identity::{Credential, Identity};
use crate::tprintln;

use super::models::{Exam, Fee, LoginRecord, Student, StudentDraft};

/// `{error: "..."}` body the service attaches to auth failures.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
}

async fn error_code(resp: Response) -> Option<String> {
    resp.json::<ErrorBody>().await.unwrap_or_default().error
}

/// One method per remote resource. Methods never retry; every failure is classified
/// and handed back to the caller.
#[derive(Clone)]
pub struct ApiClient {
    base: Url,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(base: &str) -> Result<Self> {
        Self::with_timeout(base, None)
    }

    pub fn with_timeout(base: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut base = Url::parse(base).with_context(|| format!("invalid API base URL '{}'", base))?;
        if base.cannot_be_a_base() {
            anyhow::bail!("API base URL '{}' cannot carry request paths", base);
        }
        // a trailing slash keeps any deployment prefix when request paths are joined on
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let mut builder = reqwest::Client::builder();
        if let Some(t) = timeout { builder = builder.timeout(t); }
        let http = builder.build().context("building HTTP client")?;
        Ok(Self { base, http })
    }

    pub fn base(&self) -> &Url { &self.base }

    /// Resolve `path` below the base URL, prefix included.
    fn url(&self, path: &str) -> Result<Url, NetworkError> {
        self.base
            .join(path.trim_start_matches('/'))
            .map_err(|e| NetworkError::new(format!("bad request path {path}: {e}")))
    }

    fn authorized(&self, rb: RequestBuilder, credential: &Credential) -> RequestBuilder {
        rb.header(AUTHORIZATION, credential.header_value())
    }

    async fn send(&self, rb: RequestBuilder, what: &str) -> Result<Response, NetworkError> {
        let resp = rb.send().await.map_err(NetworkError::from)?;
        tprintln!("api {} -> {}", what, resp.status());
        debug!(target: "studentdesk::api", call = what, status = resp.status().as_u16(), "response");
        Ok(resp)
    }

    async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, ResourceError> {
        let status = resp.status();
        if !status.is_success() {
            return Err(ResourceError::Status { status: status.as_u16() });
        }
        resp.json::<T>().await.map_err(|e| ResourceError::malformed(e.to_string()))
    }

    fn expect_success(resp: &Response) -> Result<(), ResourceError> {
        let status = resp.status();
        if status.is_success() { Ok(()) } else { Err(ResourceError::Status { status: status.as_u16() }) }
    }

    // ---- auth ----

    /// `POST /api/auth/login`. `login_id` may be a username or an email.
    pub async fn authenticate(&self, login_id: &str, password: &str) -> Result<Identity, AuthError> {
        let url = self.url("/api/auth/login")?;
        let rb = self.http.post(url).json(&serde_json::json!({"loginId": login_id, "password": password}));
        let resp = self.send(rb, "auth.login").await?;
        let status = resp.status();
        if status.is_success() {
            return resp.json::<Identity>().await.map_err(|e| AuthError::Malformed { message: e.to_string() });
        }
        let code = error_code(resp).await;
        Err(match (status, code.as_deref()) {
            (StatusCode::NOT_FOUND, Some("NO_USER")) => AuthError::NoSuchUser,
            (StatusCode::UNAUTHORIZED, Some("WRONG_PASSWORD")) => AuthError::WrongPassword,
            _ => AuthError::Unknown { status: status.as_u16() },
        })
    }

    /// `POST /api/auth/signup`. Never authenticates.
    pub async fn register_account(&self, name: &str, email: &str, password: &str) -> Result<(), SignupError> {
        let url = self.url("/api/auth/signup")?;
        let rb = self.http.post(url).json(&serde_json::json!({"name": name, "email": email, "password": password}));
        let resp = self.send(rb, "auth.signup").await?;
        match resp.status() {
            s if s.is_success() => Ok(()),
            StatusCode::CONFLICT => Err(SignupError::EmailExists),
            s => Err(SignupError::Unknown { status: s.as_u16() }),
        }
    }

    // ---- students ----

    pub async fn list_students(&self, credential: &Credential) -> Result<Vec<Student>, ResourceError> {
        let rb = self.authorized(self.http.get(self.url("/api/students")?), credential);
        Self::decode(self.send(rb, "students.list").await?).await
    }

    pub async fn create_student(&self, credential: &Credential, draft: &StudentDraft) -> Result<Student, ResourceError> {
        let rb = self.authorized(self.http.post(self.url("/api/students")?), credential).json(draft);
        Self::decode(self.send(rb, "students.create").await?).await
    }

    pub async fn update_student(&self, credential: &Credential, id: i64, draft: &StudentDraft) -> Result<Student, ResourceError> {
        let url = self.url(&format!("/api/students/{}", id))?;
        let rb = self.authorized(self.http.put(url), credential).json(draft);
        Self::decode(self.send(rb, "students.update").await?).await
    }

    pub async fn delete_student(&self, credential: &Credential, id: i64) -> Result<(), ResourceError> {
        let url = self.url(&format!("/api/students/{}", id))?;
        let rb = self.authorized(self.http.delete(url), credential);
        let resp = self.send(rb, "students.delete").await?;
        Self::expect_success(&resp)
    }

    // ---- detail and admin (read-only) ----

    pub async fn list_exams(&self, credential: &Credential, student_id: i64) -> Result<Vec<Exam>, ResourceError> {
        let url = self.url(&format!("/api/students/{}/exams", student_id))?;
        let rb = self.authorized(self.http.get(url), credential);
        Self::decode(self.send(rb, "students.exams").await?).await
    }

    pub async fn list_fees(&self, credential: &Credential, student_id: i64) -> Result<Vec<Fee>, ResourceError> {
        let url = self.url(&format!("/api/students/{}/fees", student_id))?;
        let rb = self.authorized(self.http.get(url), credential);
        Self::decode(self.send(rb, "students.fees").await?).await
    }

    /// Admin-only by server policy; the dashboard only calls it for ADMIN sessions.
    pub async fn list_admin_logins(&self, credential: &Credential) -> Result<Vec<LoginRecord>, ResourceError> {
        let rb = self.authorized(self.http.get(self.url("/api/admin/logins")?), credential);
        Self::decode(self.send(rb, "admin.logins").await?).await
    }
}
