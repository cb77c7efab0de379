//! In-memory collaborators and a router harness for unit tests.

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body, Bytes},
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use axum_extra::extract::cookie::Cookie;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use uuid::Uuid;

use crate::app::{router, AppState};
use crate::config::{AppConfig, SAMPLE};
use crate::database::models::{Element, NewUser, Sponsorship, User, UserSummary};
use crate::database::{DatabaseError, Store};
use crate::middleware::SESSION_COOKIE;
use crate::services::mail::{MailError, Mailer, OutgoingMail};
use crate::services::{Certificate, CertificateData, CertificateError, CertificateRenderer};

fn simulated() -> DatabaseError {
    DatabaseError::Sqlx(sqlx::Error::Protocol("simulated store failure".into()))
}

#[derive(Default)]
struct Tables {
    next_uid: i64,
    users: BTreeMap<i64, User>,
    elements: BTreeMap<String, Element>,
}

/// [`Store`] kept in process memory, with switches to make calls fail
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a user with token version 0 and returns its uid
    pub fn add_user(&self, name: &str, password_hash: &str) -> i64 {
        let mut tables = self.tables.lock().unwrap();
        tables.next_uid += 1;
        let uid = tables.next_uid;
        tables.users.insert(
            uid,
            User {
                uid,
                name: name.to_string(),
                password: password_hash.to_string(),
                tid: 0,
            },
        );
        uid
    }

    pub fn add_element(&self, element: Element) {
        self.tables
            .lock()
            .unwrap()
            .elements
            .insert(element.mid.clone(), element);
    }

    pub fn user(&self, uid: i64) -> Option<User> {
        self.tables.lock().unwrap().users.get(&uid).cloned()
    }

    pub fn stored_element(&self, mid: &str) -> Option<Element> {
        self.tables.lock().unwrap().elements.get(mid).cloned()
    }

    pub fn element_count(&self) -> usize {
        self.tables.lock().unwrap().elements.len()
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn read(&self) -> Result<std::sync::MutexGuard<'_, Tables>, DatabaseError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(simulated());
        }
        Ok(self.tables.lock().unwrap())
    }

    fn write(&self) -> Result<std::sync::MutexGuard<'_, Tables>, DatabaseError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(simulated());
        }
        Ok(self.tables.lock().unwrap())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn user_by_id(&self, uid: i64) -> Result<Option<User>, DatabaseError> {
        Ok(self.read()?.users.get(&uid).cloned())
    }

    async fn user_by_name(&self, name: &str) -> Result<Option<User>, DatabaseError> {
        Ok(self.read()?.users.values().find(|u| u.name == name).cloned())
    }

    async fn list_users(&self) -> Result<Vec<UserSummary>, DatabaseError> {
        Ok(self
            .read()?
            .users
            .values()
            .map(|u| UserSummary {
                uid: u.uid,
                name: u.name.clone(),
            })
            .collect())
    }

    async fn insert_user(&self, user: &NewUser) -> Result<(), DatabaseError> {
        {
            let tables = self.write()?;
            if tables.users.values().any(|u| u.name == user.name) {
                return Err(simulated());
            }
        }
        self.add_user(&user.name, &user.password);
        Ok(())
    }

    async fn change_password(&self, uid: i64, password_hash: &str) -> Result<u64, DatabaseError> {
        let mut tables = self.write()?;
        Ok(match tables.users.get_mut(&uid) {
            Some(user) => {
                user.password = password_hash.to_string();
                user.tid += 1;
                1
            }
            None => 0,
        })
    }

    async fn delete_user(&self, uid: i64) -> Result<u64, DatabaseError> {
        Ok(self.write()?.users.remove(&uid).map_or(0, |_| 1))
    }

    async fn list_elements(&self) -> Result<Vec<Element>, DatabaseError> {
        Ok(self.read()?.elements.values().cloned().collect())
    }

    async fn element(&self, mid: &str) -> Result<Option<Element>, DatabaseError> {
        Ok(self.read()?.elements.get(mid).cloned())
    }

    async fn reserved_elements(&self) -> Result<Vec<Element>, DatabaseError> {
        Ok(self
            .read()?
            .elements
            .values()
            .filter(|e| e.is_reserved())
            .cloned()
            .collect())
    }

    async fn sponsored_elements(&self) -> Result<Vec<Sponsorship>, DatabaseError> {
        Ok(self
            .read()?
            .elements
            .values()
            .filter(|e| !e.is_reserved())
            .map(|e| Sponsorship {
                mid: e.mid.clone(),
                name: e.name.clone(),
                mail: e.mail.clone(),
            })
            .collect())
    }

    async fn insert_element(&self, element: &Element) -> Result<(), DatabaseError> {
        let mut tables = self.write()?;
        if tables.elements.contains_key(&element.mid) {
            return Err(simulated());
        }
        tables.elements.insert(element.mid.clone(), element.clone());
        Ok(())
    }

    async fn rename_element(&self, mid: &str, name: &str) -> Result<u64, DatabaseError> {
        let mut tables = self.write()?;
        Ok(match tables.elements.get_mut(mid) {
            Some(element) => {
                element.name = name.to_string();
                1
            }
            None => 0,
        })
    }

    async fn confirm_element(&self, mid: &str) -> Result<u64, DatabaseError> {
        let mut tables = self.write()?;
        Ok(match tables.elements.get_mut(mid) {
            Some(element) => {
                element.reservation = None;
                element.mail = None;
                1
            }
            None => 0,
        })
    }

    async fn delete_element(&self, mid: &str) -> Result<u64, DatabaseError> {
        Ok(self.write()?.elements.remove(mid).map_or(0, |_| 1))
    }

    async fn delete_elements(&self, mids: &[String]) -> Result<u64, DatabaseError> {
        let mut tables = self.write()?;
        Ok(mids
            .iter()
            .filter(|mid| tables.elements.remove(mid.as_str()).is_some())
            .count() as u64)
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        self.read().map(|_| ())
    }
}

/// Mailer that keeps every mail instead of sending it
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutgoingMail>>,
    fail: AtomicBool,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<OutgoingMail> {
        self.sent.lock().unwrap().clone()
    }

    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(MailError::Transport("simulated relay failure".into()));
        }
        self.sent.lock().unwrap().push(mail);
        Ok(())
    }
}

/// Renderer writing a small fake PDF into a temporary directory
pub struct FakeRenderer {
    dir: tempfile::TempDir,
    renders: AtomicUsize,
    fail: AtomicBool,
}

impl FakeRenderer {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
            renders: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
        }
    }

    pub fn renders(&self) -> usize {
        self.renders.load(Ordering::SeqCst)
    }

    /// Certificates still on disk
    pub fn leftovers(&self) -> usize {
        std::fs::read_dir(self.dir.path()).unwrap().count()
    }

    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl CertificateRenderer for FakeRenderer {
    async fn render(&self, data: &CertificateData) -> Result<Certificate, CertificateError> {
        self.renders.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(CertificateError::Command {
                status: "exit status: 1".into(),
                stderr: "simulated renderer failure".into(),
            });
        }

        let path: PathBuf = self.dir.path().join(format!("{}.pdf", Uuid::new_v4()));
        tokio::fs::write(&path, format!("%PDF-fake {} {}", data.mid, data.name)).await?;
        Ok(Certificate::new(path))
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        if self.body.is_empty() {
            return Value::Null;
        }
        serde_json::from_slice(&self.body).unwrap()
    }

    pub fn data(&self) -> Value {
        self.json()["data"].clone()
    }

    pub fn set_cookie(&self) -> Option<String> {
        self.headers
            .get(header::SET_COOKIE)
            .map(|v| v.to_str().unwrap().to_string())
    }

    /// `name=value` part of the Set-Cookie header, ready for a Cookie header
    pub fn session(&self) -> Option<String> {
        let cookie = Cookie::parse(self.set_cookie()?).ok()?;
        Some(cookie.stripped().to_string())
    }
}

/// The full router over in-memory collaborators
pub struct TestApp {
    pub config: AppConfig,
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub mailer: Arc<RecordingMailer>,
    pub renderer: Arc<FakeRenderer>,
}

impl TestApp {
    pub fn new() -> Self {
        let config = AppConfig::from_yaml(SAMPLE).unwrap();
        let store = Arc::new(MemoryStore::new());
        let mailer = Arc::new(RecordingMailer::default());
        let renderer = Arc::new(FakeRenderer::new());

        let state = AppState::new(&config, store.clone(), mailer.clone(), renderer.clone());

        Self {
            config,
            state,
            store,
            mailer,
            renderer,
        }
    }

    pub fn router(&self) -> Router {
        router(self.state.clone())
    }

    /// Cookie header value of a fresh session for `uid`
    pub fn cookie_for(&self, uid: i64) -> String {
        let tid = self.store.user(uid).map_or(0, |u| u.tid);
        Cookie::new(SESSION_COOKIE, self.state.tokens.issue(uid, tid).unwrap()).to_string()
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        cookie: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = self.router().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();

        TestResponse {
            status,
            headers,
            body,
        }
    }
}
