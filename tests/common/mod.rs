#![allow(dead_code)]

use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum_extra::extract::cookie::Cookie;
use reqwest::StatusCode;

static SERVER: OnceLock<TestServer> = OnceLock::new();

const BIN: &str = env!("CARGO_BIN_EXE_sponsorship-api");

/// Store URL for the Postgres-backed tests. They are `#[ignore]`d by default,
/// run them with `DATABASE_URL=postgres://... cargo test -- --ignored`.
pub fn database_url() -> Result<String> {
    let _ = dotenvy::dotenv();
    std::env::var("DATABASE_URL")
        .ok()
        .filter(|url| !url.is_empty())
        .context("DATABASE_URL must be set for tests run with --ignored")
}

/// Unique suffix so parallel runs don't collide in a shared database
pub fn unique(prefix: &str) -> String {
    format!("{}-{}", prefix, uuid::Uuid::new_v4().simple())
}

fn write_config(dir: &std::path::Path) -> Result<PathBuf> {
    let path = dir.join("config.yaml");
    let yaml = format!(
        r#"
log_level: info
database:
  host: localhost:5432
  user: unused
  password: unused
  database: unused
cache:
  expiration: 1m
  purge: 5m
reservation:
  expiration: 72h
client_session:
  jwt_signature: integration-secret
  expire: 1h
server:
  port: 0
elements:
  pv:
    from: 1
    to: 120
    label: PV-Modul
    article: das
mail:
  host: localhost
  port: 2525
  user: ""
  password: ""
  from: sponsorship@example.org
  sender_name: Sponsorship
certificate:
  command: "true"
  output_dir: {}
"#,
        dir.join("certificates").display()
    );
    std::fs::write(&path, yaml).context("failed to write test config")?;
    Ok(path)
}

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    pub config: PathBuf,
    _dir: tempfile::TempDir,
    child: Child,
}

impl TestServer {
    fn spawn() -> Result<Self> {
        let dir = tempfile::tempdir()?;
        let config = write_config(dir.path())?;

        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        // DATABASE_URL is inherited from the environment
        let child = Command::new(BIN)
            .arg("--config")
            .arg(&config)
            .arg("serve")
            .env("SPONSORSHIP_PORT", port.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .context("failed to spawn server binary")?;

        Ok(Self {
            port,
            base_url,
            config,
            _dir: dir,
            child,
        })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            let url = format!("{}/health", self.base_url);
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    /// Runs `create-user` against the same configuration
    pub fn create_user(&self, name: &str, password: &str) -> Result<()> {
        let status = Command::new(BIN)
            .arg("--config")
            .arg(&self.config)
            .args(["create-user", "--name", name, "--password", password])
            .status()
            .context("failed to run create-user")?;
        anyhow::ensure!(status.success(), "create-user {} failed: {}", name, status);
        Ok(())
    }
}

pub async fn ensure_server() -> Result<&'static TestServer> {
    let server = SERVER.get_or_init(|| TestServer::spawn().expect("failed to spawn server binary"));
    server.wait_ready(Duration::from_secs(10)).await?;
    Ok(server)
}

/// `session=<token>` from a response, ready to send back as Cookie header
pub fn session_cookie(resp: &reqwest::Response) -> Option<String> {
    let raw = resp.headers().get(reqwest::header::SET_COOKIE)?.to_str().ok()?;
    let cookie = Cookie::parse(raw).ok()?;
    Some(cookie.stripped().to_string())
}
