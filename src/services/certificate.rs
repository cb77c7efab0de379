use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::CertificateConfig;
use crate::services::mnemonic::Mnemonic;

#[derive(Debug, Error)]
pub enum CertificateError {
    #[error("certificate io: {0}")]
    Io(#[from] std::io::Error),

    #[error("renderer exited with {status}: {stderr}")]
    Command { status: String, stderr: String },

    #[error("renderer didn't produce {0}")]
    MissingOutput(PathBuf),
}

/// Values printed on a certificate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateData {
    pub mid: String,
    pub id: String,
    pub name: String,
    pub label: String,
    pub article: String,
}

impl CertificateData {
    pub fn new(mid: &Mnemonic, name: &str) -> Self {
        Self {
            mid: mid.as_str().to_string(),
            id: mid.display_id(),
            name: name.to_string(),
            label: mid.label().to_string(),
            article: mid.article().to_string(),
        }
    }

    fn substitute(&self, arg: &str, output: &Path) -> String {
        arg.replace("{output}", &output.to_string_lossy())
            .replace("{mid}", &self.mid)
            .replace("{id}", &self.id)
            .replace("{name}", &self.name)
            .replace("{label}", &self.label)
            .replace("{article}", &self.article)
    }
}

/// A rendered PDF on disk. Callers must [`Certificate::cleanup`] it.
#[derive(Debug)]
pub struct Certificate {
    path: PathBuf,
}

impl Certificate {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn read(&self) -> Result<Vec<u8>, CertificateError> {
        Ok(tokio::fs::read(&self.path).await?)
    }

    pub async fn cleanup(self) {
        if let Err(e) = tokio::fs::remove_file(&self.path).await {
            warn!(path = %self.path.display(), "can't remove certificate: {}", e);
        }
    }
}

#[async_trait]
pub trait CertificateRenderer: Send + Sync {
    async fn render(&self, data: &CertificateData) -> Result<Certificate, CertificateError>;
}

/// Runs the configured external program to produce the PDF
#[derive(Debug, Clone)]
pub struct CommandRenderer {
    command: String,
    args: Vec<String>,
    output_dir: PathBuf,
}

impl CommandRenderer {
    pub fn new(config: &CertificateConfig) -> Self {
        Self {
            command: config.command.clone(),
            args: config.args.clone(),
            output_dir: config.output_dir.clone(),
        }
    }
}

#[async_trait]
impl CertificateRenderer for CommandRenderer {
    async fn render(&self, data: &CertificateData) -> Result<Certificate, CertificateError> {
        tokio::fs::create_dir_all(&self.output_dir).await?;
        let output = self.output_dir.join(format!("{}.pdf", Uuid::new_v4()));

        let args: Vec<String> = self
            .args
            .iter()
            .map(|arg| data.substitute(arg, &output))
            .collect();

        debug!(command = %self.command, ?args, "rendering certificate");
        let result = Command::new(&self.command)
            .args(&args)
            .kill_on_drop(true)
            .output()
            .await?;

        if !result.status.success() {
            // the renderer may have written a partial file
            let _ = tokio::fs::remove_file(&output).await;
            return Err(CertificateError::Command {
                status: result.status.to_string(),
                stderr: String::from_utf8_lossy(&result.stderr).trim().to_string(),
            });
        }

        if tokio::fs::metadata(&output).await.is_err() {
            return Err(CertificateError::MissingOutput(output));
        }

        Ok(Certificate::new(output))
    }
}
