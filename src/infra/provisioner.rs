// ============================================================
// Layer 6 — Checkpoint Provisioner
// ============================================================
// Makes sure the checkpoint exists at its canonical path,
// fetching it when it does not:
//
//   CHECKPOINT_SOURCE=hf://owner/repo[/file]   → model hub
//   CHECKPOINT_SOURCE=https://host/path.mpk    → direct download
//   CHECKPOINT_SOURCE unset or empty           → local only
//
// Every fetch follows the same commit protocol:
//
//   copy ──► temp file next to the canonical path
//        ──► verify (non-empty, size matches the source)
//        ──► fsync + atomic rename
//
// A failed verification drops the temp file, so the canonical
// path either holds a complete checkpoint or nothing at all.

use std::{
    fs::{self, File},
    io,
    time::Duration,
};

use tempfile::NamedTempFile;

use crate::domain::error::ProvisioningError;
use crate::infra::checkpoint::{CheckpointManager, CHECKPOINT_FILE};

pub const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckpointSource {
    Hub { repo: String, filename: String },
    Url(String),
}

impl CheckpointSource {
    /// `Ok(None)` for an empty descriptor.
    pub fn parse(descriptor: &str) -> Result<Option<Self>, ProvisioningError> {
        let descriptor = descriptor.trim();
        if descriptor.is_empty() {
            return Ok(None);
        }

        if let Some(rest) = descriptor.strip_prefix("hf://") {
            let parts: Vec<&str> = rest.split('/').filter(|p| !p.is_empty()).collect();
            if parts.len() < 2 {
                return Err(ProvisioningError::InvalidSource(descriptor.to_string()));
            }
            let filename = if parts.len() > 2 { parts[2..].join("/") } else { CHECKPOINT_FILE.to_string() };
            return Ok(Some(Self::Hub {
                repo: format!("{}/{}", parts[0], parts[1]),
                filename,
            }));
        }

        if descriptor.starts_with("http://") || descriptor.starts_with("https://") {
            return Ok(Some(Self::Url(descriptor.to_string())));
        }

        Err(ProvisioningError::InvalidSource(descriptor.to_string()))
    }
}

impl std::fmt::Display for CheckpointSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hub { repo, filename } => write!(f, "hf://{repo}/{filename}"),
            Self::Url(url) => f.write_str(url),
        }
    }
}

pub struct CheckpointProvisioner {
    checkpoints: CheckpointManager,
    source:      Option<CheckpointSource>,
    hf_token:    Option<String>,
    timeout:     Duration,
}

impl CheckpointProvisioner {
    pub fn new(checkpoints: CheckpointManager, source: Option<CheckpointSource>) -> Self {
        Self { checkpoints, source, hf_token: None, timeout: DEFAULT_DOWNLOAD_TIMEOUT }
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.hf_token = token.filter(|t| !t.is_empty());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn checkpoints(&self) -> &CheckpointManager {
        &self.checkpoints
    }

    pub fn source(&self) -> Option<&CheckpointSource> {
        self.source.as_ref()
    }

    /// True when a checkpoint is (now) at the canonical path.
    /// No checkpoint and no source is `Ok(false)`, not an error.
    pub fn ensure_available(&self) -> Result<bool, ProvisioningError> {
        if self.checkpoints.exists() {
            return Ok(true);
        }
        let Some(source) = &self.source else {
            tracing::debug!("No checkpoint at '{}' and no source configured", self.checkpoints.path().display());
            return Ok(false);
        };

        tracing::info!("Provisioning checkpoint from {}", source);
        fs::create_dir_all(self.checkpoints.dir())?;
        match source {
            CheckpointSource::Hub { repo, filename } => self.fetch_from_hub(repo, filename)?,
            CheckpointSource::Url(url) => self.fetch_from_url(url)?,
        }
        tracing::info!("Checkpoint ready at '{}'", self.checkpoints.path().display());
        Ok(true)
    }

    fn fetch_from_hub(&self, repo: &str, filename: &str) -> Result<(), ProvisioningError> {
        use hf_hub::api::sync::ApiBuilder;

        let api = ApiBuilder::new()
            .with_token(self.hf_token.clone())
            .with_progress(false)
            .build()
            .map_err(|e| ProvisioningError::Hub(e.to_string()))?;
        let cached = api
            .model(repo.to_string())
            .get(filename)
            .map_err(|e| ProvisioningError::Hub(e.to_string()))?;

        let expected = fs::metadata(&cached)?.len();
        let mut tmp  = NamedTempFile::new_in(self.checkpoints.dir())?;
        let copied   = io::copy(&mut File::open(&cached)?, tmp.as_file_mut())?;
        self.commit(tmp, copied, Some(expected))
    }

    fn fetch_from_url(&self, url: &str) -> Result<(), ProvisioningError> {
        let download_error = |reason: String| ProvisioningError::Download { url: url.to_string(), reason };

        let agent = ureq::Agent::new_with_config(
            ureq::config::Config::builder()
                .timeout_global(Some(self.timeout))
                .build(),
        );
        let mut response = agent.get(url).call().map_err(|e| download_error(e.to_string()))?;

        let announced = response
            .headers()
            .get("content-length")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());

        let mut tmp = NamedTempFile::new_in(self.checkpoints.dir())?;
        let copied  = io::copy(&mut response.body_mut().as_reader(), tmp.as_file_mut())
            .map_err(|e| download_error(e.to_string()))?;
        self.commit(tmp, copied, announced)
    }

    /// Verify the copy, then rename it over the canonical path.
    /// On any error `tmp` is dropped, which deletes it.
    fn commit(&self, tmp: NamedTempFile, copied: u64, expected: Option<u64>) -> Result<(), ProvisioningError> {
        if copied == 0 {
            return Err(ProvisioningError::EmptyArtifact);
        }
        if let Some(expected) = expected {
            if expected != copied {
                return Err(ProvisioningError::SizeMismatch { expected, actual: copied });
            }
        }
        tmp.as_file().sync_all()?;
        tmp.persist(self.checkpoints.path())
            .map_err(|e| ProvisioningError::Io(e.error))?;
        tracing::debug!("Committed {} bytes", copied);
        Ok(())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::path::Path;
    use std::thread;

    /// Serve a single HTTP response on a loopback port.
    fn serve_once(status: &'static str, body: Vec<u8>, announced: usize) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                let mut request = [0u8; 2048];
                let _ = stream.read(&mut request);
                let head = format!(
                    "HTTP/1.1 {status}\r\nContent-Length: {announced}\r\nConnection: close\r\n\r\n"
                );
                let _ = stream.write_all(head.as_bytes());
                let _ = stream.write_all(&body);
                let _ = stream.flush();
            }
        });
        format!("http://{addr}/{CHECKPOINT_FILE}")
    }

    fn provisioner(dir: &Path, url: String) -> CheckpointProvisioner {
        CheckpointProvisioner::new(CheckpointManager::new(dir), Some(CheckpointSource::Url(url)))
            .with_timeout(Duration::from_secs(10))
    }

    fn entries(dir: &Path) -> usize {
        fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
    }

    #[test]
    fn test_parse_descriptors() {
        assert_eq!(CheckpointSource::parse("  ").unwrap(), None);
        assert_eq!(
            CheckpointSource::parse("hf://acme/emotion").unwrap(),
            Some(CheckpointSource::Hub { repo: "acme/emotion".into(), filename: CHECKPOINT_FILE.into() })
        );
        assert_eq!(
            CheckpointSource::parse("hf://acme/emotion/weights/v2.mpk").unwrap(),
            Some(CheckpointSource::Hub { repo: "acme/emotion".into(), filename: "weights/v2.mpk".into() })
        );
        assert_eq!(
            CheckpointSource::parse("https://example.org/c.mpk").unwrap(),
            Some(CheckpointSource::Url("https://example.org/c.mpk".into()))
        );
        assert!(CheckpointSource::parse("hf://only-owner").is_err());
        assert!(CheckpointSource::parse("ftp://example.org/c.mpk").is_err());
    }

    #[test]
    fn test_no_source_and_no_checkpoint_is_false() {
        let dir = tempfile::tempdir().unwrap();
        let p = CheckpointProvisioner::new(CheckpointManager::new(dir.path()), None);
        assert!(!p.ensure_available().unwrap());
        assert!(!p.checkpoints().exists());
    }

    #[test]
    fn test_existing_checkpoint_short_circuits() {
        let dir = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(dir.path());
        fs::write(manager.path(), b"already here").unwrap();
        // unreachable source, never contacted
        let p = provisioner(dir.path(), "http://127.0.0.1:9/never".into());
        assert!(p.ensure_available().unwrap());
    }

    #[test]
    fn test_download_lands_at_canonical_path() {
        let dir = tempfile::tempdir().unwrap();
        let body = b"checkpoint bytes".to_vec();
        let url = serve_once("200 OK", body.clone(), body.len());

        let p = provisioner(dir.path(), url);
        assert!(p.ensure_available().unwrap());
        assert_eq!(fs::read(p.checkpoints().path()).unwrap(), body);
        assert_eq!(entries(dir.path()), 1);
    }

    #[test]
    fn test_truncated_download_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let url = serve_once("200 OK", b"short".to_vec(), 64);

        let p = provisioner(dir.path(), url);
        assert!(p.ensure_available().is_err());
        assert!(!p.checkpoints().exists());
        assert_eq!(entries(dir.path()), 0);
    }

    #[test]
    fn test_empty_artifact_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let url = serve_once("200 OK", Vec::new(), 0);

        let p = provisioner(dir.path(), url);
        assert!(matches!(p.ensure_available(), Err(ProvisioningError::EmptyArtifact)));
        assert!(!p.checkpoints().exists());
    }

    #[test]
    fn test_http_error_status_is_a_download_error() {
        let dir = tempfile::tempdir().unwrap();
        let url = serve_once("404 Not Found", b"missing".to_vec(), 7);

        let p = provisioner(dir.path(), url);
        assert!(matches!(p.ensure_available(), Err(ProvisioningError::Download { .. })));
        assert!(!p.checkpoints().exists());
    }
}
