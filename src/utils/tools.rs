//! Discovery and diagnostics for external command-line backends

use crate::extractor::models::ErrorKind;
use crate::utils::error::ExtractorError;
use once_cell::sync::OnceCell;
use std::path::{Path, PathBuf};
use tokio::process::Command as AsyncCommand;
use tracing::{debug, error, info, warn};

/// Lazily resolved external tool
///
/// Resolution happens on first use so a missing binary only fails the
/// extractor that needs it.
#[derive(Debug)]
pub struct ToolLocator {
    name: &'static str,
    configured: Option<PathBuf>,
    resolved: OnceCell<Option<PathBuf>>,
}

impl ToolLocator {
    pub fn new(name: &'static str, configured: Option<PathBuf>) -> Self {
        Self {
            name,
            configured,
            resolved: OnceCell::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn path(&self) -> Option<&Path> {
        self.resolved
            .get_or_init(|| find_tool(self.name, self.configured.as_deref()))
            .as_deref()
    }

    /// Run the tool with `args` followed by `-- <url>` and return stdout.
    ///
    /// The child is killed if the returned future is dropped, so an attempt
    /// timeout or cancellation does not leave stray processes behind.
    pub async fn run(&self, args: &[&str], url: &str) -> Result<Vec<u8>, ExtractorError> {
        let path = self
            .path()
            .ok_or(ExtractorError::ToolNotFound { tool: self.name })?;

        debug!("Running {} {:?} for {}", self.name, args, url);
        let output = AsyncCommand::new(path)
            .args(args)
            .arg("--")
            .arg(url)
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            let message = String::from_utf8_lossy(&output.stderr).trim().to_string();
            error!("{} failed: {}", self.name, message);
            return Err(ExtractorError::ToolFailed {
                tool: self.name,
                kind: classify_stderr(&message),
                message,
            });
        }

        Ok(output.stdout)
    }
}

/// Find a tool binary with priority:
/// 1. Explicit path from settings
/// 2. Next to the current executable (bundled)
/// 3. System PATH
/// 4. Common installation paths
pub fn find_tool(name: &str, configured: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = configured {
        if is_executable(path) {
            return Some(path.to_path_buf());
        }
        warn!("Configured {} path is not executable: {:?}", name, path);
    }

    if let Some(bundled) = find_bundled(name) {
        info!("✓ Using bundled {}: {:?}", name, bundled);
        return Some(bundled);
    }

    if let Ok(path) = which::which(name) {
        info!("✓ Using system {}: {:?}", name, path);
        return Some(path);
    }

    if let Some(common) = find_in_common_paths(name) {
        info!("✓ Using {} from common path: {:?}", name, common);
        return Some(common);
    }

    warn!("✗ {} not found anywhere!", name);
    None
}

fn find_bundled(name: &str) -> Option<PathBuf> {
    let exe_path = std::env::current_exe().ok()?;
    let exe_dir = exe_path.parent()?;
    let candidate = exe_dir.join(name);
    debug!("Checking bundled path: {:?}", candidate);
    is_executable(&candidate).then_some(candidate)
}

fn find_in_common_paths(name: &str) -> Option<PathBuf> {
    let mut dirs_to_check = vec![
        // macOS Homebrew (Apple Silicon)
        PathBuf::from("/opt/homebrew/bin"),
        // macOS Homebrew (Intel) / manual installs
        PathBuf::from("/usr/local/bin"),
        PathBuf::from("/usr/bin"),
    ];
    // pip --user installs
    if let Some(home) = dirs::home_dir() {
        dirs_to_check.push(home.join(".local").join("bin"));
    }

    dirs_to_check
        .into_iter()
        .map(|dir| dir.join(name))
        .find(|path| is_executable(path))
}

/// Check if a file is executable
#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

// On Windows, just check if file exists
#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Classify a failed tool run by its stderr
pub fn classify_stderr(stderr: &str) -> ErrorKind {
    let text = stderr.to_lowercase();
    let any = |needles: &[&str]| needles.iter().any(|n| text.contains(n));

    if any(&["http error 429", "too many requests", "rate limit", "rate-limit"]) {
        ErrorKind::RateLimited
    } else if any(&["unsupported url", "no suitable extractor", "unsupported"]) {
        ErrorKind::Unsupported
    } else if any(&[
        "timed out",
        "timeout",
        "connection reset",
        "connection refused",
        "connection aborted",
        "temporary failure in name resolution",
        "name or service not known",
        "network is unreachable",
        "http error 500",
        "http error 502",
        "http error 503",
        "http error 504",
        "remote end closed connection",
    ]) {
        ErrorKind::NetworkError
    } else {
        ErrorKind::NotFound
    }
}
