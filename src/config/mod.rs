//! Configuration management

mod cli;
mod env_file;

pub use cli::Cli;
pub use env_file::{parse_env, read_env_file};

use crate::types::MirrorError;
use serde::de::value::MapDeserializer;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Settings file name looked up in the working directory, then in `$HOME`
pub const CONFIG_FILE_NAME: &str = ".dropbox_mirror.env";

const DEFAULT_DOWNLOAD_NAME: &str = "dropbox_latest.zip";
const DEFAULT_TARGET_NAME: &str = "DropboxMirror";
const DEFAULT_LOG_NAME: &str = "sync_dropbox.log";
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

const KNOWN_KEYS: &[&str] = &[
    "DROPBOX_URL",
    "DOWNLOAD_PATH",
    "TARGET_DIR",
    "KEEP_VERSIONS",
    "DRY_RUN",
    "LOG_PATH",
    "FETCH_TIMEOUT_SECS",
];

/// Validated settings for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Public share link of the archive
    pub remote_url: String,

    /// Where the downloaded archive is written
    pub download_path: PathBuf,

    /// Mirror root
    pub target_dir: PathBuf,

    /// Archive replaced files under `.old_versions/`
    pub keep_versions: bool,

    /// Report decisions without mutating the target
    pub dry_run: bool,

    /// Append-only run log
    pub log_path: PathBuf,

    /// Per-read timeout for the download
    pub fetch_timeout: Duration,

    /// Keys owned by external setup tooling, carried through untouched
    pub passthrough: BTreeMap<String, String>,
}

/// Raw view of the settings file; empty strings mean "not set".
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawSettings {
    #[serde(rename = "DROPBOX_URL")]
    dropbox_url: String,
    #[serde(rename = "DOWNLOAD_PATH")]
    download_path: String,
    #[serde(rename = "TARGET_DIR")]
    target_dir: String,
    #[serde(rename = "KEEP_VERSIONS")]
    keep_versions: String,
    #[serde(rename = "DRY_RUN")]
    dry_run: String,
    #[serde(rename = "LOG_PATH")]
    log_path: String,
    #[serde(rename = "FETCH_TIMEOUT_SECS")]
    fetch_timeout_secs: String,
}

impl Settings {
    /// Settings with every optional key at its default, relative to `base_dir`
    pub fn with_defaults(remote_url: impl Into<String>, base_dir: &Path) -> Self {
        Self {
            remote_url: remote_url.into(),
            download_path: base_dir.join(DEFAULT_DOWNLOAD_NAME),
            target_dir: base_dir.join(DEFAULT_TARGET_NAME),
            keep_versions: true,
            dry_run: false,
            log_path: base_dir.join(DEFAULT_LOG_NAME),
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            passthrough: BTreeMap::new(),
        }
    }

    /// Locate, read and validate the settings file, then apply CLI overrides
    pub fn load(cli: &Cli) -> Result<Self, MirrorError> {
        let path = locate_config_file(cli.config.as_deref())?;
        let pairs = read_env_file(&path)?;
        let base_dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        let mut settings = Self::from_pairs(pairs, &base_dir)?;
        if cli.dry_run {
            settings.dry_run = true;
        }
        Ok(settings)
    }

    /// Build settings from parsed `KEY=VALUE` pairs
    ///
    /// Relative paths are resolved against `base_dir` (the settings file's
    /// directory) so unattended triggers do not depend on the working directory.
    pub fn from_pairs(pairs: BTreeMap<String, String>, base_dir: &Path) -> Result<Self, MirrorError> {
        let passthrough: BTreeMap<String, String> = pairs
            .iter()
            .filter(|(key, _)| !KNOWN_KEYS.contains(&key.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let raw = RawSettings::deserialize(MapDeserializer::<_, serde::de::value::Error>::new(
            pairs.into_iter(),
        ))
        .map_err(|e| MirrorError::Config(format!("Malformed settings: {}", e)))?;

        if raw.dropbox_url.is_empty() {
            return Err(MirrorError::Config(
                "DROPBOX_URL is required (e.g. https://www.dropbox.com/s/XXXXX/folder.zip?dl=1)"
                    .to_string(),
            ));
        }
        validate_remote_url(&raw.dropbox_url)?;

        let mut settings = Self::with_defaults(raw.dropbox_url, base_dir);
        if !raw.download_path.is_empty() {
            settings.download_path = resolve_path(&raw.download_path, base_dir);
        }
        if !raw.target_dir.is_empty() {
            settings.target_dir = resolve_path(&raw.target_dir, base_dir);
        }
        if !raw.log_path.is_empty() {
            settings.log_path = resolve_path(&raw.log_path, base_dir);
        }
        if !raw.keep_versions.is_empty() {
            settings.keep_versions = parse_flag("KEEP_VERSIONS", &raw.keep_versions)?;
        }
        if !raw.dry_run.is_empty() {
            settings.dry_run = parse_flag("DRY_RUN", &raw.dry_run)?;
        }
        if !raw.fetch_timeout_secs.is_empty() {
            settings.fetch_timeout = parse_timeout(&raw.fetch_timeout_secs)?;
        }
        settings.passthrough = passthrough;

        settings.validate()?;
        Ok(settings)
    }

    /// Cross-field checks
    pub fn validate(&self) -> Result<(), MirrorError> {
        if self.download_path.starts_with(&self.target_dir) {
            return Err(MirrorError::Config(format!(
                "DOWNLOAD_PATH {:?} must not live inside TARGET_DIR {:?}",
                self.download_path, self.target_dir
            )));
        }
        if self.log_path.starts_with(&self.target_dir) {
            return Err(MirrorError::Config(format!(
                "LOG_PATH {:?} must not live inside TARGET_DIR {:?}",
                self.log_path, self.target_dir
            )));
        }
        Ok(())
    }
}

/// Find the settings file: explicit path, working directory, then home
pub fn locate_config_file(explicit: Option<&Path>) -> Result<PathBuf, MirrorError> {
    if let Some(path) = explicit {
        if path.is_file() {
            return Ok(path.to_path_buf());
        }
        return Err(MirrorError::Config(format!(
            "Config file not found: {}",
            path.display()
        )));
    }

    let mut searched = Vec::new();
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.is_file() {
        return Ok(local);
    }
    searched.push(local);

    if let Some(home) = dirs::home_dir() {
        let candidate = home.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            return Ok(candidate);
        }
        searched.push(candidate);
    }

    let listed = searched
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ");
    Err(MirrorError::Config(format!(
        "No config file found (looked in: {}). Create one with at least DROPBOX_URL=...",
        listed
    )))
}

/// Parse yes/no style flags
pub fn parse_flag(key: &str, value: &str) -> Result<bool, MirrorError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "yes" | "y" | "true" | "1" | "on" => Ok(true),
        "no" | "n" | "false" | "0" | "off" => Ok(false),
        other => Err(MirrorError::Config(format!(
            "{} must be yes or no, got '{}'",
            key, other
        ))),
    }
}

fn parse_timeout(value: &str) -> Result<Duration, MirrorError> {
    match value.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(MirrorError::Config(format!(
            "FETCH_TIMEOUT_SECS must be a positive number of seconds, got '{}'",
            value
        ))),
    }
}

/// Require an absolute http(s) link; Dropbox links must ask for the raw file.
pub fn validate_remote_url(url: &str) -> Result<(), MirrorError> {
    let parsed = reqwest::Url::parse(url)
        .map_err(|e| MirrorError::Config(format!("DROPBOX_URL '{}' is not a valid URL: {}", url, e)))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(MirrorError::Config(format!(
            "DROPBOX_URL must use http or https, got '{}'",
            parsed.scheme()
        )));
    }

    let is_dropbox = parsed
        .host_str()
        .is_some_and(|host| host == "dropbox.com" || host.ends_with(".dropbox.com"));
    if is_dropbox {
        let direct = parsed
            .query_pairs()
            .any(|(key, value)| key == "dl" && value == "1");
        if !direct {
            return Err(MirrorError::Config(
                "DROPBOX_URL must request a direct download: end the link with ?dl=1 (not ?dl=0)"
                    .to_string(),
            ));
        }
    }

    Ok(())
}

/// Expand a leading `~` and anchor relative paths at `base_dir`
pub fn resolve_path(raw: &str, base_dir: &Path) -> PathBuf {
    let expanded = if raw == "~" {
        dirs::home_dir().unwrap_or_else(|| PathBuf::from(raw))
    } else if let Some(rest) = raw.strip_prefix("~/") {
        match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => PathBuf::from(raw),
        }
    } else {
        PathBuf::from(raw)
    };

    if expanded.is_absolute() {
        expanded
    } else {
        base_dir.join(expanded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const URL: &str = "https://www.dropbox.com/s/abc/folder.zip?dl=1";

    fn pairs(items: &[(&str, &str)]) -> BTreeMap<String, String> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_relative_to_base_dir() {
        let base = Path::new("/srv/mirror");
        let settings = Settings::from_pairs(pairs(&[("DROPBOX_URL", URL)]), base).expect("settings");

        assert_eq!(settings.remote_url, URL);
        assert_eq!(settings.download_path, base.join("dropbox_latest.zip"));
        assert_eq!(settings.target_dir, base.join("DropboxMirror"));
        assert_eq!(settings.log_path, base.join("sync_dropbox.log"));
        assert!(settings.keep_versions);
        assert!(!settings.dry_run);
        assert_eq!(settings.fetch_timeout, Duration::from_secs(30));
        assert!(settings.passthrough.is_empty());
    }

    #[test]
    fn test_missing_url_is_config_error() {
        let err = Settings::from_pairs(pairs(&[("TARGET_DIR", "/x")]), Path::new("/")).unwrap_err();
        assert!(matches!(err, MirrorError::Config(msg) if msg.contains("DROPBOX_URL")));
    }

    #[test]
    fn test_all_keys_parsed() {
        let settings = Settings::from_pairs(
            pairs(&[
                ("DROPBOX_URL", URL),
                ("DOWNLOAD_PATH", "/tmp/dl/latest.zip"),
                ("TARGET_DIR", "mirror"),
                ("KEEP_VERSIONS", "no"),
                ("DRY_RUN", "Yes"),
                ("LOG_PATH", "/var/log/mirror.log"),
                ("FETCH_TIMEOUT_SECS", "5"),
                ("VENV_DIR", "/opt/venv"),
            ]),
            Path::new("/base"),
        )
        .expect("settings");

        assert_eq!(settings.download_path, PathBuf::from("/tmp/dl/latest.zip"));
        assert_eq!(settings.target_dir, PathBuf::from("/base/mirror"));
        assert!(!settings.keep_versions);
        assert!(settings.dry_run);
        assert_eq!(settings.log_path, PathBuf::from("/var/log/mirror.log"));
        assert_eq!(settings.fetch_timeout, Duration::from_secs(5));
        assert_eq!(
            settings.passthrough.get("VENV_DIR").map(String::as_str),
            Some("/opt/venv")
        );
    }

    #[test]
    fn test_parse_flag_variants() {
        for yes in ["yes", "Y", "true", "1", "ON"] {
            assert!(parse_flag("DRY_RUN", yes).unwrap());
        }
        for no in ["no", "N", "false", "0", "off"] {
            assert!(!parse_flag("DRY_RUN", no).unwrap());
        }
        assert!(parse_flag("DRY_RUN", "maybe").is_err());
    }

    #[test]
    fn test_invalid_timeout_rejected() {
        let err = Settings::from_pairs(
            pairs(&[("DROPBOX_URL", URL), ("FETCH_TIMEOUT_SECS", "0")]),
            Path::new("/"),
        )
        .unwrap_err();
        assert!(matches!(err, MirrorError::Config(_)));
    }

    #[test]
    fn test_validate_remote_url() {
        assert!(validate_remote_url(URL).is_ok());
        assert!(validate_remote_url("http://127.0.0.1:8080/archive.zip").is_ok());
        assert!(validate_remote_url("https://www.dropbox.com/s/abc/folder.zip?dl=0").is_err());
        assert!(validate_remote_url("https://www.dropbox.com/s/abc/folder.zip").is_err());
        assert!(validate_remote_url("ftp://example.com/a.zip").is_err());
        assert!(validate_remote_url("not a url").is_err());
    }

    #[test]
    fn test_download_inside_target_rejected() {
        let err = Settings::from_pairs(
            pairs(&[
                ("DROPBOX_URL", URL),
                ("TARGET_DIR", "/m"),
                ("DOWNLOAD_PATH", "/m/latest.zip"),
            ]),
            Path::new("/"),
        )
        .unwrap_err();
        assert!(matches!(err, MirrorError::Config(_)));
    }

    #[test]
    fn test_resolve_path_tilde_and_relative() {
        let base = Path::new("/base");
        assert_eq!(resolve_path("/abs/x", base), PathBuf::from("/abs/x"));
        assert_eq!(resolve_path("rel/x", base), PathBuf::from("/base/rel/x"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(resolve_path("~/m", base), home.join("m"));
        }
    }

    #[test]
    fn test_load_applies_cli_dry_run_override() {
        let dir = TempDir::new().expect("create tempdir");
        let config_path = dir.path().join("mirror.env");
        fs::write(&config_path, format!("DROPBOX_URL={}\nDRY_RUN=no\n", URL)).expect("write config");

        let cli = Cli {
            dry_run: true,
            config: Some(config_path),
            verbose: false,
        };
        let settings = Settings::load(&cli).expect("load settings");

        assert!(settings.dry_run);
        assert_eq!(settings.target_dir, dir.path().join("DropboxMirror"));
    }

    #[test]
    fn test_load_missing_explicit_file() {
        let cli = Cli {
            config: Some(PathBuf::from("/nonexistent/mirror.env")),
            ..Cli::default()
        };
        assert!(matches!(Settings::load(&cli), Err(MirrorError::Config(_))));
    }
}
