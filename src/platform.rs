//! Hosting-platform capability providers
//!
//! Each supported platform stores access logs under different conventions.
//! The [`Platform`] trait narrows that difference to two operations, domain
//! enumeration and log-source listing, selected once at startup and injected
//! into the collector. Hot aggregation code never branches on the platform
//! kind.
//!
//! Platform detection itself is an external probe; its JSON output can be
//! passed in via a file, with filesystem markers as a fallback.

use crate::error::{AnalyzerError, Result};
use crate::parser::PlatformHint;
use crate::source::LogSource;
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tracing::warn;

/// The fixed set of recognized hosting platforms
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformKind {
    Plesk,
    GridPane,
    Ubuntu,
}

impl FromStr for PlatformKind {
    type Err = AnalyzerError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "plesk" => Ok(PlatformKind::Plesk),
            "gridpane" => Ok(PlatformKind::GridPane),
            // the detect probe reports flavors like "ubuntu-custom"
            other if other.starts_with("ubuntu") => Ok(PlatformKind::Ubuntu),
            other => Err(AnalyzerError::ConfigError(format!(
                "unknown platform '{other}', expected plesk, gridpane or ubuntu"
            ))),
        }
    }
}

impl fmt::Display for PlatformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlatformKind::Plesk => write!(f, "plesk"),
            PlatformKind::GridPane => write!(f, "gridpane"),
            PlatformKind::Ubuntu => write!(f, "ubuntu"),
        }
    }
}

/// Capability interface consumed by the collection driver
///
/// Failures while scanning are logged and yield empty results; discovery
/// problems must never panic or abort a collection pass.
pub trait Platform: Send + Sync {
    fn kind(&self) -> PlatformKind;

    /// Which line family the parser should try first for this platform
    fn parser_hint(&self) -> PlatformHint {
        match self.kind() {
            PlatformKind::GridPane => PlatformHint::GridPane,
            PlatformKind::Plesk | PlatformKind::Ubuntu => PlatformHint::Generic,
        }
    }

    /// Ordered set of domains that may have logs
    fn enumerate_domains(&self) -> Vec<String>;

    /// Ordered log sources for one domain
    fn list_log_sources(&self, domain: &str) -> Vec<LogSource>;
}

/// JSON emitted by the external platform-detect probe
#[derive(Debug, Clone, Deserialize)]
pub struct PlatformProbe {
    pub platform: String,
    #[serde(default)]
    pub log_path: Option<PathBuf>,
    #[serde(default)]
    pub site_path: Option<PathBuf>,
}

impl PlatformProbe {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            AnalyzerError::ProbeError(format!("failed to read {}: {e}", path.display()))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            AnalyzerError::ProbeError(format!("failed to parse {}: {e}", path.display()))
        })
    }
}

/// Resolve the platform provider from an explicit kind, a probe file, or
/// filesystem markers, in that order
pub fn resolve(
    explicit: Option<PlatformKind>,
    probe_file: Option<&Path>,
    log_path: Option<PathBuf>,
    site_path: Option<PathBuf>,
) -> Result<Arc<dyn Platform>> {
    let (kind, probe_log, probe_site) = match (explicit, probe_file) {
        (Some(kind), _) => (kind, None, None),
        (None, Some(path)) => {
            let probe = PlatformProbe::from_file(path)?;
            let kind = probe.platform.parse::<PlatformKind>().map_err(|e| {
                AnalyzerError::ProbeError(format!("probe {}: {e}", path.display()))
            })?;
            (kind, probe.log_path, probe.site_path)
        }
        (None, None) => (detect_kind(), None, None),
    };
    Ok(build(kind, log_path.or(probe_log), site_path.or(probe_site)))
}

/// Construct the provider for `kind` with optional path overrides
pub fn build(
    kind: PlatformKind,
    log_path: Option<PathBuf>,
    site_path: Option<PathBuf>,
) -> Arc<dyn Platform> {
    match kind {
        PlatformKind::Plesk => Arc::new(PleskPlatform::new(
            site_path.unwrap_or_else(|| PathBuf::from("/var/www/vhosts")),
        )),
        PlatformKind::GridPane => Arc::new(GridPanePlatform::new(
            log_path.unwrap_or_else(|| PathBuf::from("/var/log/nginx")),
        )),
        PlatformKind::Ubuntu => Arc::new(UbuntuPlatform::new(
            log_path.unwrap_or_else(|| PathBuf::from("/var/log/nginx")),
        )),
    }
}

/// Filesystem-marker fallback when no probe output is supplied
pub fn detect_kind() -> PlatformKind {
    if Path::new("/usr/local/psa/version").exists() {
        PlatformKind::Plesk
    } else if Path::new("/opt/gridpane").exists() {
        PlatformKind::GridPane
    } else {
        PlatformKind::Ubuntu
    }
}

/// Directory entries sorted by file name, empty on scan failure
fn sorted_entries(dir: &Path) -> Vec<fs::DirEntry> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("failed to scan {}: {e}", dir.display());
            return Vec::new();
        }
    };
    let mut entries: Vec<fs::DirEntry> = entries.filter_map(|e| e.ok()).collect();
    entries.sort_by_key(fs::DirEntry::file_name);
    entries
}

fn is_non_empty_file(path: &Path) -> bool {
    fs::metadata(path).map(|m| m.is_file() && m.len() > 0).unwrap_or(false)
}

/// Plesk: `/var/www/vhosts/DOMAIN/logs/` plus per-subdomain log directories
pub struct PleskPlatform {
    vhosts_path: PathBuf,
}

/// Current-log names Plesk writes per (sub)domain, in preference order
const PLESK_LOG_NAMES: &[&str] = &[
    "access_ssl_log",
    "proxy_access_ssl_log",
    "access_log",
    "proxy_access_log",
];

impl PleskPlatform {
    pub fn new(vhosts_path: impl Into<PathBuf>) -> Self {
        PleskPlatform {
            vhosts_path: vhosts_path.into(),
        }
    }

    fn is_domain_dir(name: &str) -> bool {
        !name.starts_with('.') && name != "system"
    }

    fn sources_in(dir: &Path) -> Vec<LogSource> {
        PLESK_LOG_NAMES
            .iter()
            .map(|name| dir.join(name))
            .filter(|path| is_non_empty_file(path))
            .map(LogSource::new)
            .collect()
    }
}

impl Platform for PleskPlatform {
    fn kind(&self) -> PlatformKind {
        PlatformKind::Plesk
    }

    fn enumerate_domains(&self) -> Vec<String> {
        let mut domains = Vec::new();
        for entry in sorted_entries(&self.vhosts_path) {
            let name = entry.file_name().to_string_lossy().into_owned();
            if !entry.path().is_dir() || !Self::is_domain_dir(&name) {
                continue;
            }
            domains.push(name);
            // subdomains keep their logs in subdirectories of logs/
            for sub in sorted_entries(&entry.path().join("logs")) {
                if sub.path().is_dir() {
                    domains.push(sub.file_name().to_string_lossy().into_owned());
                }
            }
        }
        domains.sort();
        domains.dedup();
        domains
    }

    fn list_log_sources(&self, domain: &str) -> Vec<LogSource> {
        let mut sources = Self::sources_in(&self.vhosts_path.join(domain).join("logs"));
        // a subdomain's logs live under its parent vhost
        for entry in sorted_entries(&self.vhosts_path) {
            let name = entry.file_name().to_string_lossy().into_owned();
            if !Self::is_domain_dir(&name) || name == domain {
                continue;
            }
            let sub_dir = entry.path().join("logs").join(domain);
            if sub_dir.is_dir() {
                sources.extend(Self::sources_in(&sub_dir));
            }
        }
        sources
    }
}

/// GridPane: `/var/log/nginx/DOMAIN.access.log`, current logs only
pub struct GridPanePlatform {
    log_path: PathBuf,
}

impl GridPanePlatform {
    pub fn new(log_path: impl Into<PathBuf>) -> Self {
        GridPanePlatform {
            log_path: log_path.into(),
        }
    }

    fn domain_from_filename(name: &str) -> Option<String> {
        let domain = name.strip_suffix(".access.log")?;
        // skip the server-level log and GridPane's internal hosts
        if domain.is_empty() || name == "access.log" || name.contains("gridpanevps.com") {
            return None;
        }
        Some(domain.to_string())
    }
}

impl Platform for GridPanePlatform {
    fn kind(&self) -> PlatformKind {
        PlatformKind::GridPane
    }

    fn enumerate_domains(&self) -> Vec<String> {
        let mut domains: Vec<String> = sorted_entries(&self.log_path)
            .iter()
            .filter(|entry| entry.path().is_file())
            .filter_map(|entry| {
                Self::domain_from_filename(&entry.file_name().to_string_lossy())
            })
            .collect();
        domains.sort();
        domains.dedup();
        domains
    }

    fn list_log_sources(&self, domain: &str) -> Vec<LogSource> {
        let path = self.log_path.join(format!("{domain}.access.log"));
        if is_non_empty_file(&path) {
            vec![LogSource::new(path)]
        } else {
            Vec::new()
        }
    }
}

/// Generic Ubuntu: any `*access*.log*` under the log directory, rotated
/// and gzipped files included
pub struct UbuntuPlatform {
    log_path: PathBuf,
}

impl UbuntuPlatform {
    pub fn new(log_path: impl Into<PathBuf>) -> Self {
        UbuntuPlatform {
            log_path: log_path.into(),
        }
    }

    /// Derive the domain from a log file name
    ///
    /// Handles `example.com-access.log`, `example.com.access.log` and
    /// `example.com_access.log`, with optional `.N` and `.gz` rotation
    /// suffixes. The bare server log (`access.log`) has no domain.
    fn domain_from_filename(name: &str) -> Option<String> {
        if !name.contains("access") || !name.contains(".log") {
            return None;
        }
        let mut base = name.strip_suffix(".gz").unwrap_or(name);
        if let Some((head, tail)) = base.rsplit_once('.') {
            if !tail.is_empty() && tail.bytes().all(|b| b.is_ascii_digit()) {
                base = head;
            }
        }
        let domain = base
            .strip_suffix(".log")?
            .trim_end_matches("access")
            .trim_end_matches(['-', '.', '_']);
        if domain.is_empty() {
            None
        } else {
            Some(domain.to_string())
        }
    }
}

impl Platform for UbuntuPlatform {
    fn kind(&self) -> PlatformKind {
        PlatformKind::Ubuntu
    }

    fn enumerate_domains(&self) -> Vec<String> {
        let mut domains: Vec<String> = sorted_entries(&self.log_path)
            .iter()
            .filter(|entry| entry.path().is_file())
            .filter_map(|entry| {
                Self::domain_from_filename(&entry.file_name().to_string_lossy())
            })
            .collect();
        domains.sort();
        domains.dedup();
        domains
    }

    fn list_log_sources(&self, domain: &str) -> Vec<LogSource> {
        sorted_entries(&self.log_path)
            .iter()
            .filter(|entry| entry.path().is_file())
            .filter(|entry| {
                Self::domain_from_filename(&entry.file_name().to_string_lossy()).as_deref()
                    == Some(domain)
            })
            .map(|entry| LogSource::new(entry.path()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_str() {
        assert_eq!("plesk".parse::<PlatformKind>().unwrap(), PlatformKind::Plesk);
        assert_eq!("GridPane".parse::<PlatformKind>().unwrap(), PlatformKind::GridPane);
        assert_eq!("ubuntu".parse::<PlatformKind>().unwrap(), PlatformKind::Ubuntu);
        assert_eq!("ubuntu-custom".parse::<PlatformKind>().unwrap(), PlatformKind::Ubuntu);
        assert!("windows".parse::<PlatformKind>().is_err());
    }

    #[test]
    fn test_parser_hints() {
        assert_eq!(
            GridPanePlatform::new("/tmp").parser_hint(),
            PlatformHint::GridPane
        );
        assert_eq!(UbuntuPlatform::new("/tmp").parser_hint(), PlatformHint::Generic);
    }

    #[test]
    fn test_gridpane_domain_from_filename() {
        assert_eq!(
            GridPanePlatform::domain_from_filename("example.com.access.log"),
            Some("example.com".to_string())
        );
        assert_eq!(GridPanePlatform::domain_from_filename("access.log"), None);
        assert_eq!(
            GridPanePlatform::domain_from_filename("foo.gridpanevps.com.access.log"),
            None
        );
        // rotated logs are not current
        assert_eq!(
            GridPanePlatform::domain_from_filename("example.com.access.log.1"),
            None
        );
    }

    #[test]
    fn test_ubuntu_domain_from_filename() {
        assert_eq!(
            UbuntuPlatform::domain_from_filename("example.com-access.log"),
            Some("example.com".to_string())
        );
        assert_eq!(
            UbuntuPlatform::domain_from_filename("example.com.access.log"),
            Some("example.com".to_string())
        );
        assert_eq!(
            UbuntuPlatform::domain_from_filename("example.com-access.log.2.gz"),
            Some("example.com".to_string())
        );
        assert_eq!(UbuntuPlatform::domain_from_filename("access.log"), None);
        assert_eq!(UbuntuPlatform::domain_from_filename("error.log"), None);
    }

    #[test]
    fn test_gridpane_enumerate_and_list() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("beta.org.access.log"), "x\n").unwrap();
        std::fs::write(dir.path().join("alpha.com.access.log"), "x\n").unwrap();
        std::fs::write(dir.path().join("access.log"), "x\n").unwrap();
        std::fs::write(dir.path().join("x.gridpanevps.com.access.log"), "x\n").unwrap();

        let platform = GridPanePlatform::new(dir.path());
        assert_eq!(platform.enumerate_domains(), vec!["alpha.com", "beta.org"]);
        assert_eq!(platform.list_log_sources("alpha.com").len(), 1);
        assert_eq!(platform.list_log_sources("missing.net").len(), 0);
    }

    #[test]
    fn test_ubuntu_enumerate_groups_rotations() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("example.com-access.log"), "x\n").unwrap();
        std::fs::write(dir.path().join("example.com-access.log.1"), "x\n").unwrap();
        std::fs::write(dir.path().join("example.com-access.log.2.gz"), "x\n").unwrap();
        std::fs::write(dir.path().join("error.log"), "x\n").unwrap();

        let platform = UbuntuPlatform::new(dir.path());
        assert_eq!(platform.enumerate_domains(), vec!["example.com"]);
        assert_eq!(platform.list_log_sources("example.com").len(), 3);
    }

    #[test]
    fn test_plesk_enumerate_and_list() {
        let dir = tempfile::tempdir().unwrap();
        let logs = dir.path().join("example.com").join("logs");
        std::fs::create_dir_all(&logs).unwrap();
        std::fs::write(logs.join("access_ssl_log"), "x\n").unwrap();
        std::fs::write(logs.join("access_log"), "").unwrap(); // empty, skipped
        let sub = logs.join("shop.example.com");
        std::fs::create_dir_all(&sub).unwrap();
        std::fs::write(sub.join("access_ssl_log"), "x\n").unwrap();
        std::fs::create_dir_all(dir.path().join("system")).unwrap();

        let platform = PleskPlatform::new(dir.path());
        assert_eq!(
            platform.enumerate_domains(),
            vec!["example.com", "shop.example.com"]
        );
        assert_eq!(platform.list_log_sources("example.com").len(), 1);
        assert_eq!(platform.list_log_sources("shop.example.com").len(), 1);
    }

    #[test]
    fn test_missing_directory_yields_empty_not_error() {
        let platform = GridPanePlatform::new("/nonexistent/logs");
        assert!(platform.enumerate_domains().is_empty());
    }

    #[test]
    fn test_probe_parsing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("probe.json");
        std::fs::write(
            &path,
            r#"{"platform": "gridpane", "log_path": "/srv/logs"}"#,
        )
        .unwrap();
        let probe = PlatformProbe::from_file(&path).unwrap();
        assert_eq!(probe.platform, "gridpane");
        assert_eq!(probe.log_path.as_deref(), Some(Path::new("/srv/logs")));
        assert_eq!(probe.site_path, None);
    }

    #[test]
    fn test_probe_errors_are_typed() {
        assert!(matches!(
            PlatformProbe::from_file(Path::new("/nonexistent/probe.json")),
            Err(AnalyzerError::ProbeError(_))
        ));
    }

    #[test]
    fn test_resolve_prefers_explicit_kind() {
        let platform = resolve(Some(PlatformKind::GridPane), None, None, None).unwrap();
        assert_eq!(platform.kind(), PlatformKind::GridPane);
    }
}
