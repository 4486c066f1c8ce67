use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::metrics::channel::Campaign;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  /// Spreadsheets in the order they are fetched
  pub sources: Vec<SourceConfig>,
  #[serde(default)]
  pub server: ServerConfig,
  #[serde(default)]
  pub fetch: FetchConfig,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub refresh: RefreshConfig,
  #[serde(default)]
  pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
  pub id: String,
  /// Display name (defaults to the id)
  pub name: Option<String>,
  pub spreadsheet_id: String,
  pub sheets: Vec<SheetConfig>,
}

impl SourceConfig {
  pub fn display_name(&self) -> &str {
    self.name.as_deref().unwrap_or(&self.id)
  }

  /// Find a sheet by its exact name.
  pub fn sheet(&self, name: &str) -> Option<&SheetConfig> {
    self.sheets.iter().find(|s| s.name == name)
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SheetConfig {
  pub name: String,
  #[serde(default)]
  pub gid: Option<String>,
  /// Overrides the campaign inferred from the sheet name
  #[serde(default)]
  pub campaign: Option<Campaign>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  #[serde(default = "default_bind")]
  pub bind: SocketAddr,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      bind: default_bind(),
    }
  }
}

fn default_bind() -> SocketAddr {
  SocketAddr::from(([127, 0, 0, 1], 3000))
}

#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
  /// Column range read from every sheet, e.g. "A:Z"
  #[serde(default = "default_column_span")]
  pub column_span: String,
  /// Delay between two consecutive remote calls of one batch
  #[serde(default = "default_pacing_ms")]
  pub pacing_ms: u64,
}

impl FetchConfig {
  pub fn pacing(&self) -> Duration {
    Duration::from_millis(self.pacing_ms)
  }
}

impl Default for FetchConfig {
  fn default() -> Self {
    Self {
      column_span: default_column_span(),
      pacing_ms: default_pacing_ms(),
    }
  }
}

fn default_column_span() -> String {
  "A:Z".to_string()
}

fn default_pacing_ms() -> u64 {
  300
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  #[serde(default = "default_true")]
  pub enabled: bool,
  #[serde(default = "default_ttl_secs")]
  pub ttl_secs: u64,
}

impl CacheConfig {
  pub fn ttl(&self) -> chrono::Duration {
    chrono::Duration::seconds(self.ttl_secs as i64)
  }
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      ttl_secs: default_ttl_secs(),
    }
  }
}

fn default_true() -> bool {
  true
}

fn default_ttl_secs() -> u64 {
  60
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RefreshConfig {
  /// Background refresh period; disabled when unset
  pub interval_secs: Option<u64>,
  /// Sources to refresh (all configured sources when empty)
  #[serde(default)]
  pub sources: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogConfig {
  /// Write daily-rotated log files here instead of stderr
  pub directory: Option<PathBuf>,
}

/// Environment variables holding the service account JSON, in lookup order.
pub const CREDENTIAL_VARS: [&str; 2] = ["FUNNELBOARD_SERVICE_ACCOUNT", "GOOGLE_SERVICE_ACCOUNT"];

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./funnelboard.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/funnelboard/config.yaml
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Err(eyre!(
        "No configuration file found. Create one at ~/.config/funnelboard/config.yaml\n\
                 See funnelboard.example.yaml for the format."
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("funnelboard.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("funnelboard").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::from_yaml(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  pub fn from_yaml(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents)?;
    config.validate()?;
    Ok(config)
  }

  fn validate(&self) -> Result<()> {
    if self.sources.is_empty() {
      return Err(eyre!("At least one source must be configured"));
    }
    for (i, source) in self.sources.iter().enumerate() {
      if self.sources[..i].iter().any(|s| s.id == source.id) {
        return Err(eyre!("Duplicate source id: {}", source.id));
      }
      if source.sheets.is_empty() {
        return Err(eyre!("Source {} has no sheets", source.id));
      }
    }
    if self.refresh.interval_secs == Some(0) {
      return Err(eyre!("refresh.interval_secs must be greater than zero"));
    }
    for id in &self.refresh.sources {
      if self.source(id).is_none() {
        return Err(eyre!("Refresh source {} is not configured", id));
      }
    }
    Ok(())
  }

  /// Find a configured source by id.
  pub fn source(&self, id: &str) -> Option<&SourceConfig> {
    self.sources.iter().find(|s| s.id == id)
  }

  /// Source ids refreshed in the background.
  pub fn refresh_sources(&self) -> Vec<String> {
    if self.refresh.sources.is_empty() {
      self.sources.iter().map(|s| s.id.clone()).collect()
    } else {
      self.refresh.sources.clone()
    }
  }

  /// Get the service account JSON from environment variables.
  ///
  /// Checks FUNNELBOARD_SERVICE_ACCOUNT first, then GOOGLE_SERVICE_ACCOUNT.
  pub fn get_service_account() -> Option<String> {
    CREDENTIAL_VARS
      .iter()
      .find_map(|var| std::env::var(var).ok())
      .filter(|json| !json.trim().is_empty())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const SAMPLE: &str = r#"
sources:
  - id: test-sheet-1
    name: TEST SHEET 1
    spreadsheet_id: abc
    sheets:
      - name: DRIP
        gid: "0"
      - name: 1-1 email outreacxh
        campaign: one_to_one_email
  - id: test-sheet-2
    spreadsheet_id: def
    sheets:
      - name: Linkeidn Outreach
      - name: Calling
fetch:
  pacing_ms: 500
"#;

  #[test]
  fn test_defaults_applied() {
    let config = Config::from_yaml(SAMPLE).unwrap();
    assert_eq!(config.server.bind.port(), 3000);
    assert_eq!(config.fetch.column_span, "A:Z");
    assert_eq!(config.fetch.pacing(), Duration::from_millis(500));
    assert!(config.cache.enabled);
    assert_eq!(config.cache.ttl(), chrono::Duration::seconds(60));
    assert!(config.refresh.interval_secs.is_none());
  }

  #[test]
  fn test_source_lookup_keeps_declared_order() {
    let config = Config::from_yaml(SAMPLE).unwrap();
    let source = config.source("test-sheet-1").unwrap();
    assert_eq!(source.display_name(), "TEST SHEET 1");
    let names: Vec<_> = source.sheets.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["DRIP", "1-1 email outreacxh"]);
    assert_eq!(
      source.sheet("1-1 email outreacxh").unwrap().campaign,
      Some(Campaign::OneToOneEmail)
    );
    assert_eq!(config.source("test-sheet-2").unwrap().display_name(), "test-sheet-2");
    assert!(config.source("missing").is_none());
  }

  #[test]
  fn test_refresh_sources_default_to_all() {
    let config = Config::from_yaml(SAMPLE).unwrap();
    assert_eq!(config.refresh_sources(), vec!["test-sheet-1", "test-sheet-2"]);
  }

  #[test]
  fn test_duplicate_source_rejected() {
    let yaml = r#"
sources:
  - id: a
    spreadsheet_id: x
    sheets: [{ name: One }]
  - id: a
    spreadsheet_id: y
    sheets: [{ name: Two }]
"#;
    assert!(Config::from_yaml(yaml).is_err());
  }

  #[test]
  fn test_unknown_refresh_source_rejected() {
    let yaml = r#"
sources:
  - id: a
    spreadsheet_id: x
    sheets: [{ name: One }]
refresh:
  interval_secs: 30
  sources: [b]
"#;
    assert!(Config::from_yaml(yaml).is_err());
  }

  #[test]
  fn test_example_config_parses() {
    let config = Config::from_yaml(include_str!("../funnelboard.example.yaml")).unwrap();
    assert_eq!(config.sources.len(), 2);
    assert_eq!(config.refresh.interval_secs, Some(300));
    assert!(config.log.directory.is_none());
  }

  #[test]
  fn test_zero_refresh_interval_rejected() {
    let yaml = r#"
sources:
  - id: a
    spreadsheet_id: x
    sheets: [{ name: One }]
refresh:
  interval_secs: 0
"#;
    let err = Config::from_yaml(yaml).unwrap_err();
    assert!(err.to_string().contains("interval_secs"));
  }
}
