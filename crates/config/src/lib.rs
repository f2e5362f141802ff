//! Layered configuration.
//!
//! Values are merged in order, later sources winning:
//!
//! 1. built-in defaults,
//! 2. a TOML, YAML or JSON file (by extension; `amen.toml` in the platform
//!    config directory unless another file is named),
//! 3. `AMEN_`-prefixed environment variables, with `__` separating nested
//!    keys (`AMEN_USER__ID=abc` sets `user.id`).
//!
//! The result is validated before it is returned.

pub mod error;

use std::path::{Path, PathBuf};
use std::time::Duration;

use amen_progress::CachePolicy;
use amen_progress::models::{Credential, Provider};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, Result};

/// Prefix of environment variables read by [`Config::figment`].
pub const ENV_PREFIX: &str = "AMEN_";
/// Name of the configuration file looked up in the platform config directory.
pub const CONFIG_FILE: &str = "amen.toml";
const MAX_OFFSET_MINUTES: i32 = 24 * 60 - 1;

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "amen")
}

/// Where the configuration file is read from when none is named.
pub fn default_config_file() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE))
}

fn data_dir() -> PathBuf {
    project_dirs().map_or_else(|| PathBuf::from("."), |dirs| dirs.data_dir().to_path_buf())
}

fn cache_dir() -> PathBuf {
    project_dirs().map_or_else(|| PathBuf::from("."), |dirs| dirs.cache_dir().to_path_buf())
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub user: UserConfig,
    pub plan: PlanConfig,
    pub cache: CacheConfig,
}

/// Where progress is stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite database file.
    pub path: PathBuf,
}
impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: data_dir().join("amen.sqlite3"),
        }
    }
}

/// The user progress is recorded for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserConfig {
    pub id: String,
    pub display_name: String,
    pub provider: Provider,
}
impl UserConfig {
    pub fn credential(&self) -> Credential {
        Credential {
            user_id: self.id.clone(),
            display_name: self.display_name.clone(),
            provider: self.provider,
        }
    }
}
impl Default for UserConfig {
    fn default() -> Self {
        Self {
            id: "local".to_string(),
            display_name: "Reader".to_string(),
            provider: Provider::Kakao,
        }
    }
}

/// Which reading plan to follow, and where its reference data comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanConfig {
    pub id: String,
    /// Replaces the built-in chapter-to-video table.
    pub video_table: Option<PathBuf>,
    /// Additional plan file, registered alongside the built-in plan.
    pub plan_file: Option<PathBuf>,
    /// Offset from UTC, in minutes, that decides which day it is (`540` for
    /// Korea). The machine's local offset when unset.
    pub utc_offset_minutes: Option<i32>,
}
impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            id: "default".to_string(),
            video_table: None,
            plan_file: None,
            utc_offset_minutes: None,
        }
    }
}

/// Cache timing, in seconds, and where the cache is persisted between runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub stale_after_secs: u64,
    pub debounce_secs: u64,
    pub refresh_interval_secs: u64,
    pub snapshot: PathBuf,
}
impl CacheConfig {
    pub fn policy(&self) -> CachePolicy {
        CachePolicy {
            stale_after: Duration::from_secs(self.stale_after_secs),
            debounce: Duration::from_secs(self.debounce_secs),
            refresh_interval: Duration::from_secs(self.refresh_interval_secs),
        }
    }
}
impl Default for CacheConfig {
    fn default() -> Self {
        let policy = CachePolicy::default();
        Self {
            stale_after_secs: policy.stale_after.as_secs(),
            debounce_secs: policy.debounce.as_secs(),
            refresh_interval_secs: policy.refresh_interval.as_secs(),
            snapshot: cache_dir().join("cache.json"),
        }
    }
}

impl Config {
    /// The merged (but not yet extracted) configuration sources.
    ///
    /// `file` must exist if given; otherwise the default location is used
    /// when present.
    pub fn figment(file: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        let file = match file {
            Some(path) if !path.exists() => {
                exn::bail!(ErrorKind::FileNotFound(path.display().to_string()));
            },
            Some(path) => Some(path.to_path_buf()),
            None => default_config_file().filter(|path| path.exists()),
        };
        if let Some(path) = file {
            tracing::debug!(path = %path.display(), "Reading configuration file");
            figment = match path.extension().and_then(|ext| ext.to_str()) {
                Some("yaml" | "yml") => figment.merge(Yaml::file(path)),
                Some("json") => figment.merge(Json::file(path)),
                _ => figment.merge(Toml::file(path)),
            };
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    /// Load and validate the configuration.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let config: Self = Self::figment(file)?.extract().or_raise(|| ErrorKind::Parse)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if amen_store::validate_id(&self.user.id).is_err() {
            exn::bail!(ErrorKind::Invalid {
                field: "user.id",
                reason: "must be a single non-empty path segment",
            });
        }
        if self.user.display_name.trim().is_empty() {
            exn::bail!(ErrorKind::Invalid {
                field: "user.display_name",
                reason: "must not be empty",
            });
        }
        if amen_store::validate_id(&self.plan.id).is_err() {
            exn::bail!(ErrorKind::Invalid {
                field: "plan.id",
                reason: "must be a single non-empty path segment",
            });
        }
        if self
            .plan
            .utc_offset_minutes
            .is_some_and(|minutes| !(-MAX_OFFSET_MINUTES..=MAX_OFFSET_MINUTES).contains(&minutes))
        {
            exn::bail!(ErrorKind::Invalid {
                field: "plan.utc_offset_minutes",
                reason: "must be within a day of UTC",
            });
        }
        if self.cache.stale_after_secs == 0 {
            exn::bail!(ErrorKind::Invalid {
                field: "cache.stale_after_secs",
                reason: "must be greater than zero",
            });
        }
        if self.cache.refresh_interval_secs == 0 {
            exn::bail!(ErrorKind::Invalid {
                field: "cache.refresh_interval_secs",
                reason: "must be greater than zero",
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use rstest::rstest;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.cache.policy(), CachePolicy::default());
        assert_eq!(config.plan.id, "default");
    }

    #[test]
    fn test_file_then_environment() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "amen.toml",
                r#"
                [user]
                id = "file-user"
                display_name = "From File"
                provider = "apple"

                [cache]
                debounce_secs = 1
                "#,
            )?;
            jail.set_env("AMEN_USER__ID", "env-user");
            jail.set_env("AMEN_CACHE__STALE_AFTER_SECS", "60");

            let config = Config::load(Some(Path::new("amen.toml"))).unwrap();
            assert_eq!(config.user.id, "env-user");
            assert_eq!(config.user.display_name, "From File");
            assert_eq!(config.user.provider, Provider::Apple);
            assert_eq!(config.cache.policy().stale_after, Duration::from_secs(60));
            assert_eq!(config.cache.policy().debounce, Duration::from_secs(1));
            assert_eq!(config.cache.refresh_interval_secs, 60);
            assert_eq!(config.plan.utc_offset_minutes, None);
            Ok(())
        });
    }

    #[rstest]
    #[case("amen.yaml", "plan:\n  id: yearly\n  plan_file: plans/yearly.json\n")]
    #[case("amen.json", r#"{"plan": {"id": "yearly", "plan_file": "plans/yearly.json"}}"#)]
    fn test_file_formats(#[case] name: &str, #[case] contents: &str) {
        Jail::expect_with(|jail| {
            jail.create_file(name, contents)?;
            let config = Config::load(Some(Path::new(name))).unwrap();
            assert_eq!(config.plan.id, "yearly");
            assert_eq!(config.plan.plan_file, Some(PathBuf::from("plans/yearly.json")));
            assert_eq!(config.user, UserConfig::default());
            Ok(())
        });
    }

    #[test]
    fn test_utc_offset_from_environment() {
        Jail::expect_with(|jail| {
            jail.create_file("amen.toml", "[plan]\nutc_offset_minutes = -300\n")?;
            assert_eq!(Config::load(Some(Path::new("amen.toml"))).unwrap().plan.utc_offset_minutes, Some(-300));
            jail.set_env("AMEN_PLAN__UTC_OFFSET_MINUTES", "540");
            assert_eq!(Config::load(Some(Path::new("amen.toml"))).unwrap().plan.utc_offset_minutes, Some(540));
            Ok(())
        });
    }

    #[test]
    fn test_missing_named_file() {
        let err = Config::load(Some(Path::new("/nonexistent/amen.toml"))).unwrap_err();
        assert!(matches!(&*err, ErrorKind::FileNotFound(_)));
    }

    #[rstest]
    #[case("AMEN_USER__ID", "a/b", "user.id")]
    #[case("AMEN_PLAN__ID", "..", "plan.id")]
    #[case("AMEN_CACHE__REFRESH_INTERVAL_SECS", "0", "cache.refresh_interval_secs")]
    #[case("AMEN_PLAN__UTC_OFFSET_MINUTES", "1440", "plan.utc_offset_minutes")]
    fn test_invalid_values(#[case] var: &str, #[case] value: &str, #[case] expected: &str) {
        Jail::expect_with(|jail| {
            jail.create_file("amen.toml", "")?;
            jail.set_env(var, value);
            let err = Config::load(Some(Path::new("amen.toml"))).unwrap_err();
            assert!(matches!(&*err, ErrorKind::Invalid { field, .. } if *field == expected));
            Ok(())
        });
    }

    #[test]
    fn test_unparseable_value() {
        Jail::expect_with(|jail| {
            jail.create_file("amen.toml", "[cache]\ndebounce_secs = \"soon\"\n")?;
            let err = Config::load(Some(Path::new("amen.toml"))).unwrap_err();
            assert_eq!(*err, ErrorKind::Parse);
            Ok(())
        });
    }
}
