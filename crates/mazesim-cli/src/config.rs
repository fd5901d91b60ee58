//! Configuration vault – reads/writes `~/.mazesim/config.toml`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Persisted run configuration stored in `~/.mazesim/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Explorer steps per second; 0 runs as fast as possible.
    #[serde(default = "default_speed")]
    pub speed: u32,

    /// Percentage of the arena that ends a run (0–100).
    #[serde(default = "default_target_coverage")]
    pub target_coverage: u32,

    /// Exploration time budget in seconds.
    #[serde(default = "default_time_limit")]
    pub time_limit_secs: u32,

    /// Coverage sampling period in milliseconds.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Where the loaded arena layout is persisted.  Defaults to
    /// `arena.txt` next to this file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descriptor_path: Option<PathBuf>,

    /// Robot start cell, arena frame.
    #[serde(default = "default_start_col")]
    pub start_col: i32,
    #[serde(default = "default_start_row")]
    pub start_row: i32,
}

fn default_speed() -> u32 {
    10
}
fn default_target_coverage() -> u32 {
    100
}
fn default_time_limit() -> u32 {
    360
}
fn default_poll_interval() -> u64 {
    50
}
fn default_start_col() -> i32 {
    1
}
fn default_start_row() -> i32 {
    1
}

impl Default for Config {
    fn default() -> Self {
        Self {
            speed: default_speed(),
            target_coverage: default_target_coverage(),
            time_limit_secs: default_time_limit(),
            poll_interval_ms: default_poll_interval(),
            descriptor_path: None,
            start_col: default_start_col(),
            start_row: default_start_row(),
        }
    }
}

impl Config {
    /// The descriptor path to use, falling back to `default` when unset.
    pub fn descriptor_or(&self, default: PathBuf) -> PathBuf {
        self.descriptor_path.clone().unwrap_or(default)
    }
}

/// Return the path to `~/.mazesim/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(&home_dir())
}

/// Return the path to `~/.mazesim/arena.txt`.
pub fn default_descriptor_path() -> PathBuf {
    config_dir_for_home(&home_dir()).join("arena.txt")
}

fn home_dir() -> String {
    std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string())
}

fn config_dir_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".mazesim")
}

/// Build the config path relative to the given home directory.
pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    config_dir_for_home(home).join("config.toml")
}

/// Where the effective configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// Read from an existing file.
    File,
    /// No file existed; defaults were written to it.
    WroteDefaults,
    /// No file existed and writing the defaults failed.
    Unsaved(String),
}

/// Load `~/.mazesim/config.toml`, writing the defaults there on first run,
/// then apply `MAZESIM_*` environment overrides.
pub fn load_or_init() -> Result<(Config, Source), String> {
    load_or_init_at(&config_path(), |var| std::env::var(var).ok())
}

/// [`load_or_init`] against an explicit path and variable lookup.  The file
/// only ever receives the defaults, never the overrides.
pub(crate) fn load_or_init_at(
    path: &Path,
    env: impl Fn(&str) -> Option<String>,
) -> Result<(Config, Source), String> {
    let (mut cfg, source) = match load_from(path)? {
        Some(cfg) => (cfg, Source::File),
        None => {
            let cfg = Config::default();
            let source = match save_to(&cfg, path) {
                Ok(()) => Source::WroteDefaults,
                Err(e) => Source::Unsaved(e),
            };
            (cfg, source)
        }
    };
    apply_overrides(&mut cfg, env);
    Ok((cfg, source))
}

/// Load the config from a specific path, as written.
pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let cfg: Config =
        toml::from_str(&raw).map_err(|e| format!("Failed to parse config: {}", e))?;
    Ok(Some(cfg))
}

/// Apply `MAZESIM_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `MAZESIM_SPEED` | `speed` |
/// | `MAZESIM_TARGET_COVERAGE` | `target_coverage` |
/// | `MAZESIM_TIME_LIMIT` | `time_limit_secs` |
/// | `MAZESIM_DESCRIPTOR` | `descriptor_path` |
///
/// Unparseable numbers are ignored.
pub fn apply_env_overrides(cfg: &mut Config) {
    apply_overrides(cfg, |var| std::env::var(var).ok());
}

fn apply_overrides(cfg: &mut Config, env: impl Fn(&str) -> Option<String>) {
    let number = |var: &str| env(var)?.trim().parse::<u32>().ok();
    if let Some(v) = number("MAZESIM_SPEED") {
        cfg.speed = v;
    }
    if let Some(v) = number("MAZESIM_TARGET_COVERAGE") {
        cfg.target_coverage = v;
    }
    if let Some(v) = number("MAZESIM_TIME_LIMIT") {
        cfg.time_limit_secs = v;
    }
    if let Some(v) = env("MAZESIM_DESCRIPTOR")
        && !v.trim().is_empty()
    {
        cfg.descriptor_path = Some(PathBuf::from(v));
    }
}

/// Save the config to `path`, creating its directory if necessary, with
/// owner-only permissions on Unix.
pub(crate) fn save_to(cfg: &Config, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(parent, fs::Permissions::from_mode(0o700))
                .map_err(|e| format!("Failed to set config directory permissions: {}", e))?;
        }
    }
    let raw =
        toml::to_string_pretty(cfg).map_err(|e| format!("Failed to serialize config: {}", e))?;
    #[cfg(unix)]
    {
        use std::io::Write;
        use std::os::unix::fs::OpenOptionsExt;
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .and_then(|mut f| f.write_all(raw.as_bytes()))
            .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    }
    #[cfg(not(unix))]
    fs::write(path, raw)
        .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_default_config() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());

        save_to(&Config::default(), &path).expect("save");

        let loaded = load_from(&path).expect("load ok").expect("some");
        assert_eq!(loaded.speed, 10);
        assert_eq!(loaded.target_coverage, 100);
        assert_eq!(loaded.time_limit_secs, 360);
        assert_eq!((loaded.start_col, loaded.start_row), (1, 1));
        assert!(loaded.descriptor_path.is_none());
    }

    #[test]
    fn missing_fields_take_defaults() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "time_limit_secs = 90\n").unwrap();

        let loaded = load_from(&path).unwrap().unwrap();
        assert_eq!(loaded.time_limit_secs, 90);
        assert_eq!(loaded.poll_interval_ms, 50);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "speed = \"fast\"\n").unwrap();
        assert!(load_from(&path).unwrap_err().contains("parse"));
    }

    #[cfg(unix)]
    #[test]
    fn config_file_has_restrictive_permissions() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());

        save_to(&Config::default(), &path).expect("save");

        let file_mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(file_mode, 0o600);
        let dir_mode = fs::metadata(path.parent().unwrap())
            .unwrap()
            .permissions()
            .mode()
            & 0o777;
        assert_eq!(dir_mode, 0o700);
    }

    #[test]
    fn config_path_points_to_mazesim_dir() {
        let p = config_path_for_home("/home/testuser");
        assert_eq!(p, PathBuf::from("/home/testuser/.mazesim/config.toml"));
    }

    #[test]
    fn load_from_returns_none_when_missing() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        assert!(load_from(&path).expect("no error").is_none());
    }

    #[test]
    fn first_run_writes_defaults_and_still_applies_overrides() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        let env = |var: &str| match var {
            "MAZESIM_SPEED" => Some("3".to_string()),
            "MAZESIM_TIME_LIMIT" => Some("45".to_string()),
            _ => None,
        };

        let (cfg, source) = load_or_init_at(&path, env).expect("load");

        assert_eq!(source, Source::WroteDefaults);
        assert_eq!((cfg.speed, cfg.time_limit_secs), (3, 45));
        assert_eq!(cfg.target_coverage, 100);
        let on_disk = load_from(&path).unwrap().unwrap();
        assert_eq!(on_disk, Config::default());
    }

    #[test]
    fn existing_file_gets_overrides_too() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "speed = 7\ntarget_coverage = 80\n").unwrap();
        let env = |var: &str| (var == "MAZESIM_TARGET_COVERAGE").then(|| "60".to_string());

        let (cfg, source) = load_or_init_at(&path, env).expect("load");

        assert_eq!(source, Source::File);
        assert_eq!((cfg.speed, cfg.target_coverage), (7, 60));
    }

    #[test]
    fn unwritable_location_falls_back_to_defaults() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "x").unwrap();

        let (cfg, source) = load_or_init_at(&blocker.join("config.toml"), |_| None).expect("load");

        assert!(matches!(source, Source::Unsaved(_)));
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn descriptor_falls_back_to_default() {
        let mut cfg = Config::default();
        assert_eq!(cfg.descriptor_or("a.txt".into()), PathBuf::from("a.txt"));
        cfg.descriptor_path = Some("b.txt".into());
        assert_eq!(cfg.descriptor_or("a.txt".into()), PathBuf::from("b.txt"));
    }

    #[test]
    fn apply_env_overrides_changes_speed() {
        // SAFETY: no other test touches this variable.
        unsafe { std::env::set_var("MAZESIM_SPEED", "25") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.speed, 25);
        unsafe { std::env::remove_var("MAZESIM_SPEED") };
    }

    #[test]
    fn apply_env_overrides_changes_target_coverage() {
        // SAFETY: no other test touches this variable.
        unsafe { std::env::set_var("MAZESIM_TARGET_COVERAGE", "75") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.target_coverage, 75);
        unsafe { std::env::remove_var("MAZESIM_TARGET_COVERAGE") };
    }

    #[test]
    fn apply_env_overrides_ignores_invalid_time_limit() {
        // SAFETY: no other test touches this variable.
        unsafe { std::env::set_var("MAZESIM_TIME_LIMIT", "soon") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.time_limit_secs, 360);
        unsafe { std::env::remove_var("MAZESIM_TIME_LIMIT") };
    }

    #[test]
    fn apply_env_overrides_changes_descriptor() {
        // SAFETY: no other test touches this variable.
        unsafe { std::env::set_var("MAZESIM_DESCRIPTOR", "/tmp/maze.txt") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.descriptor_path, Some(PathBuf::from("/tmp/maze.txt")));
        unsafe { std::env::remove_var("MAZESIM_DESCRIPTOR") };
    }
}
