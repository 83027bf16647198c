//! Configuration loading and root folder resolution
//!
//! Resolution order for every bootstrap value:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. OS-dependent compiled default (fallback)
//!
//! A missing TOML file is never fatal: the service logs a warning and starts
//! with compiled defaults. A malformed TOML file is a configuration error.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Primary environment variable for the root folder
pub const ROOT_FOLDER_ENV: &str = "REEL_ROOT_FOLDER";
/// Alternative (shorter) environment variable for the root folder
pub const ROOT_ENV: &str = "REEL_ROOT";

/// Name of the folder holding finished artifacts, relative to the root folder
pub const OUTPUT_DIR_NAME: &str = "output";
/// Name of the folder holding per-job temporary workspaces
pub const WORK_DIR_NAME: &str = "work";

/// Compiled defaults used when neither CLI, ENV nor TOML provide a value
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
}

impl CompiledDefaults {
    /// Defaults for the platform this binary was compiled for
    pub fn for_current_platform() -> Self {
        Self {
            root_folder: default_root_folder(),
            log_level: "info".to_string(),
            log_file: None,
        }
    }
}

/// OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/reel (or /var/lib/reel for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("reel"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/reel"))
    } else if cfg!(target_os = "macos") {
        // ~/Library/Application Support/reel
        dirs::data_dir()
            .map(|d| d.join("reel"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/reel"))
    } else if cfg!(target_os = "windows") {
        // %LOCALAPPDATA%\reel
        dirs::data_local_dir()
            .map(|d| d.join("reel"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\reel"))
    } else {
        PathBuf::from("./reel_data")
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Resolves the root folder following CLI → ENV → TOML → default priority
#[derive(Debug, Clone)]
pub struct RootFolderResolver {
    module_name: String,
    cli_arg: Option<PathBuf>,
    toml_root: Option<PathBuf>,
}

impl RootFolderResolver {
    pub fn new(module_name: impl Into<String>) -> Self {
        Self {
            module_name: module_name.into(),
            cli_arg: None,
            toml_root: None,
        }
    }

    /// Root folder given on the command line (highest priority)
    pub fn with_cli_arg(mut self, path: Option<PathBuf>) -> Self {
        self.cli_arg = path;
        self
    }

    /// Root folder read from the module's TOML file
    pub fn with_toml_root(mut self, path: Option<PathBuf>) -> Self {
        self.toml_root = path;
        self
    }

    /// Resolve the root folder. Never fails; falls back to the compiled default.
    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = &self.cli_arg {
            info!(module = %self.module_name, "Root folder from command line: {}", path.display());
            return path.clone();
        }

        for var in [ROOT_FOLDER_ENV, ROOT_ENV] {
            if let Ok(value) = std::env::var(var) {
                if !value.trim().is_empty() {
                    info!(module = %self.module_name, "Root folder from {}: {}", var, value);
                    return PathBuf::from(value);
                }
            }
        }

        if let Some(path) = &self.toml_root {
            info!(module = %self.module_name, "Root folder from TOML config: {}", path.display());
            return path.clone();
        }

        let fallback = CompiledDefaults::for_current_platform().root_folder;
        info!(module = %self.module_name, "Root folder from compiled default: {}", fallback.display());
        fallback
    }
}

/// Creates the root folder layout on first start
#[derive(Debug, Clone)]
pub struct RootFolderInitializer {
    root_folder: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root_folder: PathBuf) -> Self {
        Self { root_folder }
    }

    /// Create root, output and work directories if missing
    pub fn ensure_directory_exists(&self) -> Result<()> {
        for dir in [self.root_folder.clone(), self.output_dir(), self.work_dir()] {
            if !dir.exists() {
                std::fs::create_dir_all(&dir)?;
                info!("Created directory: {}", dir.display());
            }
        }
        Ok(())
    }

    pub fn root_folder(&self) -> &Path {
        &self.root_folder
    }

    /// Folder holding finished artifacts
    pub fn output_dir(&self) -> PathBuf {
        self.root_folder.join(OUTPUT_DIR_NAME)
    }

    /// Folder holding per-job temporary workspaces
    pub fn work_dir(&self) -> PathBuf {
        self.root_folder.join(WORK_DIR_NAME)
    }
}

/// Default TOML config location for a module: `<config_dir>/reel/<module>.toml`
pub fn default_config_path(module_name: &str) -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("reel").join(format!("{}.toml", module_name)))
}

/// Load a TOML config file into `T`
///
/// Missing file → warning + `T::default()`. Unreadable or malformed file →
/// [`Error::Config`].
pub fn load_toml_config<T>(path: &Path) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    if !path.exists() {
        warn!(
            "Config file not found at {}; using compiled defaults",
            path.display()
        );
        return Ok(T::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed ({}): {}", path.display(), e)))?;

    let config = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed ({}): {}", path.display(), e)))?;

    info!("Loaded configuration from {}", path.display());
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, Deserialize)]
    struct Sample {
        #[serde(default)]
        port: u16,
        #[serde(default)]
        logging: LoggingConfig,
    }

    #[test]
    fn test_logging_defaults() {
        let logging = LoggingConfig::default();
        assert_eq!(logging.level, "info");
        assert!(logging.file.is_none());
    }

    #[test]
    fn test_missing_file_yields_default() {
        let sample: Sample =
            load_toml_config(Path::new("/nonexistent/reel/definitely-missing.toml")).unwrap();
        assert_eq!(sample.port, 0);
        assert_eq!(sample.logging.level, "info");
    }

    #[test]
    fn test_initializer_paths() {
        let init = RootFolderInitializer::new(PathBuf::from("/tmp/reel-root"));
        assert_eq!(init.output_dir(), PathBuf::from("/tmp/reel-root/output"));
        assert_eq!(init.work_dir(), PathBuf::from("/tmp/reel-root/work"));
    }

    #[test]
    fn test_cli_arg_wins() {
        let resolver = RootFolderResolver::new("test")
            .with_cli_arg(Some(PathBuf::from("/tmp/from-cli")))
            .with_toml_root(Some(PathBuf::from("/tmp/from-toml")));
        assert_eq!(resolver.resolve(), PathBuf::from("/tmp/from-cli"));
    }
}
