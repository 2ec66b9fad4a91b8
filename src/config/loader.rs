//! Config discovery and storage
//!
//! All state lives under `<root>/.pane-pm/`. Nothing is cached between
//! invocations: every command loads the files fresh.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use super::types::PmConfig;
use crate::core::PmResult;

/// Directory holding pane-pm state inside a project
pub const STATE_DIR: &str = ".pane-pm";
/// Environment variable overriding the project root
pub const ROOT_ENV: &str = "PANE_PM_ROOT";

const CONFIG_FILE: &str = "config.json";
const BOARD_FILE: &str = "board.json";
const LOG_DIR: &str = "logs";

/// Locates and reads/writes project configuration
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    root: PathBuf,
}

impl ConfigLoader {
    /// Use `root` as the project root
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Find the project root for this process
    ///
    /// Order: explicit flag, `$PANE_PM_ROOT`, nearest ancestor containing
    /// `.pane-pm/`, then the current directory.
    pub fn discover(explicit: Option<PathBuf>) -> PmResult<Self> {
        let env_root = std::env::var_os(ROOT_ENV).map(PathBuf::from);
        let cwd = std::env::current_dir()?;
        Ok(Self::discover_from(&cwd, explicit.or(env_root)))
    }

    /// Discovery starting at `start`, with an optional override
    pub fn discover_from(start: &Path, explicit: Option<PathBuf>) -> Self {
        if let Some(root) = explicit {
            return Self::new(root);
        }

        let found = start
            .ancestors()
            .find(|dir| dir.join(STATE_DIR).is_dir())
            .unwrap_or(start);
        tracing::debug!("Using project root {}", found.display());
        Self::new(found)
    }

    /// Project root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/.pane-pm`
    pub fn state_dir(&self) -> PathBuf {
        self.root.join(STATE_DIR)
    }

    pub fn config_path(&self) -> PathBuf {
        self.state_dir().join(CONFIG_FILE)
    }

    pub fn board_path(&self) -> PathBuf {
        self.state_dir().join(BOARD_FILE)
    }

    pub fn log_dir(&self) -> PathBuf {
        self.state_dir().join(LOG_DIR)
    }

    /// Whether `.pane-pm/` exists
    pub fn is_initialized(&self) -> bool {
        self.state_dir().is_dir()
    }

    /// Load the configuration (defaults when the file is missing)
    pub fn load(&self) -> PmResult<PmConfig> {
        let path = self.config_path();
        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(PmConfig::default());
        }

        let file = File::open(&path)?;
        let reader = BufReader::new(file);
        let config: PmConfig = serde_json::from_reader(reader)?;

        tracing::debug!(
            "Loaded config with {} agents from {}",
            config.agents.len(),
            path.display()
        );
        Ok(config)
    }

    /// Write the configuration
    pub fn save(&self, config: &PmConfig) -> PmResult<()> {
        fs::create_dir_all(self.state_dir())?;
        let path = self.config_path();

        let file = File::create(&path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, config)?;
        writeln!(writer)?;
        writer.flush()?;

        tracing::info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Create `.pane-pm/` with a default config
    ///
    /// Returns false when a config already exists; it is left untouched.
    pub fn init(&self) -> PmResult<bool> {
        if self.config_path().exists() {
            return Ok(false);
        }
        self.save(&PmConfig::default())?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::DenyRule;
    use tempfile::TempDir;

    fn create_test_loader() -> (ConfigLoader, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let loader = ConfigLoader::new(temp_dir.path());
        (loader, temp_dir)
    }

    #[test]
    fn test_missing_config_loads_default() {
        let (loader, _temp) = create_test_loader();

        assert!(!loader.is_initialized());
        assert_eq!(loader.load().unwrap(), PmConfig::default());
    }

    #[test]
    fn test_save_load_config() {
        let (loader, _temp) = create_test_loader();

        let mut config = PmConfig::new();
        config.agents.insert("codex", "10.1");
        config.add_deny("codex", DenyRule::parse("pm:task:update(*)"));
        loader.save(&config).unwrap();

        assert!(loader.is_initialized());
        let loaded = loader.load().unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_init_does_not_overwrite() {
        let (loader, _temp) = create_test_loader();

        assert!(loader.init().unwrap());

        let mut config = PmConfig::new();
        config.agents.insert("codex", "10.1");
        loader.save(&config).unwrap();

        assert!(!loader.init().unwrap());
        assert_eq!(loader.load().unwrap().registry().pane_of("codex"), Some("10.1"));
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        let (loader, _temp) = create_test_loader();
        fs::create_dir_all(loader.state_dir()).unwrap();
        fs::write(loader.config_path(), "{ not json").unwrap();

        assert!(matches!(
            loader.load(),
            Err(crate::core::PmError::Serialization(_))
        ));
    }

    #[test]
    fn test_discover_walks_up_to_state_dir() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join(STATE_DIR)).unwrap();
        let nested = temp.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();

        let loader = ConfigLoader::discover_from(&nested, None);
        assert_eq!(loader.root(), temp.path());

        let explicit = ConfigLoader::discover_from(&nested, Some(nested.clone()));
        assert_eq!(explicit.root(), nested.as_path());
    }

    #[test]
    fn test_discover_falls_back_to_start() {
        let temp = TempDir::new().unwrap();
        let loader = ConfigLoader::discover_from(temp.path(), None);
        assert_eq!(loader.root(), temp.path());
    }
}
