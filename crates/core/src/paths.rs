use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Paths {
    pub base: PathBuf,
}

impl Paths {
    pub fn new() -> Self {
        let base = dirs::home_dir()
            .map(|h| h.join(".swarmgate"))
            .unwrap_or_else(|| PathBuf::from(".swarmgate"));
        Self { base }
    }

    pub fn with_base(base: PathBuf) -> Self {
        Self { base }
    }

    pub fn config_file(&self) -> PathBuf {
        self.base.join("config.json")
    }

    /// Default location for bot definitions used by the CLI.
    pub fn bots_file(&self) -> PathBuf {
        self.base.join("bots.json")
    }
}

impl Default for Paths {
    fn default() -> Self {
        Self::new()
    }
}
