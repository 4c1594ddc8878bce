use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Optional `ecscope.toml`. A missing file is not an error; every field
/// has a default and the CLI flags override all of it.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct EcscopeConfigFile {
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub profile: Option<String>,
    /// How many historical lines the logs/tail commands show.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    /// How many log groups are fetched as ranking candidates.
    #[serde(default = "default_log_group_candidates")]
    pub log_group_candidates: usize,
}

fn default_history_limit() -> usize {
    50
}

fn default_log_group_candidates() -> usize {
    50
}

impl Default for EcscopeConfigFile {
    fn default() -> Self {
        Self {
            region: None,
            profile: None,
            history_limit: default_history_limit(),
            log_group_candidates: default_log_group_candidates(),
        }
    }
}

impl EcscopeConfigFile {
    fn try_init_from_string(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    pub fn try_init() -> Result<Self, ConfigError> {
        match std::fs::read_to_string(&crate::cli::get_cli_args().config) {
            Ok(raw) => Self::try_init_from_string(&raw),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(err.into()),
        }
    }
}
