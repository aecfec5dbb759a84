use envconfig::Envconfig;
use log::debug;

#[derive(Envconfig, Clone)]
pub struct Config {
    #[envconfig(from = "GEMINI_API_KEY")]
    pub api_key: Option<String>,

    #[envconfig(from = "GEMINI_MODEL", default = "gemini-2.5-pro")]
    pub model: String,

    #[envconfig(
        from = "GEMINI_ENDPOINT",
        default = "https://generativelanguage.googleapis.com/v1beta"
    )]
    pub endpoint: String,

    #[envconfig(from = "GEMINI_TIMEOUT_SECS", default = "120")]
    pub timeout_secs: u64,

    #[envconfig(from = "PREVIEW_ROWS", default = "5")]
    pub preview_rows: usize,
}

impl Config {
    pub fn new() -> Result<Self, envconfig::Error> {
        let config = Self::init_from_env()?;
        debug!(
            "Config loaded: model={}, endpoint={}, timeout_secs={}, preview_rows={}, api_key_set={}",
            config.model,
            config.endpoint,
            config.timeout_secs,
            config.preview_rows,
            config.api_key.is_some()
        );
        Ok(config)
    }
}
