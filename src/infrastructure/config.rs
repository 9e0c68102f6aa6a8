use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct LookerConfig {
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    /// `false` accepts self-signed certificates
    #[serde(default = "default_verify_ssl")]
    pub verify_ssl: bool,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RefreshConfig {
    #[serde(default)]
    pub dashboard_id: Option<String>,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

fn default_api_version() -> String {
    "4.0".to_string()
}

fn default_verify_ssl() -> bool {
    true
}

fn default_timeout() -> u64 {
    120
}

fn default_poll_interval_secs() -> u64 {
    5
}

impl LookerConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.base_url.trim().is_empty() {
            anyhow::bail!("Looker base_url is not set (config/looker or LOOKERSDK_BASE_URL)");
        }
        if self.client_id.is_empty() || self.client_secret.is_empty() {
            anyhow::bail!(
                "Looker API credentials are not set (LOOKERSDK_CLIENT_ID / LOOKERSDK_CLIENT_SECRET)"
            );
        }
        Ok(())
    }
}

/// `config/looker` overlaid by `LOOKERSDK_*` environment variables
pub fn load_looker_config() -> anyhow::Result<LookerConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/looker").required(false))
        .add_source(config::Environment::with_prefix("LOOKERSDK"))
        .build()?;

    looker_config_from(settings)
}

/// `config/refresh` overlaid by `REFRESH_*` environment variables
pub fn load_refresh_config() -> anyhow::Result<RefreshConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/refresh").required(false))
        .add_source(config::Environment::with_prefix("REFRESH"))
        .build()?;

    Ok(settings.try_deserialize()?)
}

fn looker_config_from(settings: config::Config) -> anyhow::Result<LookerConfig> {
    let looker: LookerConfig = settings.try_deserialize()?;
    looker.validate()?;
    Ok(looker)
}
