use crate::client::consts::BASE_URL;

#[derive(Debug, Clone)]
pub struct Config {
    base_url: String,
}

pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::new(),
        }
    }

    /// Everything up to, but excluding, the endpoint path, e.g. `https://host/api`.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.config.base_url = base_url.trim().trim_end_matches('/').to_string();
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    // Sets the default values.
    pub fn new() -> Self {
        Self {
            base_url: BASE_URL.to_string(),
        }
    }

    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
