use {
    alloy::primitives::Address,
    serde::{Deserialize, Serialize},
    std::time::Duration,
    url::Url,
};

fn default_update_interval() -> Duration {
    Duration::from_secs(3600) // 1h
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct TrustedTokensConfig {
    /// The URL of a list of tokens our settlement contract is willing to
    /// internalize.
    pub url: Option<Url>,

    /// Hardcoded list of trusted tokens to use in addition to `url`.
    #[serde(default)]
    pub tokens: Vec<Address>,

    /// Time interval after which the trusted tokens list needs to be updated.
    #[serde(with = "humantime_serde", default = "default_update_interval")]
    pub update_interval: Duration,
}

impl Default for TrustedTokensConfig {
    fn default() -> Self {
        Self {
            url: None,
            tokens: Vec::new(),
            update_interval: default_update_interval(),
        }
    }
}
