use {
    alloy::primitives::Address,
    serde::{Deserialize, Serialize},
    std::num::NonZeroUsize,
};

fn default_max_cache_size() -> NonZeroUsize {
    NonZeroUsize::new(10000).unwrap()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct BannedUsersConfig {
    /// List of account addresses to be denied from order creation.
    #[serde(default)]
    pub addresses: Vec<Address>,

    /// Maximum number of entries to keep in the banned users cache.
    #[serde(default = "default_max_cache_size")]
    pub max_cache_size: NonZeroUsize,
}

impl Default for BannedUsersConfig {
    fn default() -> Self {
        Self {
            addresses: Vec::new(),
            max_cache_size: default_max_cache_size(),
        }
    }
}
