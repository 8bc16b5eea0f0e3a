use orderflow_core::WalletKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeProfile {
    /// Deterministic in-memory fallbacks are allowed.
    Development,
    /// Every adapter must have a real runtime configured; fallbacks refuse.
    Production,
}

#[derive(Debug, Clone)]
pub struct AdapterConfig {
    pub runtime_profile: RuntimeProfile,
    pub indexer_base_url: Option<String>,
    pub marketplace_base_url: Option<String>,
    pub request_timeout_ms: u64,
    pub default_chain_id: u64,
    pub wallet_kind: WalletKind,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            runtime_profile: RuntimeProfile::Development,
            indexer_base_url: None,
            marketplace_base_url: None,
            request_timeout_ms: 15_000,
            default_chain_id: 1,
            wallet_kind: WalletKind::Eoa,
        }
    }
}

impl AdapterConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(profile) = std::env::var("ORDERFLOW_RUNTIME_PROFILE") {
            if profile.eq_ignore_ascii_case("production") {
                config.runtime_profile = RuntimeProfile::Production;
            }
        }
        if let Ok(url) = std::env::var("ORDERFLOW_INDEXER_URL") {
            if !url.is_empty() {
                config.indexer_base_url = Some(url);
            }
        }
        if let Ok(url) = std::env::var("ORDERFLOW_MARKETPLACE_URL") {
            if !url.is_empty() {
                config.marketplace_base_url = Some(url);
            }
        }
        if let Ok(chain) = std::env::var("ORDERFLOW_CHAIN_ID") {
            if let Ok(id) = chain.parse() {
                config.default_chain_id = id;
            }
        }
        if let Ok(kind) = std::env::var("ORDERFLOW_WALLET_KIND") {
            if kind.eq_ignore_ascii_case("waas") {
                config.wallet_kind = WalletKind::Waas;
            }
        }
        config
    }

    pub fn strict_runtime_required(&self) -> bool {
        self.runtime_profile == RuntimeProfile::Production
    }
}
