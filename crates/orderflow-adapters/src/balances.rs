use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy::primitives::{Address, U256};
use serde::Deserialize;

use orderflow_core::{BalancePort, PortError};

use crate::AdapterConfig;

/// Balance lookups against the token indexer. Deterministic mode keeps an
/// in-memory table seeded via the debug injector; HTTP mode queries
/// `GET {base}/v1/balances/{owner}[?contract=0x..]`.
#[derive(Debug, Clone)]
pub struct BalanceIndexerAdapter {
    mode: BalanceMode,
    table: Arc<Mutex<BTreeMap<(Address, Option<Address>), U256>>>,
}

#[derive(Debug, Clone)]
enum BalanceMode {
    Disabled(String),
    Deterministic,
    Http(HttpRuntime),
}

#[derive(Debug, Clone)]
struct HttpRuntime {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct BalanceResponse {
    balance: String,
}

impl Default for BalanceIndexerAdapter {
    fn default() -> Self {
        Self::with_config(AdapterConfig::default())
    }
}

impl BalanceIndexerAdapter {
    pub fn with_config(config: AdapterConfig) -> Self {
        let mode = if let Some(ref base_url) = config.indexer_base_url {
            let timeout = Duration::from_millis(config.request_timeout_ms);
            match reqwest::Client::builder().timeout(timeout).build() {
                Ok(client) => BalanceMode::Http(HttpRuntime {
                    base_url: base_url.trim_end_matches('/').to_owned(),
                    client,
                }),
                Err(e) => {
                    if config.strict_runtime_required() {
                        BalanceMode::Disabled(format!(
                            "failed to initialize indexer client in production profile: {e}"
                        ))
                    } else {
                        BalanceMode::Deterministic
                    }
                }
            }
        } else if config.strict_runtime_required() {
            BalanceMode::Disabled(
                "indexer URL not configured in production runtime profile".to_owned(),
            )
        } else {
            BalanceMode::Deterministic
        };

        Self {
            mode,
            table: Arc::new(Mutex::new(BTreeMap::new())),
        }
    }

    pub fn debug_set_balance(
        &self,
        owner: Address,
        contract: Option<Address>,
        balance: U256,
    ) -> Result<(), PortError> {
        let mut g = self
            .table
            .lock()
            .map_err(|e| PortError::Transport(format!("balance table lock poisoned: {e}")))?;
        g.insert((owner, contract), balance);
        Ok(())
    }
}

impl BalancePort for BalanceIndexerAdapter {
    async fn token_balance(
        &self,
        owner: Address,
        contract: Option<Address>,
    ) -> Result<U256, PortError> {
        match &self.mode {
            BalanceMode::Disabled(reason) => Err(PortError::Policy(reason.clone())),
            BalanceMode::Deterministic => {
                let g = self.table.lock().map_err(|e| {
                    PortError::Transport(format!("balance table lock poisoned: {e}"))
                })?;
                Ok(g.get(&(owner, contract)).copied().unwrap_or(U256::ZERO))
            }
            BalanceMode::Http(runtime) => {
                let mut url = format!("{}/v1/balances/{owner}", runtime.base_url);
                if let Some(contract) = contract {
                    url.push_str(&format!("?contract={contract}"));
                }
                let response = runtime
                    .client
                    .get(&url)
                    .send()
                    .await
                    .map_err(|e| PortError::Transport(format!("indexer request failed: {e}")))?;
                if !response.status().is_success() {
                    return Err(PortError::Transport(format!(
                        "indexer returned {}",
                        response.status()
                    )));
                }
                let body: BalanceResponse = response
                    .json()
                    .await
                    .map_err(|e| PortError::Transport(format!("indexer response invalid: {e}")))?;
                body.balance
                    .parse()
                    .map_err(|e| PortError::Validation(format!("invalid balance value: {e}")))
            }
        }
    }
}
