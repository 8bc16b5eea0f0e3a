use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy::primitives::{Address, U256};

use orderflow_core::{
    FlowKind, OrderIntent, PlanPort, PlannedStep, PlannedStepKind, PortError, TransactionPlan,
};

use crate::AdapterConfig;

/// Transaction-plan generation. HTTP mode posts the intent to the
/// marketplace API (`POST {base}/v1/orders/plan`) and decodes the ordered
/// step list; deterministic mode builds the same shape locally so flows can
/// run offline in development and tests.
#[derive(Debug, Clone)]
pub struct PlanGeneratorAdapter {
    mode: PlanMode,
    force_approval: Arc<Mutex<Option<bool>>>,
}

#[derive(Debug, Clone)]
enum PlanMode {
    Disabled(String),
    Deterministic,
    Http(HttpRuntime),
}

#[derive(Debug, Clone)]
struct HttpRuntime {
    base_url: String,
    client: reqwest::Client,
}

impl Default for PlanGeneratorAdapter {
    fn default() -> Self {
        Self::with_config(AdapterConfig::default())
    }
}

impl PlanGeneratorAdapter {
    pub fn with_config(config: AdapterConfig) -> Self {
        let mode = if let Some(ref base_url) = config.marketplace_base_url {
            let timeout = Duration::from_millis(config.request_timeout_ms);
            match reqwest::Client::builder().timeout(timeout).build() {
                Ok(client) => PlanMode::Http(HttpRuntime {
                    base_url: base_url.trim_end_matches('/').to_owned(),
                    client,
                }),
                Err(e) => {
                    if config.strict_runtime_required() {
                        PlanMode::Disabled(format!(
                            "failed to initialize marketplace client in production profile: {e}"
                        ))
                    } else {
                        PlanMode::Deterministic
                    }
                }
            }
        } else if config.strict_runtime_required() {
            PlanMode::Disabled(
                "marketplace URL not configured in production runtime profile".to_owned(),
            )
        } else {
            PlanMode::Deterministic
        };

        Self {
            mode,
            force_approval: Arc::new(Mutex::new(None)),
        }
    }

    /// Override whether the deterministic plan includes an approval step.
    pub fn debug_force_approval(&self, force: Option<bool>) -> Result<(), PortError> {
        let mut g = self
            .force_approval
            .lock()
            .map_err(|e| PortError::Transport(format!("plan override lock poisoned: {e}")))?;
        *g = force;
        Ok(())
    }

    fn deterministic_plan(&self, intent: &OrderIntent) -> Result<TransactionPlan, PortError> {
        let forced = *self
            .force_approval
            .lock()
            .map_err(|e| PortError::Transport(format!("plan override lock poisoned: {e}")))?;

        // Sell-side flows approve the collection; an ERC-20-priced offer
        // approves the currency. Transfers move the caller's own token.
        let needs_approval = forced.unwrap_or(match intent.flow {
            FlowKind::AcceptOffer | FlowKind::CreateListing => true,
            FlowKind::MakeOffer => intent.currency.is_some(),
            FlowKind::Transfer => false,
        });

        let exchange: Address = "0x000000000000000000000000000000000000CAFE"
            .parse()
            .map_err(|e| PortError::Validation(format!("exchange address: {e}")))?;

        let mut steps = Vec::with_capacity(2);
        if needs_approval {
            steps.push(PlannedStep {
                id: "tokenApproval".to_owned(),
                kind: PlannedStepKind::TokenApproval,
                to: intent.currency.unwrap_or(intent.collection),
                data: "0x095ea7b3".to_owned(),
                value: U256::ZERO,
            });
        }

        let (id, kind) = match intent.flow {
            FlowKind::MakeOffer => ("createOffer", PlannedStepKind::Signature),
            FlowKind::CreateListing => ("createListing", PlannedStepKind::Signature),
            FlowKind::AcceptOffer => ("acceptOffer", PlannedStepKind::Transaction),
            FlowKind::Transfer => ("transfer", PlannedStepKind::Transaction),
        };
        steps.push(PlannedStep {
            id: id.to_owned(),
            kind,
            to: exchange,
            data: "0x".to_owned(),
            value: U256::ZERO,
        });

        Ok(TransactionPlan { steps })
    }
}

impl PlanPort for PlanGeneratorAdapter {
    async fn generate_plan(&self, intent: &OrderIntent) -> Result<TransactionPlan, PortError> {
        match &self.mode {
            PlanMode::Disabled(reason) => Err(PortError::Policy(reason.clone())),
            PlanMode::Deterministic => self.deterministic_plan(intent),
            PlanMode::Http(runtime) => {
                let url = format!("{}/v1/orders/plan", runtime.base_url);
                let response = runtime
                    .client
                    .post(&url)
                    .json(intent)
                    .send()
                    .await
                    .map_err(|e| {
                        PortError::Transport(format!("plan request failed: {e}"))
                    })?;
                if !response.status().is_success() {
                    return Err(PortError::Transport(format!(
                        "marketplace returned {}",
                        response.status()
                    )));
                }
                let plan: TransactionPlan = response.json().await.map_err(|e| {
                    PortError::Transport(format!("plan response invalid: {e}"))
                })?;
                if plan.final_action().is_none() {
                    return Err(PortError::Validation(
                        "plan contains no final action step".to_owned(),
                    ));
                }
                Ok(plan)
            }
        }
    }
}
