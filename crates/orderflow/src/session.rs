//! Flow session: the one caller-facing boundary over the flow engine. Owns
//! the ports and all mutable flow state; steps are derived snapshots rebuilt
//! on every read.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use alloy::primitives::{Address, U256};

use orderflow_core::{
    auto_select_fee_option, base_guard, compute_flow_state, execute_next_step, fee_guard,
    final_transaction_guard, ApprovalStep, BalancePort, BaseGuardInput, FeeConfirmationSlot,
    FeeOption, FeeSelection, FeeStatus, FeeStep, FinalGuardInput, FlowError, FlowState, GuardResult,
    OrderIntent, PlanPort, PlannedStep, PlannedStepKind, StepKind, StepResult, StepRunner,
    StepSet, SuggestedAction, TransactionPlan, TransactionStep, TxStepStatus, WalletPort,
};

use crate::form::FormState;

#[derive(Debug, Clone)]
struct TxRuntime {
    status: TxStepStatus,
    error: Option<String>,
    result: Option<StepResult>,
}

impl Default for TxRuntime {
    fn default() -> Self {
        Self {
            status: TxStepStatus::Idle,
            error: None,
            result: None,
        }
    }
}

pub struct FlowSession<W, B, P> {
    wallet: W,
    balances: B,
    planner: P,
    intent: OrderIntent,
    form: FormState,
    plan: TransactionPlan,
    fee_slot: Arc<FeeConfirmationSlot>,
    fee_visible: bool,
    fee_selecting: bool,
    fee_selected: Option<FeeOption>,
    fee_sponsored: bool,
    approval: TxRuntime,
    approval_invalidated: bool,
    transaction: TxRuntime,
    closed: bool,
}

impl<W, B, P> FlowSession<W, B, P>
where
    W: WalletPort + Send + Sync,
    B: BalancePort + Send + Sync,
    P: PlanPort + Send + Sync,
{
    /// Open a flow: validate the form and fetch the transaction plan. A plan
    /// the backend refuses to generate is a configuration error and fails the
    /// open; form errors are state, not failures.
    pub async fn open(
        intent: OrderIntent,
        wallet: W,
        balances: B,
        planner: P,
    ) -> Result<Self, FlowError> {
        let form = FormState::validate(&intent, wallet.address(), now_unix());
        let plan = planner.generate_plan(&intent).await?;
        if plan.final_action().is_none() {
            return Err(FlowError::Configuration(
                "transaction plan has no final action step".to_owned(),
            ));
        }
        tracing::info!(flow = ?intent.flow, steps = plan.steps.len(), "flow opened");
        Ok(Self {
            wallet,
            balances,
            planner,
            intent,
            form,
            plan,
            fee_slot: Arc::new(FeeConfirmationSlot::new()),
            fee_visible: false,
            fee_selecting: false,
            fee_selected: None,
            fee_sponsored: false,
            approval: TxRuntime::default(),
            approval_invalidated: false,
            transaction: TxRuntime::default(),
            closed: false,
        })
    }

    /// Handle the managed-wallet provider awaits fee confirmations on.
    pub fn fee_slot(&self) -> Arc<FeeConfirmationSlot> {
        Arc::clone(&self.fee_slot)
    }

    pub fn intent(&self) -> &OrderIntent {
        &self.intent
    }

    /// Derive the current step set. Rebuilt on every call; nothing here is
    /// cached or subscribed.
    pub fn steps(&self) -> StepSet {
        let form = self.form.to_step();

        let fee = if self.wallet.is_waas() {
            let complete = self.fee_sponsored || self.fee_selected.is_some();
            let status = if complete {
                FeeStatus::Success
            } else if self.fee_visible || self.fee_selecting {
                FeeStatus::Selecting
            } else {
                FeeStatus::Idle
            };
            Some(FeeStep {
                status,
                is_sponsored: self.fee_sponsored,
                is_selecting: self.fee_selecting,
                selected_option: self.fee_selected.clone(),
            })
        } else {
            None
        };

        let approval = self.plan.approval().map(|_| {
            let guard = self.approval_guard();
            ApprovalStep {
                tx: self.runtime_step(&self.approval, &guard),
                invalidated: self.approval_invalidated,
            }
        });

        let final_guard = self.final_guard();
        let transaction = Some(self.runtime_step(&self.transaction, &final_guard));

        StepSet {
            form: Some(form),
            fee,
            approval,
            transaction,
        }
    }

    /// Aggregate summary; pure recomputation over `steps()`.
    pub fn flow(&self) -> FlowState {
        compute_flow_state(&self.steps())
    }

    /// Drive the first actionable step in canonical order. Returns the kind
    /// acted on, or `None` once the flow is complete or blocked.
    pub async fn execute_next(&mut self) -> Result<Option<StepKind>, FlowError> {
        self.ensure_open()?;
        let steps = self.steps();
        execute_next_step(&steps, self).await
    }

    /// Run the approval transaction. Re-invoking while pending is a no-op;
    /// calling it on a completed, non-invalidated approval is a guard
    /// violation (a UI bug, not a user error).
    pub async fn execute_approval(&mut self) -> Result<(), FlowError> {
        self.ensure_open()?;
        let Some(planned) = self.plan.approval().cloned() else {
            return Err(FlowError::Configuration(
                "flow has no approval step".to_owned(),
            ));
        };
        match self.approval.status {
            TxStepStatus::Pending => {
                tracing::debug!("approval already pending; execute is a no-op");
                return Ok(());
            }
            TxStepStatus::Success if !self.approval_invalidated => {
                return Err(FlowError::GuardViolation(
                    "approval step already complete".to_owned(),
                ));
            }
            _ => {}
        }
        let guard = self.approval_guard();
        if !guard.can_proceed {
            return Err(FlowError::GuardViolation(
                guard.error.unwrap_or_else(|| "approval blocked".to_owned()),
            ));
        }

        self.approval.status = TxStepStatus::Pending;
        self.approval.error = None;
        let outcome = self.submit(&planned).await;
        match outcome {
            Ok(result) => {
                self.approval.status = TxStepStatus::Success;
                self.approval.result = Some(result);
                self.approval_invalidated = false;
                tracing::info!("approval step succeeded");
            }
            Err(err) => {
                tracing::warn!(error = %err, "approval step failed");
                self.approval.status = TxStepStatus::Error;
                self.approval.error = Some(err.to_string());
            }
        }
        Ok(())
    }

    /// Run the final domain action (offer / sale / transfer / listing).
    pub async fn execute_transaction(&mut self) -> Result<(), FlowError> {
        self.ensure_open()?;
        let Some(planned) = self.plan.final_action().cloned() else {
            return Err(FlowError::Configuration(
                "transaction plan has no final action step".to_owned(),
            ));
        };
        match self.transaction.status {
            TxStepStatus::Pending => {
                tracing::debug!("transaction already pending; execute is a no-op");
                return Ok(());
            }
            TxStepStatus::Success => {
                return Err(FlowError::GuardViolation(
                    "transaction step already complete".to_owned(),
                ));
            }
            _ => {}
        }
        let guard = self.final_guard();
        if !guard.can_proceed {
            return Err(FlowError::GuardViolation(
                guard
                    .error
                    .unwrap_or_else(|| "transaction blocked".to_owned()),
            ));
        }

        self.transaction.status = TxStepStatus::Pending;
        self.transaction.error = None;
        let outcome = self.submit(&planned).await;
        match outcome {
            Ok(result) => {
                self.transaction.status = TxStepStatus::Success;
                self.transaction.result = Some(result);
                tracing::info!("final transaction step succeeded");
            }
            Err(err) => {
                tracing::warn!(error = %err, "final transaction step failed");
                self.transaction.status = TxStepStatus::Error;
                self.transaction.error = Some(err.to_string());
            }
        }
        Ok(())
    }

    /// Surface the fee-selection UI. A sponsored confirmation (zero options)
    /// resolves immediately without showing anything.
    pub fn show_fee_ui(&mut self) {
        if let Ok(Some(pending)) = self.fee_slot.pending() {
            if pending.options.is_empty() {
                tracing::debug!(id = %pending.id, "sponsored fee confirmation; auto-resolving");
                let _ = self.fee_slot.resolve(&pending.id, None);
                self.fee_sponsored = true;
                return;
            }
        }
        self.fee_visible = true;
    }

    pub fn cancel_fee_ui(&mut self) {
        self.fee_visible = false;
    }

    /// Run the auto-selector against the pending confirmation and apply the
    /// result if (and only if) the same confirmation is still outstanding.
    pub async fn auto_select_fee(&mut self) -> Result<FeeSelection, FlowError> {
        self.ensure_open()?;
        let pending = self.fee_slot.pending()?;
        if let Some(confirmation) = &pending {
            if confirmation.options.is_empty() {
                self.fee_slot.resolve(&confirmation.id, None)?;
                self.fee_sponsored = true;
                return Ok(FeeSelection {
                    confirmation_id: Some(confirmation.id.clone()),
                    selected_option: None,
                    error: None,
                });
            }
        }

        self.fee_selecting = true;
        let selection =
            auto_select_fee_option(pending.as_ref(), self.wallet.address(), &self.balances).await;
        self.fee_selecting = false;

        if let (Some(id), Some(option)) = (&selection.confirmation_id, &selection.selected_option)
        {
            let current = self.fee_slot.pending()?;
            let still_current = current.as_ref().map(|c| c.id.as_str()) == Some(id.as_str());
            if still_current {
                self.fee_slot.resolve(id, option.token.contract_address)?;
                self.fee_selected = Some(option.clone());
                self.fee_visible = false;
            } else {
                tracing::debug!(id = %id, "dropping stale fee auto-selection");
            }
        }
        Ok(selection)
    }

    /// Resolve the fee confirmation from an explicit UI choice.
    pub fn select_fee_option(&mut self, contract: Option<Address>) -> Result<(), FlowError> {
        self.ensure_open()?;
        let Some(pending) = self.fee_slot.pending()? else {
            return Err(FlowError::Configuration(
                "no outstanding fee confirmation".to_owned(),
            ));
        };
        let Some(option) = pending
            .options
            .iter()
            .find(|o| o.token.contract_address == contract)
            .cloned()
        else {
            return Err(FlowError::Configuration(
                "selected token is not a valid fee option".to_owned(),
            ));
        };
        self.fee_slot.resolve(&pending.id, contract)?;
        self.fee_selected = Some(option);
        self.fee_visible = false;
        Ok(())
    }

    /// Mark the approval stale (e.g. the allowance changed externally). The
    /// executor treats the step as actionable again.
    pub fn invalidate_approval(&mut self) {
        if self.plan.approval().is_some() {
            self.approval_invalidated = true;
        }
    }

    pub fn reset_approval(&mut self) {
        self.approval = TxRuntime::default();
        self.approval_invalidated = false;
    }

    /// Re-input paths; each re-validates the form.
    pub fn set_price(&mut self, price: U256) {
        self.intent.price = price;
        self.revalidate();
    }

    pub fn set_quantity(&mut self, quantity: u64) {
        self.intent.quantity = quantity;
        self.revalidate();
    }

    pub fn set_expiry(&mut self, expiry_unix: Option<u64>) {
        self.intent.expiry_unix = expiry_unix;
        self.revalidate();
    }

    pub fn set_receiver(&mut self, receiver: Option<Address>) {
        self.intent.receiver = receiver;
        self.revalidate();
    }

    /// Tear the flow down. Rejects any outstanding fee confirmation exactly
    /// once; closing twice is a no-op.
    pub fn close(&mut self) -> bool {
        if self.closed {
            return false;
        }
        self.closed = true;
        self.fee_visible = false;
        let rejected = self.fee_slot.close();
        tracing::info!(rejected_fee_confirmation = rejected, "flow closed");
        rejected
    }

    /// Re-fetch the plan with the current intent; used after re-input changed
    /// what the backend would generate.
    pub async fn refresh_plan(&mut self) -> Result<(), FlowError> {
        self.ensure_open()?;
        let plan = self.planner.generate_plan(&self.intent).await?;
        if plan.final_action().is_none() {
            return Err(FlowError::Configuration(
                "transaction plan has no final action step".to_owned(),
            ));
        }
        // A refreshed plan that still demands an approval supersedes one we
        // already executed.
        if plan.approval().is_some() && self.approval.status == TxStepStatus::Success {
            self.approval_invalidated = true;
        }
        self.plan = plan;
        Ok(())
    }

    fn revalidate(&mut self) {
        self.form = FormState::validate(&self.intent, self.wallet.address(), now_unix());
    }

    fn ensure_open(&self) -> Result<(), FlowError> {
        if self.closed {
            return Err(FlowError::Configuration("flow is closed".to_owned()));
        }
        Ok(())
    }

    fn base_input(&self) -> BaseGuardInput {
        BaseGuardInput {
            wallet_connected: self.wallet.address().is_some(),
            is_form_valid: self.form.is_valid(),
            tx_ready: self.plan.final_action().is_some(),
        }
    }

    /// Gate on the fee step: blocked while the selection UI is open, and
    /// blocked while a required fee step is still incomplete. A later step's
    /// guard must fail while an earlier required step is incomplete, so
    /// nothing downstream can run around the fee step.
    fn fee_gate(&self) -> GuardResult {
        let fee = fee_guard(self.fee_visible);
        if !fee.can_proceed {
            return fee;
        }
        if self.wallet.is_waas() && !self.fee_sponsored && self.fee_selected.is_none() {
            return GuardResult::blocked("fee option not selected", SuggestedAction::SelectFee);
        }
        GuardResult::proceed()
    }

    fn approval_guard(&self) -> GuardResult {
        let fee = self.fee_gate();
        if !fee.can_proceed {
            return fee;
        }
        base_guard(&self.base_input())
    }

    fn final_guard(&self) -> GuardResult {
        let fee = self.fee_gate();
        if !fee.can_proceed {
            return fee;
        }
        let requires_approval = self.plan.approval().is_some();
        final_transaction_guard(&FinalGuardInput {
            base: self.base_input(),
            requires_approval,
            approval_complete: self.approval.status == TxStepStatus::Success
                && !self.approval_invalidated,
        })
    }

    fn runtime_step(&self, runtime: &TxRuntime, guard: &GuardResult) -> TransactionStep {
        let disabled = runtime.status == TxStepStatus::Pending || !guard.can_proceed;
        TransactionStep {
            status: runtime.status,
            disabled,
            disabled_reason: if disabled {
                guard
                    .error
                    .clone()
                    .or_else(|| Some("step is pending".to_owned()))
            } else {
                None
            },
            error: runtime.error.clone(),
            result: runtime.result.clone(),
        }
    }

    async fn submit(&self, planned: &PlannedStep) -> Result<StepResult, FlowError> {
        if self.wallet.chain_id() != self.intent.chain_id {
            self.wallet.switch_chain(self.intent.chain_id).await?;
        }
        match planned.kind {
            PlannedStepKind::Signature => {
                let order_id = self.wallet.sign_order(planned).await?;
                Ok(StepResult::Signature { order_id })
            }
            PlannedStepKind::TokenApproval | PlannedStepKind::Transaction => {
                let hash = self.wallet.send_transaction(planned).await?;
                Ok(StepResult::Transaction { hash })
            }
        }
    }
}

impl<W, B, P> StepRunner for FlowSession<W, B, P>
where
    W: WalletPort + Send + Sync,
    B: BalancePort + Send + Sync,
    P: PlanPort + Send + Sync,
{
    fn show_fee_selection(&mut self) {
        self.show_fee_ui();
    }

    async fn execute_approval(&mut self) -> Result<(), FlowError> {
        FlowSession::execute_approval(self).await
    }

    async fn execute_transaction(&mut self) -> Result<(), FlowError> {
        FlowSession::execute_transaction(self).await
    }
}

impl<W, B, P> Drop for FlowSession<W, B, P> {
    fn drop(&mut self) {
        // Teardown must not leak a pending confirmation even if the caller
        // forgot to close.
        if !self.closed {
            self.fee_slot.close();
        }
    }
}

fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
