//! Step executor: drives exactly one actionable step per invocation, in
//! canonical order. The caller re-invokes once the acted-on step resolves.

use crate::domain::{FeeStatus, StepKind, StepSet};
use crate::ports::FlowError;

/// Flow-supplied effects the executor can trigger. One method per step shape;
/// the runner owns re-entrancy guards and status bookkeeping.
pub trait StepRunner {
    /// Surface the fee-selection UI for the current confirmation.
    fn show_fee_selection(&mut self);
    fn execute_approval(
        &mut self,
    ) -> impl std::future::Future<Output = Result<(), FlowError>> + Send;
    fn execute_transaction(
        &mut self,
    ) -> impl std::future::Future<Output = Result<(), FlowError>> + Send;
}

/// Scan the steps in canonical order and act on the first candidate:
/// a fee step not yet successful, or an approval/transaction step that is
/// idle and enabled. An invalidated approval is actionable again even though
/// it was previously successful. Returns the kind acted on, or `None` when
/// the flow is complete or blocked.
pub async fn execute_next_step<R: StepRunner>(
    steps: &StepSet,
    runner: &mut R,
) -> Result<Option<StepKind>, FlowError> {
    if let Some(fee) = &steps.fee {
        if fee.status != FeeStatus::Success {
            tracing::debug!("executor: surfacing fee selection");
            runner.show_fee_selection();
            return Ok(Some(StepKind::Fee));
        }
    }

    if let Some(approval) = &steps.approval {
        if approval.tx.can_execute() || approval.invalidated {
            tracing::debug!(invalidated = approval.invalidated, "executor: running approval");
            runner.execute_approval().await?;
            return Ok(Some(StepKind::Approval));
        }
        // An incomplete approval that cannot run (disabled, pending, errored)
        // blocks the scan; the final step is never reached around it.
        if !approval.is_complete() {
            return Ok(None);
        }
    }

    if let Some(tx) = &steps.transaction {
        if tx.can_execute() {
            tracing::debug!("executor: running final transaction");
            runner.execute_transaction().await?;
            return Ok(Some(StepKind::Transaction));
        }
    }

    Ok(None)
}
