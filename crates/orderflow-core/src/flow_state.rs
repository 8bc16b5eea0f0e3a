//! Flow state aggregation: one pure function from a step set to a renderable
//! summary. No subscriptions; the caller recomputes after any transition.

use crate::domain::{
    FeeStatus, FlowState, FlowStatus, FormStatus, Progress, StepKind, StepSet, TxStepStatus,
};

struct StepView {
    kind: StepKind,
    complete: bool,
    idle: bool,
    disabled: bool,
    pending: bool,
    errored: bool,
}

fn flatten(steps: &StepSet) -> Vec<StepView> {
    let mut out = Vec::with_capacity(4);
    if let Some(form) = &steps.form {
        out.push(StepView {
            kind: StepKind::Form,
            complete: form.is_complete(),
            idle: form.status == FormStatus::Idle,
            disabled: false,
            pending: false,
            errored: false,
        });
    }
    if let Some(fee) = &steps.fee {
        out.push(StepView {
            kind: StepKind::Fee,
            complete: fee.is_complete(),
            idle: fee.status == FeeStatus::Idle,
            disabled: false,
            pending: fee.status == FeeStatus::Selecting,
            errored: false,
        });
    }
    if let Some(approval) = &steps.approval {
        out.push(StepView {
            kind: StepKind::Approval,
            complete: approval.tx.is_success(),
            idle: approval.tx.status == TxStepStatus::Idle,
            disabled: approval.tx.disabled,
            pending: approval.tx.is_pending(),
            errored: approval.tx.has_error(),
        });
    }
    if let Some(tx) = &steps.transaction {
        out.push(StepView {
            kind: StepKind::Transaction,
            complete: tx.is_success(),
            idle: tx.status == TxStepStatus::Idle,
            disabled: tx.disabled,
            pending: tx.is_pending(),
            errored: tx.has_error(),
        });
    }
    out
}

pub fn compute_flow_state(steps: &StepSet) -> FlowState {
    let views = flatten(steps);
    let total = views.len();
    let completed = views.iter().filter(|v| v.complete).count();

    let current_step = views
        .iter()
        .find(|v| !v.complete && !v.disabled)
        .or_else(|| views.first())
        .map(|v| v.kind);
    let next_step = views.iter().find(|v| v.idle && !v.disabled).map(|v| v.kind);

    let is_pending = views.iter().any(|v| v.pending);
    let has_error = views.iter().any(|v| v.errored);
    let is_success = total > 0 && completed == total;

    // Contractual priority order: pending outranks error outranks success.
    let status = if is_pending {
        FlowStatus::Pending
    } else if has_error {
        FlowStatus::Error
    } else if is_success {
        FlowStatus::Success
    } else {
        FlowStatus::Idle
    };

    let percent = if total == 0 {
        0
    } else {
        ((completed as f64 / total as f64) * 100.0).round() as u8
    };

    let has_invalidated_steps = steps.approval.as_ref().is_some_and(|a| a.invalidated);

    FlowState {
        status,
        current_step,
        next_step,
        progress: Progress {
            current: completed,
            total,
            percent,
        },
        has_invalidated_steps,
    }
}
