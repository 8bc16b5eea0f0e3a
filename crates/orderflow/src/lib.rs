//! Transaction-flow orchestration for marketplace modals: one session per
//! open flow, deriving a renderable step set from wallet, form, and plan
//! state. See `orderflow-core` for the engine and `orderflow-adapters` for
//! the runtime ports.

pub mod flows;
pub mod form;
pub mod session;

pub use flows::{
    accept_offer, create_listing, make_offer, transfer, AcceptOfferParams, ListingParams,
    OfferParams, TransferParams,
};
pub use form::FormState;
pub use session::FlowSession;

pub use orderflow_core as core;
pub use orderflow_core::{
    FeeConfirmationDecision, FeeOption, FeeOptionConfirmation, FlowError, FlowKind, FlowState,
    FlowStatus, StepKind, StepResult, StepSet, SuggestedAction, WalletKind,
};
