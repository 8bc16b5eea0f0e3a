//! Domain flow constructors, one per modal. Pure consumers of the engine:
//! ordering, guard priority, and aggregation all live in `orderflow-core`.

pub mod accept_offer;
pub mod create_listing;
pub mod make_offer;
pub mod transfer;

pub use accept_offer::{accept_offer, AcceptOfferParams};
pub use create_listing::{create_listing, ListingParams};
pub use make_offer::{make_offer, OfferParams};
pub use transfer::{transfer, TransferParams};
