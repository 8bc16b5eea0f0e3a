pub mod balances;
pub mod config;
pub mod plan;
pub mod wallet;

pub use balances::BalanceIndexerAdapter;
pub use config::{AdapterConfig, RuntimeProfile};
pub use plan::PlanGeneratorAdapter;
pub use wallet::WalletAdapter;
