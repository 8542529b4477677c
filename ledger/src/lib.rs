//! The serially-executed Agora ledger.
//!
//! Holds the balance table, the governance engine, the escrow vault and the
//! governed protocol settings. Every write is a [`Command`] applied through
//! the pure [`transition`] function: it either produces a complete new state
//! or fails with nothing changed.

pub mod balances;
pub mod command;
pub mod error;
pub mod genesis;
pub mod ledger;
pub mod settings;
pub mod state;

pub use balances::{BalanceTable, BalanceView};
pub use command::{Command, Effect, Envelope, Receipt};
pub use error::LedgerError;
pub use genesis::{Allocation, GenesisConfig};
pub use ledger::{Ledger, LedgerSummary};
pub use settings::{ProtocolSettings, VaultConfig};
pub use state::{transition, LedgerState, ProposalView};
