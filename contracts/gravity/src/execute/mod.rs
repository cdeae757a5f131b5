//! Execute handlers for the Gravity bridge contract.
//!
//! - `validator` - delegate keys, claims and confirmations from orchestrators
//! - `outgoing` - transfers to Ethereum and batch requests
//! - `config` - token registration and parameter updates
//! - `admin` - pause and admin transfer

mod admin;
mod config;
mod outgoing;
mod validator;

pub use admin::*;
pub use config::*;
pub use outgoing::*;
pub use validator::*;
