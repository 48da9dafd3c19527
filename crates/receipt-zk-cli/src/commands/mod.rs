//! CLI command implementations for receipt-zk.
//!
//! Each module corresponds to a subcommand (`receipt-zk <command>`).

pub mod check;
pub mod compile;
pub mod init;
pub mod prove;
pub mod serve;
pub mod verify;
