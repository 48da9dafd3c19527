//! Core library for the receipt-zk toolkit.
//!
//! Describes zero-knowledge circuits over Ethereum transaction receipts: the
//! receipt data model ([`receipt`], [`stream`]), the predicate pipeline a
//! circuit runs over them ([`predicate`], [`pipeline`]), the application
//! circuit contract ([`circuit::AppCircuit`]) and the hand-off to external
//! collaborators: [`source::ReceiptSource`] for receipts and
//! [`backend::ProvingBackend`] for compile / prove / verify.
//!
//! This crate is backend-agnostic. The development backend lives in
//! [`receipt_zk_native`](https://docs.rs/receipt-zk-native).

pub mod api;
pub mod artifacts;
pub mod backend;
pub mod circuit;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod predicate;
pub mod querier;
pub mod receipt;
pub mod source;
pub mod stream;
