//! Inventory ledger domain rules.
//!
//! This crate contains the business rules for per-product stock counts,
//! implemented purely as deterministic domain logic (no IO, no HTTP, no
//! storage). The single invariant: quantity never goes negative.

pub mod product;

pub use product::Product;
