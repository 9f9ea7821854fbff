//! SiteSmith - Screenshot-to-Website Generation Service
//!
//! This crate implements the billing core of SiteSmith: idempotent payment
//! reconciliation against the payment provider's webhooks and an append-only
//! credit ledger backing the generation pipeline.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
