//! Core types, rules and services for FlavorForge.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! Storage backends implement [`store::ForgeStore`]; the HTTP layer drives
//! the [`ledger::Ledger`] and [`planner::MealPlanner`] services.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod error;
pub mod ledger;
pub mod level;
pub mod meal_plan;
pub mod planner;
pub mod recipe;
pub mod store;
pub mod user;

pub use error::{Error, Result};
