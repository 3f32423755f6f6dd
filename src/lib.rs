//! Gatekeeper: a gate holding threads at a checkpoint until it is unlocked, with banked
//! single admission tickets and predicate based bypass.
#![deny(bad_style)]
#![deny(future_incompatible)]
#![deny(nonstandard_style)]
#![deny(rust_2018_idioms)]
#![deny(unused_imports)]
#[macro_use]
extern crate slog;

pub mod primitives;
