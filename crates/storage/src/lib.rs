#![forbid(unsafe_code)]

//! SQLite-backed storage for history graphs: node, edge and leaf tables per
//! graph, fragment merge, ancestry queries and consistency checks.

mod store;

pub use store::*;
