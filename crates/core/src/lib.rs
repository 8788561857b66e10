#![forbid(unsafe_code)]

mod ancestry;
mod fragment;
mod frontier;
mod ids;
mod leaves;
mod node;

pub use ancestry::*;
pub use fragment::*;
pub use frontier::*;
pub use ids::*;
pub use leaves::*;
pub use node::*;
