//! Contrast generation and ranking for a final partition.
//!
//! # Strategies
//!
//! - `F`: one omnibus contrast over every cluster
//! - `Pairs`: every unordered cluster pair
//! - `OneAgainstAll`: each cluster against all remaining samples
//! - `Dendro`: the two children of each internal hierarchy node; the only
//!   strategy whose count depends on the hierarchy
//!
//! Statistical modelling belongs to the injected
//! [`DiffTestProvider`](crate::traits::DiffTestProvider); this module only
//! builds specifications and shapes results.

mod engine;
mod generate;
mod types;


pub use engine::{rank_features, ContrastEngine};
pub use generate::generate_contrasts;
pub use types::{Contrast, ContrastKind, ContrastResult, ContrastStatus, ContrastType, RankedFeature};
