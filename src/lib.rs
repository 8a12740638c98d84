//! Rewrites line-oriented solver directive files: toggles directives,
//! substitutes values and replaces parameter blocks, committing a batch only
//! when every request matched.

pub mod config;
pub mod engine;
pub mod error;
pub mod parser;
pub mod plan;
pub mod store;

pub use config::RewriteConfig;
pub use engine::{replace_blocks, set_values, toggle, ApplyReport, MutationRequest, Rewriter};
pub use error::{PlanError, RewriteError};
pub use parser::{Activation, Selector};
pub use plan::{MutationPlan, RunList};
