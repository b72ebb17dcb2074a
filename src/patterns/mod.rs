//! Pattern compilation and matching.

mod compiler;
mod ruleset;

pub use ruleset::CompiledRuleSet;
