// Rules module - token-level entity rules
// - engine.rs: constraint interpreter (greedy, no backtracking)
// - catalog.rs: serde rule definitions and the built-in domain catalog
// - proximity.rs: two-token pass for identifiers broken across lines

pub mod catalog;
pub mod engine;
pub mod proximity;

pub use catalog::{default_rules, ConstraintSpec, PredicateSpec, RuleSpec, CATALOG_VERSION};
pub use engine::{Constraint, PatternEngine, Quantifier, Rule, RuleMatch, TokenPredicate};
pub use proximity::{default_proximity_rules, ProximityRule, ProximitySpec};
