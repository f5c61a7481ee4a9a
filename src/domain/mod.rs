//! Domain layer - relay authorization rules and the collaborators they need

pub mod cache;
pub mod instruction;
pub mod ledger;
pub mod validation;
