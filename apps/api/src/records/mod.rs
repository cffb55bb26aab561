//! Career record storage: the thin collaborator the QA core reads from.

pub mod handlers;
pub mod store;
