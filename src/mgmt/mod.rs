//! Management API integration — the service-credential broker and the
//! collection fetchers the aggregation pipeline depends on.

mod client;
mod types;

pub use client::{HttpManagementApi, ManagementApi};
pub use types::{Action, ActionGroups, ClientRecord, TriggerBinding};
