//! Wire types for the management API collections.
//!
//! Both collections are upstream-owned and fetched fresh per request; they
//! are treated as read-only snapshots.

use std::collections::BTreeMap;

use serde::Deserialize;

/// A registered application in the upstream tenant.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientRecord {
    /// Client identifier.
    pub client_id: String,
    /// Display name.
    pub name: String,
}

/// A trigger an action is bound to. Unknown fields are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct TriggerBinding {
    /// Trigger identifier, e.g. `post-login`.
    pub id: String,
}

/// A deployed action.
#[derive(Debug, Clone, Deserialize)]
pub struct Action {
    /// Action identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Implementation source. The only linkage between actions and clients
    /// is a substring match of a client id against this field.
    #[serde(default)]
    pub code: String,
    /// Triggers the action runs on, in upstream order.
    #[serde(default)]
    pub supported_triggers: Vec<TriggerBinding>,
}

/// The actions collection as served upstream: a grouping keyed by trigger
/// type, each value an ordered sequence of actions.
///
/// The map's own iteration order (sorted keys) defines flattening order,
/// which keeps aggregation deterministic across identical requests.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct ActionGroups(pub BTreeMap<String, Vec<Action>>);

impl ActionGroups {
    /// Flatten the grouping into one sequence: each group's actions in their
    /// own order, groups concatenated in the map's iteration order.
    pub fn flatten(&self) -> impl Iterator<Item = &Action> {
        self.0.values().flatten()
    }
}
