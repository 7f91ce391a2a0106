//! The aggregation engine — cross-references the clients and actions
//! collections into a per-client, permission-filtered view.
//!
//! Pure transform: no I/O, deterministic for identical inputs. An action is
//! attributed to a client iff the action's `code` contains the client's id
//! as a substring; no foreign key exists upstream.

use serde::Serialize;

use crate::auth::Claims;
use crate::mgmt::{Action, ActionGroups, ClientRecord};
use crate::{Error, Result};

/// Permission that controls trigger-field exposure.
pub const READ_TRIGGERS: &str = "read:triggers";

/// Placeholder text for clients with no matching actions.
const NO_ACTIONS_MESSAGE: &str = "This application has no associated actions.";

/// One entry in a client's action list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ActionSummary {
    /// An action whose code references the client.
    Matched {
        /// Action identifier.
        id: String,
        /// Action display name.
        name: String,
        /// First supported-trigger id; omitted from the JSON when the
        /// caller lacks `read:triggers`.
        #[serde(skip_serializing_if = "Option::is_none")]
        trigger: Option<String>,
    },
    /// Placeholder entry for a client with no matching actions.
    Placeholder {
        /// Human-readable explanation.
        message: String,
    },
}

/// A client joined with the actions that reference it.
///
/// Created fresh per request and dropped once serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientView {
    /// Client display name.
    pub name: String,
    /// Client identifier.
    pub id: String,
    /// Matched actions, or the single placeholder entry.
    pub actions: Vec<ActionSummary>,
}

/// Build one view per client, preserving client order, attributing each
/// action whose `code` contains the client's id. Trigger exposure is gated
/// on the caller's `read:triggers` permission.
///
/// # Errors
///
/// Returns [`Error::DataShape`] for a client with an empty id (it would
/// vacuously match every action) or a matched action with no trigger
/// bindings when triggers are to be exposed.
pub fn build_client_views(
    clients: &[ClientRecord],
    actions: &ActionGroups,
    claims: &Claims,
) -> Result<Vec<ClientView>> {
    let flattened: Vec<&Action> = actions.flatten().collect();
    let triggers_visible = claims.has_permission(READ_TRIGGERS);

    let mut views = Vec::with_capacity(clients.len());
    for client in clients {
        if client.client_id.is_empty() {
            return Err(Error::DataShape(format!(
                "client {:?} has an empty client_id",
                client.name
            )));
        }

        let matching: Vec<&Action> = flattened
            .iter()
            .copied()
            .filter(|action| action.code.contains(&client.client_id))
            .collect();

        let summaries = if matching.is_empty() {
            vec![ActionSummary::Placeholder {
                message: NO_ACTIONS_MESSAGE.to_string(),
            }]
        } else {
            matching
                .into_iter()
                .map(|action| summarize(action, triggers_visible))
                .collect::<Result<Vec<_>>>()?
        };

        views.push(ClientView {
            name: client.name.clone(),
            id: client.client_id.clone(),
            actions: summaries,
        });
    }

    Ok(views)
}

/// Summarize one matched action, exposing its first trigger binding when
/// permitted.
fn summarize(action: &Action, triggers_visible: bool) -> Result<ActionSummary> {
    let trigger = if triggers_visible {
        let binding = action.supported_triggers.first().ok_or_else(|| {
            Error::DataShape(format!("action {} has no supported triggers", action.id))
        })?;
        Some(binding.id.clone())
    } else {
        None
    };

    Ok(ActionSummary::Matched {
        id: action.id.clone(),
        name: action.name.clone(),
        trigger,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::mgmt::TriggerBinding;

    fn client(id: &str, name: &str) -> ClientRecord {
        ClientRecord {
            client_id: id.to_string(),
            name: name.to_string(),
        }
    }

    fn action(id: &str, name: &str, code: &str, triggers: &[&str]) -> Action {
        Action {
            id: id.to_string(),
            name: name.to_string(),
            code: code.to_string(),
            supported_triggers: triggers
                .iter()
                .map(|t| TriggerBinding { id: (*t).to_string() })
                .collect(),
        }
    }

    fn groups(entries: Vec<(&str, Vec<Action>)>) -> ActionGroups {
        ActionGroups(
            entries
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect::<BTreeMap<_, _>>(),
        )
    }

    fn claims(permissions: &[&str]) -> Claims {
        Claims {
            sub: "user|test".to_string(),
            permissions: permissions.iter().map(ToString::to_string).collect(),
        }
    }

    #[test]
    fn matches_by_code_substring_with_triggers_exposed() {
        let clients = vec![client("c1", "App One"), client("c2", "App Two")];
        let actions = groups(vec![(
            "post-login",
            vec![
                action("a1", "Log", "exports.onExecute = () => { /* c1 */ }", &["post-login"]),
                action("a2", "Tag", "// touches c2 only", &["post-login"]),
            ],
        )]);

        let views =
            build_client_views(&clients, &actions, &claims(&["read:triggers"])).unwrap();

        assert_eq!(views.len(), 2);
        assert_eq!(
            views[0].actions,
            vec![ActionSummary::Matched {
                id: "a1".to_string(),
                name: "Log".to_string(),
                trigger: Some("post-login".to_string()),
            }]
        );
        assert_eq!(
            views[1].actions,
            vec![ActionSummary::Matched {
                id: "a2".to_string(),
                name: "Tag".to_string(),
                trigger: Some("post-login".to_string()),
            }]
        );
    }

    #[test]
    fn every_client_is_represented() {
        // All input clients survive, in input order, even the last one.
        let clients = vec![
            client("c1", "First"),
            client("c2", "Middle"),
            client("c3", "Last"),
        ];
        let actions = groups(vec![]);

        let views = build_client_views(&clients, &actions, &claims(&[])).unwrap();

        let ids: Vec<&str> = views.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, ["c1", "c2", "c3"]);
    }

    #[test]
    fn unmatched_client_gets_single_placeholder() {
        let clients = vec![client("c9", "Lonely")];
        let actions = groups(vec![(
            "post-login",
            vec![action("a1", "Log", "nothing relevant", &["post-login"])],
        )]);

        let views = build_client_views(&clients, &actions, &claims(&["read:triggers"])).unwrap();

        assert_eq!(
            views[0].actions,
            vec![ActionSummary::Placeholder {
                message: "This application has no associated actions.".to_string(),
            }]
        );
    }

    #[test]
    fn matched_client_gets_no_placeholder() {
        // Exactly one summary per matching action; the placeholder never
        // rides along with real matches.
        let clients = vec![client("c1", "App")];
        let actions = groups(vec![(
            "post-login",
            vec![action("a1", "Log", "c1", &["post-login"])],
        )]);

        let views = build_client_views(&clients, &actions, &claims(&["read:triggers"])).unwrap();

        assert_eq!(views[0].actions.len(), 1);
        assert!(matches!(
            views[0].actions[0],
            ActionSummary::Matched { .. }
        ));
    }

    #[test]
    fn without_read_triggers_summaries_omit_trigger() {
        let clients = vec![client("c1", "App")];
        let actions = groups(vec![(
            "post-login",
            vec![action("a1", "Log", "c1", &["post-login"])],
        )]);

        let views = build_client_views(&clients, &actions, &claims(&[])).unwrap();

        assert_eq!(
            views[0].actions,
            vec![ActionSummary::Matched {
                id: "a1".to_string(),
                name: "Log".to_string(),
                trigger: None,
            }]
        );

        // The trigger key must not appear in the serialized form.
        let json = serde_json::to_value(&views).unwrap();
        assert_eq!(
            json[0]["actions"][0],
            serde_json::json!({"id": "a1", "name": "Log"})
        );
    }

    #[test]
    fn flattening_concatenates_groups_in_map_order() {
        let clients = vec![client("c1", "App")];
        // Keys sort as "a-group" < "b-group" regardless of insertion order.
        let actions = groups(vec![
            ("b-group", vec![action("a2", "Second", "c1", &["t2"])]),
            ("a-group", vec![action("a1", "First", "c1", &["t1"])]),
        ]);

        let views = build_client_views(&clients, &actions, &claims(&["read:triggers"])).unwrap();

        let ids: Vec<String> = views[0]
            .actions
            .iter()
            .map(|summary| match summary {
                ActionSummary::Matched { id, .. } => id.clone(),
                ActionSummary::Placeholder { .. } => panic!("unexpected placeholder"),
            })
            .collect();
        assert_eq!(ids, ["a1", "a2"]);
    }

    #[test]
    fn one_action_can_match_many_clients() {
        let clients = vec![client("c1", "One"), client("c11", "Eleven")];
        // "c11" contains "c1", so this action matches both clients.
        let actions = groups(vec![(
            "post-login",
            vec![action("a1", "Shared", "refs c11 here", &["post-login"])],
        )]);

        let views = build_client_views(&clients, &actions, &claims(&[])).unwrap();

        assert_eq!(views[0].actions.len(), 1);
        assert_eq!(views[1].actions.len(), 1);
        assert!(matches!(views[0].actions[0], ActionSummary::Matched { .. }));
    }

    #[test]
    fn empty_client_id_is_a_data_shape_error() {
        let clients = vec![client("", "Broken")];
        let actions = groups(vec![]);

        let err = build_client_views(&clients, &actions, &claims(&[])).unwrap_err();
        assert!(matches!(err, Error::DataShape(_)));
    }

    #[test]
    fn missing_trigger_binding_is_a_data_shape_error_when_exposed() {
        let clients = vec![client("c1", "App")];
        let actions = groups(vec![("post-login", vec![action("a1", "Log", "c1", &[])])]);

        let err =
            build_client_views(&clients, &actions, &claims(&["read:triggers"])).unwrap_err();
        assert!(matches!(err, Error::DataShape(_)));

        // Without the permission the binding is never read, so no error.
        let views = build_client_views(&clients, &actions, &claims(&[])).unwrap();
        assert_eq!(views[0].actions.len(), 1);
    }

    #[test]
    fn identical_inputs_produce_identical_views() {
        let clients = vec![client("c1", "App"), client("c2", "Other")];
        let actions = groups(vec![
            ("a-group", vec![action("a1", "One", "c1 c2", &["t1"])]),
            ("b-group", vec![action("a2", "Two", "c2", &["t2"])]),
        ]);
        let perms = claims(&["read:triggers"]);

        let first = build_client_views(&clients, &actions, &perms).unwrap();
        let second = build_client_views(&clients, &actions, &perms).unwrap();
        assert_eq!(first, second);
    }
}
