//! Required-scope sets for route-level authorization.

/// An ordered set of scopes a route requires.
#[derive(Debug, Clone)]
pub struct ScopeSet {
    required: Vec<String>,
}

impl ScopeSet {
    /// Build from a list of scope names.
    pub fn new<I, S>(scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            required: scopes.into_iter().map(Into::into).collect(),
        }
    }

    /// Required scopes absent from `granted`, in required order.
    #[must_use]
    pub fn missing(&self, granted: &[String]) -> Vec<String> {
        self.required
            .iter()
            .filter(|scope| !granted.iter().any(|g| g == *scope))
            .cloned()
            .collect()
    }

    /// Whether every required scope is granted.
    #[must_use]
    pub fn satisfied_by(&self, granted: &[String]) -> bool {
        self.missing(granted).is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn granted(scopes: &[&str]) -> Vec<String> {
        scopes.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn superset_satisfies() {
        let set = ScopeSet::new(["read:actions", "read:clients"]);
        assert!(set.satisfied_by(&granted(&[
            "read:actions",
            "read:clients",
            "read:triggers"
        ])));
    }

    #[test]
    fn any_missing_scope_fails() {
        let set = ScopeSet::new(["read:actions", "read:clients", "read:triggers"]);
        assert_eq!(
            set.missing(&granted(&["read:actions", "read:clients"])),
            vec!["read:triggers".to_string()]
        );
        assert!(!set.satisfied_by(&granted(&["read:actions"])));
    }

    #[test]
    fn empty_set_is_always_satisfied() {
        let set = ScopeSet::new(Vec::<String>::new());
        assert!(set.satisfied_by(&[]));
    }
}
