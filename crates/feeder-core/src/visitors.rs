// ── Unwelcome visitor filter ──
//
// An ordered set of species switches. The device is sent the names of the
// enabled switches; it uses them to decide which visitors to scare off.

use indexmap::IndexMap;
use serde::Serialize;

use crate::error::CoreError;

/// One switch as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VisitorToggle {
    pub name: String,
    pub enabled: bool,
}

/// Ordered name -> enabled map, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnwelcomeVisitors {
    entries: IndexMap<String, bool>,
}

impl UnwelcomeVisitors {
    /// All `names` enabled, in the given order.
    pub fn with_defaults<S: AsRef<str>>(names: &[S]) -> Self {
        Self {
            entries: names
                .iter()
                .map(|n| (normalize(n.as_ref()), true))
                .collect(),
        }
    }

    /// Flip one switch and return the enabled list computed after the flip.
    pub fn toggle(&mut self, name: &str) -> Result<Vec<String>, CoreError> {
        let key = normalize(name);
        let enabled = self
            .entries
            .get_mut(&key)
            .ok_or_else(|| CoreError::UnknownVisitor { name: key.clone() })?;
        *enabled = !*enabled;
        Ok(self.enabled())
    }

    /// Enable exactly `names`; unknown names are appended.
    pub fn set_enabled<S: AsRef<str>>(&mut self, names: &[S]) -> Vec<String> {
        let wanted: Vec<String> = names.iter().map(|n| normalize(n.as_ref())).collect();
        for (name, enabled) in &mut self.entries {
            *enabled = wanted.contains(name);
        }
        for name in wanted {
            self.entries.entry(name).or_insert(true);
        }
        self.enabled()
    }

    /// Adopt the list the device reports.
    pub fn load(&mut self, reported: &[String]) {
        self.set_enabled(reported);
    }

    /// Names currently enabled, in switch order.
    pub fn enabled(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(_, on)| **on)
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn is_enabled(&self, name: &str) -> Option<bool> {
        self.entries.get(&normalize(name)).copied()
    }

    pub fn toggles(&self) -> Vec<VisitorToggle> {
        self.entries
            .iter()
            .map(|(name, enabled)| VisitorToggle {
                name: name.clone(),
                enabled: *enabled,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> UnwelcomeVisitors {
        UnwelcomeVisitors::with_defaults(&["bear", "cat", "dog"])
    }

    #[test]
    fn defaults_are_all_enabled_in_order() {
        assert_eq!(defaults().enabled(), ["bear", "cat", "dog"]);
    }

    #[test]
    fn toggle_reports_post_toggle_state() {
        let mut visitors = defaults();
        assert_eq!(visitors.toggle("cat").expect("known"), ["bear", "dog"]);
        assert_eq!(visitors.toggle("Cat").expect("known"), ["bear", "cat", "dog"]);
    }

    #[test]
    fn toggle_unknown_name_is_an_error() {
        let mut visitors = defaults();
        assert!(matches!(
            visitors.toggle("squirrel"),
            Err(CoreError::UnknownVisitor { name }) if name == "squirrel"
        ));
        assert_eq!(visitors.enabled(), ["bear", "cat", "dog"]);
    }

    #[test]
    fn load_merges_reported_list() {
        let mut visitors = defaults();
        visitors.load(&["dog".to_owned(), "squirrel".to_owned()]);

        assert_eq!(visitors.enabled(), ["dog", "squirrel"]);
        assert_eq!(visitors.is_enabled("bear"), Some(false));
        assert_eq!(visitors.len(), 4);
    }

    #[test]
    fn set_enabled_with_empty_list_disables_everything() {
        let mut visitors = defaults();
        let names: [&str; 0] = [];
        assert!(visitors.set_enabled(&names).is_empty());
        assert_eq!(visitors.toggles().len(), 3);
    }
}
