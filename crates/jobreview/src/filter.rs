//! Category filter: decides which records are visible.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::category::{Category, UNCATEGORIZED};
use crate::record::JobRecord;
use crate::store::RecordStore;

/// Per-category visibility toggles, including the derived `uncategorized`
/// bucket. Serializes to the `{"good": true, ...}` shape the job service
/// expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterState {
    #[serde(default = "enabled")]
    pub good: bool,
    #[serde(default = "enabled")]
    pub maybe: bool,
    #[serde(default = "enabled")]
    pub bad: bool,
    #[serde(default = "enabled")]
    pub irrelevant: bool,
    #[serde(default = "enabled")]
    pub uncategorized: bool,
}

fn enabled() -> bool {
    true
}

impl Default for FilterState {
    fn default() -> Self {
        Self::all(true)
    }
}

impl FilterState {
    /// Every key set to `value`.
    pub fn all(value: bool) -> Self {
        Self {
            good: value,
            maybe: value,
            bad: value,
            irrelevant: value,
            uncategorized: value,
        }
    }

    /// All filter keys, categories first in rank order.
    pub fn keys() -> [&'static str; 5] {
        [
            Category::Good.key(),
            Category::Maybe.key(),
            Category::Bad.key(),
            Category::Irrelevant.key(),
            UNCATEGORIZED,
        ]
    }

    fn slot(&mut self, key: &str) -> Option<&mut bool> {
        match key {
            "good" => Some(&mut self.good),
            "maybe" => Some(&mut self.maybe),
            "bad" => Some(&mut self.bad),
            "irrelevant" => Some(&mut self.irrelevant),
            UNCATEGORIZED => Some(&mut self.uncategorized),
            _ => None,
        }
    }

    /// Looks up a lowercase key. Unknown keys yield `None`.
    pub fn get(&self, key: &str) -> Option<bool> {
        match key {
            "good" => Some(self.good),
            "maybe" => Some(self.maybe),
            "bad" => Some(self.bad),
            "irrelevant" => Some(self.irrelevant),
            UNCATEGORIZED => Some(self.uncategorized),
            _ => None,
        }
    }

    pub fn is_enabled(&self, category: Category) -> bool {
        self.get(category.key()).unwrap_or(false)
    }

    /// Sets a key. Returns false if the key is unknown.
    pub fn set(&mut self, key: &str, value: bool) -> bool {
        match self.slot(key) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Flips a key. Returns the new value, or `None` if the key is unknown.
    pub fn toggle(&mut self, key: &str) -> Option<bool> {
        let slot = self.slot(key)?;
        *slot = !*slot;
        Some(*slot)
    }

    /// Enabled keys in canonical order.
    pub fn enabled_keys(&self) -> Vec<&'static str> {
        Self::keys()
            .into_iter()
            .filter(|key| self.get(key).unwrap_or(false))
            .collect()
    }

    /// Comma-joined enabled keys, as sent in the `filter` query parameter.
    pub fn query_param(&self) -> String {
        self.enabled_keys().join(",")
    }
}

/// Filter key for a record: its lowercased label, or `uncategorized` when
/// the label is empty or absent.
pub fn filter_key(record: &JobRecord) -> String {
    match record.label.as_deref().map(str::trim) {
        Some(label) if !label.is_empty() => label.to_lowercase(),
        _ => UNCATEGORIZED.to_string(),
    }
}

/// Decides whether a record is visible under `state`.
///
/// Pure in `(record.label, state)`. A label that matches no known key hides
/// the record.
pub fn is_visible(record: &JobRecord, state: &FilterState) -> bool {
    // JobId cannot be blank, so every record reaching here has an id.
    state.get(&filter_key(record)).unwrap_or(false)
}

/// Visible records of a snapshot, in store order.
pub fn visible_records(store: &RecordStore, state: &FilterState) -> Vec<Arc<JobRecord>> {
    store
        .iter()
        .filter(|record| is_visible(record, state))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::JobId;

    fn labelled(label: Option<&str>) -> JobRecord {
        let mut record = JobRecord::new(JobId::new("r1").unwrap());
        record.label = label.map(str::to_string);
        record
    }

    fn good_only() -> FilterState {
        FilterState {
            good: true,
            maybe: false,
            bad: false,
            irrelevant: false,
            uncategorized: false,
        }
    }

    #[test]
    fn test_empty_label_uses_uncategorized() {
        let mut state = good_only();
        assert!(!is_visible(&labelled(Some("")), &state));
        assert!(!is_visible(&labelled(None), &state));

        state.uncategorized = true;
        assert!(is_visible(&labelled(Some("")), &state));
        assert!(is_visible(&labelled(None), &state));
    }

    #[test]
    fn test_label_lookup_is_case_insensitive() {
        let state = good_only();
        assert!(is_visible(&labelled(Some("Good")), &state));
        assert!(is_visible(&labelled(Some("GOOD")), &state));
        assert!(!is_visible(&labelled(Some("Bad")), &state));
    }

    #[test]
    fn test_unknown_label_is_hidden() {
        let state = FilterState::all(true);
        assert!(!is_visible(&labelled(Some("Corrupted")), &state));
    }

    #[test]
    fn test_stored_uncategorized_label_maps_to_bucket() {
        let mut state = FilterState::all(false);
        state.uncategorized = true;
        assert!(is_visible(&labelled(Some("Uncategorized")), &state));
    }

    #[test]
    fn test_toggle_and_set() {
        let mut state = FilterState::default();
        assert_eq!(state.toggle("maybe"), Some(false));
        assert_eq!(state.toggle("maybe"), Some(true));
        assert_eq!(state.toggle("nope"), None);
        assert!(state.set("bad", false));
        assert!(!state.set("nope", false));
        assert!(!state.is_enabled(Category::Bad));
    }

    #[test]
    fn test_query_param_lists_enabled_keys_in_order() {
        let mut state = FilterState::default();
        state.bad = false;
        assert_eq!(state.query_param(), "good,maybe,irrelevant,uncategorized");
        assert_eq!(FilterState::all(false).query_param(), "");
    }

    #[test]
    fn test_serializes_as_class_filter_map() {
        let json = serde_json::to_value(good_only()).unwrap();
        assert_eq!(json["good"], true);
        assert_eq!(json["uncategorized"], false);

        let parsed: FilterState = serde_json::from_str(r#"{"good": false}"#).unwrap();
        assert!(!parsed.good);
        assert!(parsed.maybe);
    }
}
