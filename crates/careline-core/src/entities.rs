//! The string-keyed entity/context bag used at every session boundary.
//!
//! Spec §9 calls for a typed state struct internally per workflow, with this
//! bag only at the edges (HTTP payloads, the session's persisted context).
//! Keeping it as a `BTreeMap` rather than a `HashMap` gives deterministic
//! iteration order, which keeps serialized turn snapshots stable for tests.

use std::collections::BTreeMap;

use serde_json::Value;

/// A string-keyed bag of loosely typed values.
pub type Entities = BTreeMap<String, Value>;

/// Whether a JSON value should count as "truthy" for merge purposes: present,
/// non-null, non-empty-string, non-empty-array/object.
#[must_use]
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        Value::Bool(_) | Value::Number(_) => true,
    }
}

/// Merge `incoming` into `base`, overwriting a key only when the incoming
/// value is truthy (spec §4.2: "values overwrite only when the incoming
/// value is non-empty"). Never deletes an existing key.
pub fn merge_entities(base: &mut Entities, incoming: &Entities) {
    for (key, value) in incoming {
        if is_truthy(value) {
            base.insert(key.clone(), value.clone());
        }
    }
}

/// Shallow-merge a partial state bag into an existing one, used for
/// `update_workflow_state` (spec §4.2). Unlike `merge_entities`, every key
/// present in `incoming` overwrites regardless of truthiness, matching the
/// Python original's plain `{**state, **partial}` semantics for workflow
/// state (only the caller-facing entity bag uses the truthy-only rule).
pub fn shallow_merge(base: &mut Entities, incoming: &Entities) {
    for (key, value) in incoming {
        base.insert(key.clone(), value.clone());
    }
}

/// Look up a string-valued entity across a three-tier lookup: turn entities,
/// then a collected-entities cache, then the workflow state bag (spec §4.7).
#[must_use]
pub fn lookup_str<'a>(
    turn_entities: &'a Entities,
    collected: &'a Entities,
    workflow_state: &'a Entities,
    key: &str,
) -> Option<&'a str> {
    [turn_entities, collected, workflow_state]
        .into_iter()
        .find_map(|bag| bag.get(key))
        .and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merge_overwrites_only_on_truthy_incoming() {
        let mut base: Entities = Entities::new();
        base.insert("phone".into(), json!("9876543210"));
        let mut incoming: Entities = Entities::new();
        incoming.insert("phone".into(), json!(""));
        incoming.insert("department".into(), json!("Cardiology"));
        merge_entities(&mut base, &incoming);
        assert_eq!(base.get("phone").unwrap(), &json!("9876543210"));
        assert_eq!(base.get("department").unwrap(), &json!("Cardiology"));
    }

    #[test]
    fn merge_never_deletes_existing_keys() {
        let mut base: Entities = Entities::new();
        base.insert("patient_id".into(), json!("P123456"));
        let incoming: Entities = Entities::new();
        merge_entities(&mut base, &incoming);
        assert!(base.contains_key("patient_id"));
    }

    #[test]
    fn three_tier_lookup_prefers_turn_over_collected_over_state() {
        let mut turn: Entities = Entities::new();
        let mut collected: Entities = Entities::new();
        let mut state: Entities = Entities::new();
        state.insert("department".into(), json!("General Medicine"));
        assert_eq!(
            lookup_str(&turn, &collected, &state, "department"),
            Some("General Medicine")
        );
        collected.insert("department".into(), json!("Cardiology"));
        assert_eq!(
            lookup_str(&turn, &collected, &state, "department"),
            Some("Cardiology")
        );
        turn.insert("department".into(), json!("ENT"));
        assert_eq!(lookup_str(&turn, &collected, &state, "department"), Some("ENT"));
    }
}
