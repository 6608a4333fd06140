//! What reconciliation is fed: a full record at startup, change batches
//! afterwards.

use serde_json::Value;

use crate::storage::{PreferenceChange, PreferenceRecord};

/// Input to one reconcile pass.
#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileItems {
    Record(PreferenceRecord),
    Change(PreferenceChange),
}

/// What a stored value asks of a feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Desired {
    Enable,
    Disable,
    /// Anything that is not a boolean.
    Ignore,
}

impl Desired {
    fn of(value: Option<&Value>) -> Self {
        match value {
            Some(Value::Bool(true)) => Self::Enable,
            Some(Value::Bool(false)) => Self::Disable,
            _ => Self::Ignore,
        }
    }
}

impl ReconcileItems {
    /// Each key with the state it asks for.
    ///
    /// A record value that is itself an object is read through its
    /// `newValue`, so change-shaped records reconcile the same way.
    pub fn entries(&self) -> Vec<(&str, Desired)> {
        match self {
            Self::Record(record) => record
                .iter()
                .map(|(key, value)| {
                    let value = match value {
                        Value::Object(map) => map.get("newValue"),
                        other => Some(other),
                    };
                    (key.as_str(), Desired::of(value))
                })
                .collect(),
            Self::Change(change) => change
                .iter()
                .map(|(key, change)| (key.as_str(), Desired::of(change.new_value.as_ref())))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::ValueChange;
    use serde_json::json;

    #[test]
    fn test_record_entries() {
        let record: PreferenceRecord = [
            ("a".to_string(), json!(true)),
            ("b".to_string(), json!(false)),
            ("c".to_string(), json!("yes")),
            ("d".to_string(), json!({"newValue": true})),
        ]
        .into_iter()
        .collect();

        assert_eq!(
            ReconcileItems::Record(record).entries(),
            vec![
                ("a", Desired::Enable),
                ("b", Desired::Disable),
                ("c", Desired::Ignore),
                ("d", Desired::Enable),
            ]
        );
    }

    #[test]
    fn test_change_entries() {
        let mut change = PreferenceChange::new();
        change.insert(
            "on".to_string(),
            ValueChange {
                old_value: Some(json!(false)),
                new_value: Some(json!(true)),
            },
        );
        change.insert(
            "removed".to_string(),
            ValueChange {
                old_value: Some(json!(true)),
                new_value: None,
            },
        );

        assert_eq!(
            ReconcileItems::Change(change).entries(),
            vec![("on", Desired::Enable), ("removed", Desired::Ignore)]
        );
    }
}
