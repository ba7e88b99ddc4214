use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Identifier of a movable entity (task or project). Unique across the
/// whole collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub String);

/// Identifier of a container (board section, list section, portfolio list).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContainerId(pub String);

macro_rules! string_id {
    ($name:ident) => {
        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                $name(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                $name(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                $name(s)
            }
        }
    };
}

string_id!(ItemId);
string_id!(ContainerId);

/// A lightweight reference to a movable entity as it sits in a container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRef {
    pub id: ItemId,
    /// Owning container, denormalized on the item
    pub container_id: ContainerId,
    /// Position within the owning container (0-indexed)
    #[serde(default)]
    pub order: usize,
    /// Display title
    #[serde(default)]
    pub title: String,
    /// Attached domain fields (assignee, due date, ...). Carried through
    /// moves untouched.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub fields: IndexMap<String, serde_json::Value>,
}

impl ItemRef {
    /// Create an item with no attached fields. `order` is assigned when the
    /// item is placed in a container.
    pub fn new(id: impl Into<ItemId>, container_id: impl Into<ContainerId>, title: impl Into<String>) -> Self {
        ItemRef {
            id: id.into(),
            container_id: container_id.into(),
            order: 0,
            title: title.into(),
            fields: IndexMap::new(),
        }
    }

    /// Builder-style helper for attaching a domain field.
    pub fn with_field(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.fields.insert(key.into(), value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_ids_serialize_as_plain_strings() {
        let item = ItemRef::new("T-1", "todo", "Write docs");
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["id"], "T-1");
        assert_eq!(json["container_id"], "todo");
        assert!(json.get("fields").is_none());
    }

    #[test]
    fn test_fields_keep_insertion_order() {
        let item = ItemRef::new("T-1", "todo", "Write docs")
            .with_field("zeta", serde_json::json!(1))
            .with_field("assignee", serde_json::json!("sam"));
        let keys: Vec<&str> = item.fields.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["zeta", "assignee"]);

        let back: ItemRef = serde_json::from_str(&serde_json::to_string(&item).unwrap()).unwrap();
        assert_eq!(back, item);
    }

    #[test]
    fn test_missing_order_defaults_to_zero() {
        let item: ItemRef =
            serde_json::from_str(r#"{"id":"P-9","container_id":"q3"}"#).unwrap();
        assert_eq!(item.order, 0);
        assert_eq!(item.title, "");
        assert_eq!(item.container_id, ContainerId::new("q3"));
    }
}
