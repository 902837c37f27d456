//! Typed data model for type-description templates
//!
//! A model is a named list of type records, loaded from TOML or JSON:
//!
//! ```toml
//! name = "game"
//!
//! [[types]]
//! name = "float"
//!
//! [[types]]
//! name = "vector"
//! members = [["float", "x"], ["float", "y"]]
//! ```
//!
//! Ids are optional; [`DataModel::normalize`] assigns each record without
//! one its position in the list.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::value::{Bindings, Value};

/// Errors that can occur when loading or validating a data model
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Failed to read model file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse model TOML: {0}")]
    TomlError(#[from] toml::de::Error),
    #[error("Failed to parse model JSON: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("type '{name}' has no id")]
    MissingId { name: String },
    #[error("type id {id} is used by both '{first}' and '{second}'")]
    DuplicateId {
        id: u32,
        first: String,
        second: String,
    },
    #[error("type id {id} of '{name}' is outside 0..{count}")]
    IdOutOfRange { id: u32, name: String, count: usize },
    #[error("type '{name}' is defined more than once")]
    DuplicateName { name: String },
    #[error("member '{member}' of '{owner}' has unknown type '{member_type}'")]
    UnresolvedMemberType {
        owner: String,
        member: String,
        member_type: String,
    },
}

/// One field of a type record, written as `[type, name]`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "(String, String)")]
pub struct MemberRecord {
    pub member_type: String,
    pub member_name: String,
}

impl From<(String, String)> for MemberRecord {
    fn from((member_type, member_name): (String, String)) -> Self {
        Self {
            member_type,
            member_name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TypeRecord {
    pub name: String,
    #[serde(default)]
    pub id: Option<u32>,
    #[serde(default)]
    pub members: Vec<MemberRecord>,
    /// Defined outside the generated module
    #[serde(default, rename = "extern")]
    pub is_extern: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DataModel {
    /// Namespace of the generated code
    pub name: String,
    #[serde(default)]
    pub types: Vec<TypeRecord>,
    /// Member types accepted without a matching record
    #[serde(default)]
    pub primitives: Vec<String>,
}

impl DataModel {
    /// Load a model, choosing JSON for `.json` files and TOML otherwise
    pub fn from_file(path: &Path) -> Result<Self, ModelError> {
        let content = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json_str(&content)
        } else {
            Self::from_toml_str(&content)
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ModelError> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_json_str(content: &str) -> Result<Self, ModelError> {
        Ok(serde_json::from_str(content)?)
    }

    /// Give every record without an id its position in the list
    pub fn normalize(&mut self) {
        for (position, record) in self.types.iter_mut().enumerate() {
            if record.id.is_none() {
                record.id = u32::try_from(position).ok();
            }
        }
    }

    /// Check that ids are dense and unique and that member types resolve
    ///
    /// Rendering never calls this; generated code indexes a table by id, so
    /// callers that need that guarantee validate explicitly.
    pub fn validate(&self) -> Result<(), ModelError> {
        let count = self.types.len();
        let mut names = HashSet::new();
        let mut ids: HashMap<u32, &str> = HashMap::new();

        for record in &self.types {
            if !names.insert(record.name.as_str()) {
                return Err(ModelError::DuplicateName {
                    name: record.name.clone(),
                });
            }
            let id = record.id.ok_or_else(|| ModelError::MissingId {
                name: record.name.clone(),
            })?;
            if id as usize >= count {
                return Err(ModelError::IdOutOfRange {
                    id,
                    name: record.name.clone(),
                    count,
                });
            }
            if let Some(first) = ids.insert(id, record.name.as_str()) {
                return Err(ModelError::DuplicateId {
                    id,
                    first: first.to_string(),
                    second: record.name.clone(),
                });
            }
        }

        for record in &self.types {
            for member in &record.members {
                let known = names.contains(member.member_type.as_str())
                    || self.primitives.iter().any(|p| *p == member.member_type);
                if !known {
                    return Err(ModelError::UnresolvedMemberType {
                        owner: record.name.clone(),
                        member: member.member_name.clone(),
                        member_type: member.member_type.clone(),
                    });
                }
            }
        }

        debug!(model = %self.name, types = count, "validated data model");
        Ok(())
    }

    /// Bindings `name` and `types` for a type-description template
    pub fn to_bindings(&self) -> Bindings {
        let types = self
            .types
            .iter()
            .map(|record| {
                let members = record
                    .members
                    .iter()
                    .map(|m| {
                        Value::from(vec![m.member_type.as_str(), m.member_name.as_str()])
                    })
                    .collect::<Vec<_>>();
                let id = record.id.map_or(Value::Null, |id| Value::Int(i64::from(id)));
                Value::record([
                    ("name", Value::from(record.name.as_str())),
                    ("id", id),
                    ("extern", Value::Bool(record.is_extern)),
                    ("members", Value::Seq(members)),
                ])
            })
            .collect();

        let mut bindings = Bindings::new();
        bindings.insert("name".to_string(), Value::from(self.name.as_str()));
        bindings.insert("types".to_string(), Value::Seq(types));
        bindings
    }
}

/// Load a generic JSON or TOML document whose top-level keys become bindings
pub fn load_bindings(path: &Path) -> Result<Bindings, ModelError> {
    let content = std::fs::read_to_string(path)?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let fields: BTreeMap<String, Value> = if is_json {
        let map: serde_json::Map<String, serde_json::Value> = serde_json::from_str(&content)?;
        map.into_iter().map(|(k, v)| (k, Value::from(v))).collect()
    } else {
        let table: toml::Table = toml::from_str(&content)?;
        table.into_iter().map(|(k, v)| (k, Value::from(v))).collect()
    };
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const GAME: &str = r#"
name = "game"

[[types]]
name = "int"

[[types]]
name = "float"

[[types]]
name = "vector"
members = [["float", "x"], ["float", "y"]]
"#;

    fn game() -> DataModel {
        let mut model = DataModel::from_toml_str(GAME).expect("Should parse");
        model.normalize();
        model
    }

    #[test]
    fn test_normalize_assigns_positions() {
        let ids: Vec<_> = game().types.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![Some(0), Some(1), Some(2)]);
    }

    #[test]
    fn test_normalize_keeps_explicit_ids() {
        let mut model = DataModel::from_json_str(
            r#"{"name": "m", "types": [{"name": "a", "id": 1}, {"name": "b"}]}"#,
        )
        .expect("Should parse");
        model.normalize();
        assert_eq!(model.types[0].id, Some(1));
        assert_eq!(model.types[1].id, Some(1));
    }

    #[test]
    fn test_members_deserialize_from_pairs() {
        let model = game();
        assert_eq!(
            model.types[2].members[1],
            MemberRecord {
                member_type: "float".to_string(),
                member_name: "y".to_string(),
            }
        );
    }

    #[test]
    fn test_validate_accepts_game_model() {
        game().validate().expect("Should validate");
    }

    #[test]
    fn test_validate_rejects_duplicate_id() {
        let mut model = game();
        model.types[1].id = Some(0);
        assert!(matches!(
            model.validate(),
            Err(ModelError::DuplicateId { id: 0, .. })
        ));
    }

    #[test]
    fn test_validate_rejects_sparse_id() {
        let mut model = game();
        model.types[2].id = Some(9);
        assert!(matches!(
            model.validate(),
            Err(ModelError::IdOutOfRange { id: 9, count: 3, .. })
        ));
    }

    #[test]
    fn test_validate_rejects_unknown_member_type() {
        let mut model = game();
        model.types[2].members[0].member_type = "double".to_string();
        assert!(matches!(
            model.validate(),
            Err(ModelError::UnresolvedMemberType { member_type, .. }) if member_type == "double"
        ));
        model.primitives.push("double".to_string());
        model.validate().expect("Primitive should resolve");
    }

    #[test]
    fn test_validate_requires_ids() {
        let model = DataModel::from_toml_str(GAME).expect("Should parse");
        assert!(matches!(model.validate(), Err(ModelError::MissingId { .. })));
    }

    #[test]
    fn test_bindings_shape() {
        let bindings = game().to_bindings();
        assert_eq!(bindings.get("name"), Some(&Value::from("game")));
        let Some(Value::Seq(types)) = bindings.get("types") else {
            panic!("Expected types sequence");
        };
        assert_eq!(
            types[2],
            Value::record([
                ("name", Value::from("vector")),
                ("id", Value::Int(2)),
                ("extern", Value::Bool(false)),
                (
                    "members",
                    Value::from(vec![
                        Value::from(vec!["float", "x"]),
                        Value::from(vec!["float", "y"]),
                    ])
                ),
            ])
        );
    }
}
