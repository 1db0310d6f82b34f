use {
    serde::{Deserialize, Serialize},
    std::collections::{HashMap, HashSet},
    thiserror::Error,
};

/// Declarative description of how a lead turns into one buyer's payload.
/// Stored as JSON and edited through the admin layer, so it is validated
/// at save/load time rather than trusted at use time.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct FieldMappingConfig {
    /// Schema version of this config. Bumped when the mapping semantics
    /// change in a way old configs cannot express.
    #[serde(default = "default_version")]
    pub version: u32,
    pub mappings: Vec<FieldMapping>,
    /// Constant fields merged into every payload last; they win over any
    /// computed field with the same target name.
    #[serde(default)]
    pub static_fields: serde_json::Map<String, serde_json::Value>,
}

fn default_version() -> u32 {
    1
}

/// One rule translating a lead attribute into a buyer-expected field.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct FieldMapping {
    /// Dot path into the lead attributes, e.g. `form_data.window_type`.
    pub source_field: String,
    pub target_field: String,
    /// Name of a pure transform function applied to the value, looked up
    /// in the engine's transform registry.
    pub transform: Option<String>,
    /// String-to-string lookup applied before `transform`; unmatched
    /// values pass through unchanged.
    pub value_map: Option<HashMap<String, String>>,
    #[serde(default)]
    pub required: bool,
    pub default_value: Option<serde_json::Value>,
    /// Position of the field in the rendered payload. Cosmetic: it makes
    /// stored payloads diffable for operators, nothing more.
    #[serde(default)]
    pub order: i32,
    #[serde(default = "default_true")]
    pub include_in_ping: bool,
    #[serde(default = "default_true")]
    pub include_in_post: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Error, Eq, PartialEq)]
pub enum MappingConfigError {
    #[error("mapping {index}: source_field is empty")]
    EmptySource { index: usize },
    #[error("mapping {index}: target_field is empty")]
    EmptyTarget { index: usize },
    #[error("target field {target:?} mapped more than once")]
    DuplicateTarget { target: String },
    #[error("mapping for {target:?} references unknown transform {transform:?}")]
    UnknownTransform { target: String, transform: String },
}

impl FieldMappingConfig {
    /// Checks the config against the engine's transform registry. Run when
    /// the admin layer saves a config and again when the engine loads its
    /// registry snapshot, so a malformed config never reaches an auction.
    pub fn validate(
        &self,
        known_transform: impl Fn(&str) -> bool,
    ) -> Result<(), MappingConfigError> {
        let mut targets = HashSet::new();
        for (index, mapping) in self.mappings.iter().enumerate() {
            if mapping.source_field.is_empty() {
                return Err(MappingConfigError::EmptySource { index });
            }
            if mapping.target_field.is_empty() {
                return Err(MappingConfigError::EmptyTarget { index });
            }
            if !targets.insert(mapping.target_field.as_str()) {
                return Err(MappingConfigError::DuplicateTarget {
                    target: mapping.target_field.clone(),
                });
            }
            if let Some(transform) = &mapping.transform {
                if !known_transform(transform) {
                    return Err(MappingConfigError::UnknownTransform {
                        target: mapping.target_field.clone(),
                        transform: transform.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Advisory findings surfaced to admins at save time. A required field
    /// without a default is legitimate (it deliberately excludes buyers
    /// from leads missing the field) but worth flagging.
    pub fn warnings(&self) -> Vec<String> {
        self.mappings
            .iter()
            .filter(|mapping| mapping.required && mapping.default_value.is_none())
            .map(|mapping| {
                format!(
                    "required field {:?} has no default; leads missing {:?} will skip this buyer",
                    mapping.target_field, mapping.source_field
                )
            })
            .collect()
    }
}
