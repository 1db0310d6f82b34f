//! Pure transformation of lead data into a buyer-specific payload, driven
//! by the buyer's declarative [`FieldMappingConfig`].

pub mod transforms;

use {
    model::mapping::{FieldMapping, FieldMappingConfig},
    serde_json::Value,
    thiserror::Error,
};

/// Rendered payload object. Field order follows the mappings' `order` so
/// stored payloads stay diffable for operators.
pub type Payload = serde_json::Map<String, Value>;

/// Which call the payload is built for. Each mapping opts into either or
/// both phases.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Phase {
    Ping,
    Post,
}

/// A required field that could not be resolved from the lead.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("required field {target_field:?} could not be resolved from {source_field:?}")]
pub struct TransformError {
    pub source_field: String,
    pub target_field: String,
}

pub struct Mapped {
    pub payload: Payload,
    pub errors: Vec<TransformError>,
}

impl Mapped {
    /// Whether the payload is complete enough to send. Callers must not
    /// deliver a payload missing contractually required fields.
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Builds the payload for one buyer and phase. Per mapping: resolve the
/// source dot-path, substitute through `value_map`, apply the named
/// transform, then fall back to the default when the result is empty.
/// Static fields are merged last and win over computed fields.
pub fn build_payload(config: &FieldMappingConfig, attributes: &Value, phase: Phase) -> Mapped {
    let mut mappings: Vec<&FieldMapping> = config
        .mappings
        .iter()
        .filter(|mapping| match phase {
            Phase::Ping => mapping.include_in_ping,
            Phase::Post => mapping.include_in_post,
        })
        .collect();
    mappings.sort_by_key(|mapping| mapping.order);

    let mut payload = Payload::new();
    let mut errors = Vec::new();
    for mapping in mappings {
        let resolved = resolve_path(attributes, &mapping.source_field)
            .map(|value| apply_rules(mapping, value));
        let value = match resolved {
            Some(value) if !is_empty(&value) => value,
            _ => match &mapping.default_value {
                Some(default) => default.clone(),
                None if mapping.required => {
                    errors.push(TransformError {
                        source_field: mapping.source_field.clone(),
                        target_field: mapping.target_field.clone(),
                    });
                    continue;
                }
                None => continue,
            },
        };
        payload.insert(mapping.target_field.clone(), value);
    }

    for (target, value) in &config.static_fields {
        payload.insert(target.clone(), value.clone());
    }

    Mapped { payload, errors }
}

fn apply_rules(mapping: &FieldMapping, value: &Value) -> Value {
    let remapped = match (&mapping.value_map, value_key(value)) {
        (Some(map), Some(key)) => match map.get(&key) {
            Some(mapped) => Value::String(mapped.clone()),
            None => value.clone(),
        },
        _ => value.clone(),
    };
    match mapping.transform.as_deref().and_then(transforms::lookup) {
        Some(transform) => transform(&remapped),
        None => remapped,
    }
}

/// Dot-path lookup into the lead attributes, e.g. `form_data.window_type`.
fn resolve_path<'a>(attributes: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(attributes, |value, key| value.get(key))
}

/// The key a scalar contributes to a `value_map` lookup.
fn value_key(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}
