//! Service cross-reference between a stack's config and its compose file
//!
//! Lenient heuristic: the check passes as soon as both
//! documents declare at least one service. Set differences and missing
//! environment keys are reported as advisory diagnostics only.

use serde_yaml::{Mapping, Value};
use std::collections::BTreeSet;

/// Top-level config keys that never name a service
pub const NON_SERVICE_KEYS: &[&str] = &[
    "stack",
    "ci_cd",
    "environment",
    "volumes",
    "secrets",
    "network",
    "networks",
    "services",
];

/// Service names declared by a stack's declarative config
///
/// Uses the keys of `services` when that mapping exists, otherwise every
/// top-level key that is not in [`NON_SERVICE_KEYS`].
#[must_use]
pub fn config_services(doc: &Value) -> BTreeSet<String> {
    if let Some(services) = doc.get("services").and_then(Value::as_mapping) {
        return mapping_keys(services);
    }

    doc.as_mapping()
        .map(|top| {
            mapping_keys(top)
                .into_iter()
                .filter(|key| !NON_SERVICE_KEYS.contains(&key.as_str()))
                .collect()
        })
        .unwrap_or_default()
}

/// Service names in a resolved compose document
#[must_use]
pub fn compose_services(doc: &Value) -> BTreeSet<String> {
    doc.get("services")
        .and_then(Value::as_mapping)
        .map(mapping_keys)
        .unwrap_or_default()
}

fn mapping_keys(mapping: &Mapping) -> BTreeSet<String> {
    mapping
        .keys()
        .filter_map(|key| match key {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .collect()
}

/// Environment variable names of a service definition, accepting both the
/// map form and the `KEY=value` list form
#[must_use]
pub fn environment_keys(service: &Value) -> BTreeSet<String> {
    match service.get("environment") {
        Some(Value::Mapping(map)) => mapping_keys(map),
        Some(Value::Sequence(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .filter_map(|item| item.split('=').next())
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(str::to_string)
            .collect(),
        _ => BTreeSet::new(),
    }
}

/// Outcome of the cross-reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Consistency {
    /// Whether both sides declared something
    pub passed: bool,
    /// Failure reason first, then advisory notes
    pub messages: Vec<String>,
}

/// Cross-references the two parsed documents
#[must_use]
pub fn cross_reference(config: &Value, compose: &Value) -> Consistency {
    let config_names = config_services(config);
    let compose_names = compose_services(compose);
    let mut messages = Vec::new();

    let passed = match (config_names.is_empty(), compose_names.is_empty()) {
        (false, false) => true,
        (true, true) => {
            messages.push("No services declared in config or compose file".to_string());
            false
        }
        (true, false) => {
            messages.push("No services declared in config file".to_string());
            false
        }
        (false, true) => {
            messages.push("No services declared in compose file".to_string());
            false
        }
    };

    let missing: Vec<_> = config_names.difference(&compose_names).cloned().collect();
    if !missing.is_empty() {
        messages.push(format!(
            "Services in config but not in compose: {}",
            missing.join(", ")
        ));
    }

    let extra: Vec<_> = compose_names.difference(&config_names).cloned().collect();
    if !extra.is_empty() && !config_names.is_empty() {
        messages.push(format!("Extra services in compose: {}", extra.join(", ")));
    }

    if let (Some(config_defs), Some(compose_defs)) = (
        config.get("services").and_then(Value::as_mapping),
        compose.get("services").and_then(Value::as_mapping),
    ) {
        for name in config_names.intersection(&compose_names) {
            let (Some(wanted), Some(actual)) = (
                config_defs.get(name.as_str()),
                compose_defs.get(name.as_str()),
            ) else {
                continue;
            };
            let have = environment_keys(actual);
            for key in environment_keys(wanted).difference(&have) {
                messages.push(format!("Missing env var {key} in {name}"));
            }
        }
    }

    Consistency { passed, messages }
}
