// ABOUTME: Parsing of parameter overrides and tags given on the command line.
// ABOUTME: Parameters accept Key=Value pairs, inline JSON, or a path to a JSON file.

use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::provider::{Parameter, Tag};

/// The provider's own parameter file shape.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ParameterEntry {
    parameter_key: String,
    #[serde(default)]
    parameter_value: Option<String>,
    #[serde(default)]
    use_previous_value: bool,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ParameterDocument {
    List(Vec<ParameterEntry>),
    Map(indexmap::IndexMap<String, String>),
}

/// Parse every `--parameter-overrides` value, in order.
///
/// Each value is a path to a JSON file if such a file exists, inline JSON
/// if it starts with `[` or `{`, and otherwise a list of `Key=Value` pairs
/// separated by whitespace.
pub fn parse_parameter_overrides(values: &[String]) -> Result<Vec<Parameter>> {
    let mut parameters = Vec::new();
    for value in values {
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        let path = Path::new(value);
        if path.is_file() {
            let content = std::fs::read_to_string(path)?;
            parameters.extend(parse_parameter_json(&content)?);
        } else if value.starts_with('[') || value.starts_with('{') {
            parameters.extend(parse_parameter_json(value)?);
        } else {
            for pair in value.split_whitespace() {
                let (key, val) = split_pair(pair)?;
                parameters.push(Parameter::new(key, val));
            }
        }
    }
    Ok(parameters)
}

/// `[{"ParameterKey": ..., "ParameterValue": ...}]` or `{"Key": "Value"}`.
pub fn parse_parameter_json(content: &str) -> Result<Vec<Parameter>> {
    let document: ParameterDocument = serde_json::from_str(content)?;
    match document {
        ParameterDocument::List(entries) => entries
            .into_iter()
            .map(|entry| match (entry.parameter_value, entry.use_previous_value) {
                (_, true) => Ok(Parameter::use_previous(entry.parameter_key)),
                (Some(value), false) => Ok(Parameter::new(entry.parameter_key, value)),
                (None, false) => Err(Error::InvalidArgument(format!(
                    "parameter {} has neither ParameterValue nor UsePreviousValue",
                    entry.parameter_key
                ))),
            })
            .collect(),
        ParameterDocument::Map(map) => Ok(map
            .into_iter()
            .map(|(key, value)| Parameter::new(key, value))
            .collect()),
    }
}

/// Parse one `Key=Value` tag.
pub fn parse_tag(value: &str) -> Result<Tag> {
    let (key, val) = split_pair(value)?;
    Ok(Tag::new(key, val))
}

/// `base` with every key in `overrides` replaced or appended, in order.
pub fn overlay_parameters(base: Vec<Parameter>, overrides: Vec<Parameter>) -> Vec<Parameter> {
    let mut merged = base;
    for parameter in overrides {
        match merged.iter_mut().find(|p| p.key == parameter.key) {
            Some(existing) => *existing = parameter,
            None => merged.push(parameter),
        }
    }
    merged
}

/// `base` with every key in `overrides` replaced or appended, in order.
pub fn overlay_tags(base: Vec<Tag>, overrides: Vec<Tag>) -> Vec<Tag> {
    let mut merged = base;
    for tag in overrides {
        match merged.iter_mut().find(|t| t.key == tag.key) {
            Some(existing) => *existing = tag,
            None => merged.push(tag),
        }
    }
    merged
}

fn split_pair(pair: &str) -> Result<(&str, &str)> {
    match pair.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key, value)),
        _ => Err(Error::InvalidArgument(format!(
            "expected KEY=VALUE, got '{pair}'"
        ))),
    }
}
