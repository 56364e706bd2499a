// ABOUTME: Parsed template document with a typed resource map.
// ABOUTME: Function resources are recognised variants; everything else passes through untouched.

use std::path::Path;

use indexmap::IndexMap;
use serde_json::{Map, Value};
use snafu::ResultExt;

use super::error::{
    MarshallJsonSnafu, MarshallYamlSnafu, NotAMappingSnafu, ParseJsonSnafu, ParseYamlSnafu,
    ReadTemplateSnafu,
};
use super::tags;
use crate::package::PackageError;

const RESOURCES: &str = "Resources";
const TRANSFORM: &str = "Transform";

pub const SERVERLESS_FUNCTION: &str = "AWS::Serverless::Function";
pub const LAMBDA_FUNCTION: &str = "AWS::Lambda::Function";

/// On-disk template format, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateFormat {
    Yaml,
    Json,
}

impl TemplateFormat {
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("yaml" | "yml") => TemplateFormat::Yaml,
            _ => TemplateFormat::Json,
        }
    }
}

/// A resource whose code may live on the local filesystem.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionResource {
    body: Map<String, Value>,
}

impl FunctionResource {
    fn properties(&self) -> Option<&Map<String, Value>> {
        self.body.get("Properties").and_then(Value::as_object)
    }

    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties().and_then(|p| p.get(name))
    }

    pub fn set_property(&mut self, name: &str, value: Value) {
        let properties = self
            .body
            .entry("Properties")
            .or_insert_with(|| Value::Object(Map::new()));
        if !properties.is_object() {
            *properties = Value::Object(Map::new());
        }
        if let Value::Object(map) = properties {
            map.insert(name.to_string(), value);
        }
    }
}

/// One entry of the template's resource map.
#[derive(Debug, Clone, PartialEq)]
pub enum Resource {
    /// `AWS::Serverless::Function`; code in `CodeUri`.
    ServerlessFunction(FunctionResource),
    /// `AWS::Lambda::Function`; code in `Code`.
    LambdaFunction(FunctionResource),
    Opaque(Value),
}

impl Resource {
    pub fn from_value(value: Value) -> Self {
        let Value::Object(body) = value else {
            return Resource::Opaque(value);
        };
        match body.get("Type").and_then(Value::as_str) {
            Some(SERVERLESS_FUNCTION) => Resource::ServerlessFunction(FunctionResource { body }),
            Some(LAMBDA_FUNCTION) => Resource::LambdaFunction(FunctionResource { body }),
            _ => Resource::Opaque(Value::Object(body)),
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            Resource::ServerlessFunction(f) | Resource::LambdaFunction(f) => Value::Object(f.body),
            Resource::Opaque(value) => value,
        }
    }

    pub fn to_value(&self) -> Value {
        self.clone().into_value()
    }

    /// The property holding the function's code location, if this is a function.
    pub fn code_property(&self) -> Option<&'static str> {
        match self {
            Resource::ServerlessFunction(_) => Some("CodeUri"),
            Resource::LambdaFunction(_) => Some("Code"),
            Resource::Opaque(_) => None,
        }
    }

    pub fn as_function(&self) -> Option<&FunctionResource> {
        match self {
            Resource::ServerlessFunction(f) | Resource::LambdaFunction(f) => Some(f),
            Resource::Opaque(_) => None,
        }
    }

    pub fn as_function_mut(&mut self) -> Option<&mut FunctionResource> {
        match self {
            Resource::ServerlessFunction(f) | Resource::LambdaFunction(f) => Some(f),
            Resource::Opaque(_) => None,
        }
    }
}

/// A template document with its resources lifted out into typed variants.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    document: Map<String, Value>,
    resources: IndexMap<String, Resource>,
}

impl Template {
    /// Read and parse a template, choosing the format by extension.
    pub async fn open(path: &Path) -> Result<Self, PackageError> {
        let text = tokio::fs::read_to_string(path)
            .await
            .context(ReadTemplateSnafu { path })?;
        Self::parse(path, &text)
    }

    /// Parse template text; `path` picks the format and names errors.
    pub fn parse(path: &Path, text: &str) -> Result<Self, PackageError> {
        let value = match TemplateFormat::from_path(path) {
            TemplateFormat::Yaml => {
                let yaml: serde_yaml::Value =
                    serde_yaml::from_str(text).context(ParseYamlSnafu { path })?;
                tags::escape(yaml)
            }
            TemplateFormat::Json => serde_json::from_str(text).context(ParseJsonSnafu { path })?,
        };
        let document = match value {
            Value::Object(document) => document,
            _ => return NotAMappingSnafu { path }.fail(),
        };
        Self::from_document(path, document)
    }

    fn from_document(path: &Path, document: Map<String, Value>) -> Result<Self, PackageError> {
        let resources = match document.get(RESOURCES) {
            None => IndexMap::new(),
            Some(Value::Object(map)) => map
                .iter()
                .map(|(id, body)| (id.clone(), Resource::from_value(body.clone())))
                .collect(),
            Some(_) => return NotAMappingSnafu { path }.fail(),
        };
        Ok(Self {
            document,
            resources,
        })
    }

    pub fn resources(&self) -> &IndexMap<String, Resource> {
        &self.resources
    }

    pub fn resource(&self, id: &str) -> Option<&Resource> {
        self.resources.get(id)
    }

    /// Replace a resource in place, keeping its position.
    pub fn replace_resource(&mut self, id: &str, resource: Resource) {
        if let Some(slot) = self.resources.get_mut(id) {
            *slot = resource;
        } else {
            self.resources.insert(id.to_string(), resource);
        }
    }

    /// The `Transform` declaration, if any.
    pub fn transform(&self) -> Option<&Value> {
        self.document.get(TRANSFORM)
    }

    /// The full document with resources written back where they were.
    pub fn to_value(&self) -> Value {
        let mut document = self.document.clone();
        if !self.resources.is_empty() || document.contains_key(RESOURCES) {
            let resources = self
                .resources
                .iter()
                .map(|(id, resource)| (id.clone(), resource.to_value()))
                .collect::<Map<_, _>>();
            document.insert(RESOURCES.to_string(), Value::Object(resources));
        }
        Value::Object(document)
    }

    /// Serialize in the format implied by `path`.
    pub fn marshall(&self, path: &Path) -> Result<Vec<u8>, PackageError> {
        let value = self.to_value();
        match TemplateFormat::from_path(path) {
            TemplateFormat::Json => {
                let mut bytes = serde_json::to_vec_pretty(&tags::to_long_form(value))
                    .context(MarshallJsonSnafu)?;
                bytes.push(b'\n');
                Ok(bytes)
            }
            TemplateFormat::Yaml => serde_yaml::to_string(&tags::unescape(value))
                .map(String::into_bytes)
                .context(MarshallYamlSnafu),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEMPLATE: &str = r#"
AWSTemplateFormatVersion: '2010-09-09'
Transform: AWS::Serverless-2016-10-31
Resources:
  Api:
    Type: AWS::Serverless::Function
    Properties:
      CodeUri: ./src
      Handler: app.handler
  Table:
    Type: AWS::DynamoDB::Table
    Properties:
      TableName: !Sub '${AWS::StackName}-table'
"#;

    #[test]
    fn format_follows_extension() {
        assert_eq!(TemplateFormat::from_path(Path::new("t.yaml")), TemplateFormat::Yaml);
        assert_eq!(TemplateFormat::from_path(Path::new("t.YML")), TemplateFormat::Yaml);
        assert_eq!(TemplateFormat::from_path(Path::new("t.json")), TemplateFormat::Json);
        assert_eq!(TemplateFormat::from_path(Path::new("t.template")), TemplateFormat::Json);
    }

    #[test]
    fn resources_are_classified() {
        let template = Template::parse(Path::new("t.yaml"), TEMPLATE).unwrap();
        assert!(matches!(
            template.resource("Api"),
            Some(Resource::ServerlessFunction(_))
        ));
        assert!(matches!(template.resource("Table"), Some(Resource::Opaque(_))));
        assert_eq!(
            template.transform(),
            Some(&Value::String("AWS::Serverless-2016-10-31".to_string()))
        );
    }

    #[test]
    fn replacing_a_resource_keeps_its_position() {
        let mut template = Template::parse(Path::new("t.yaml"), TEMPLATE).unwrap();
        let mut api = template.resource("Api").cloned().unwrap();
        if let Some(function) = api.as_function_mut() {
            function.set_property("CodeUri", Value::String("s3://b/k.zip".to_string()));
        }
        template.replace_resource("Api", api);

        let ids: Vec<_> = template.resources().keys().cloned().collect();
        assert_eq!(ids, vec!["Api", "Table"]);
        let value = template.to_value();
        assert_eq!(value["Resources"]["Api"]["Properties"]["CodeUri"], "s3://b/k.zip");
    }

    #[test]
    fn non_mapping_template_is_rejected() {
        let err = Template::parse(Path::new("t.json"), "[1, 2]").unwrap_err();
        assert!(matches!(err, PackageError::NotAMapping { .. }));
    }

    #[test]
    fn yaml_tags_survive_marshalling() {
        let template = Template::parse(Path::new("t.yaml"), TEMPLATE).unwrap();
        let bytes = template.marshall(Path::new("out.yaml")).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("!Sub"));
    }
}
