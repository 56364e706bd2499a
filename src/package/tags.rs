// ABOUTME: Lossless conversion between YAML templates and the JSON document model.
// ABOUTME: Short-form intrinsic tags (`!Ref x`) travel as single-key maps (`{"!Ref": x}`).
// ABOUTME: JSON output rewrites those maps into long-form intrinsics (`{"Ref": x}`).

use serde_json::{Map, Number, Value as Json};
use serde_yaml::value::{Tag, TaggedValue};
use serde_yaml::{Mapping, Value as Yaml};

/// Convert a parsed YAML document to JSON, escaping tags into `{"!Tag": value}`.
pub fn escape(value: Yaml) -> Json {
    match value {
        Yaml::Null => Json::Null,
        Yaml::Bool(b) => Json::Bool(b),
        Yaml::Number(n) => number(&n),
        Yaml::String(s) => Json::String(s),
        Yaml::Sequence(items) => Json::Array(items.into_iter().map(escape).collect()),
        Yaml::Mapping(mapping) => {
            let mut object = Map::with_capacity(mapping.len());
            for (key, value) in mapping {
                object.insert(key_string(key), escape(value));
            }
            Json::Object(object)
        }
        Yaml::Tagged(tagged) => {
            let TaggedValue { tag, value } = *tagged;
            let mut object = Map::with_capacity(1);
            object.insert(tag.to_string(), escape(value));
            Json::Object(object)
        }
    }
}

/// Convert JSON back to YAML, turning escaped tag maps back into tags.
pub fn unescape(value: Json) -> Yaml {
    match value {
        Json::Null => Yaml::Null,
        Json::Bool(b) => Yaml::Bool(b),
        Json::Number(n) => yaml_number(&n),
        Json::String(s) => Yaml::String(s),
        Json::Array(items) => Yaml::Sequence(items.into_iter().map(unescape).collect()),
        Json::Object(object) => {
            let tagged = object.len() == 1 && object.keys().all(|k| is_tag_key(k));
            let mut mapping = Mapping::with_capacity(object.len());
            for (key, value) in object {
                if tagged {
                    return Yaml::Tagged(Box::new(TaggedValue {
                        tag: Tag::new(key),
                        value: unescape(value),
                    }));
                }
                mapping.insert(Yaml::String(key), unescape(value));
            }
            Yaml::Mapping(mapping)
        }
    }
}

/// Rewrite escaped tags into the long-form intrinsics a JSON template uses.
///
/// `!Ref` and `!Condition` keep their names, `!GetAtt a.b` becomes
/// `{"Fn::GetAtt": ["a", "b"]}` and any other `!X` becomes `Fn::X`.
pub fn to_long_form(value: Json) -> Json {
    match value {
        Json::Array(items) => Json::Array(items.into_iter().map(to_long_form).collect()),
        Json::Object(object) => {
            let tagged = object.len() == 1 && object.keys().all(|k| is_tag_key(k));
            let mut converted = Map::with_capacity(object.len());
            for (key, value) in object {
                let value = to_long_form(value);
                if !tagged {
                    converted.insert(key, value);
                    continue;
                }
                let (name, value) = match &key[1..] {
                    "Ref" | "Condition" => (key[1..].to_string(), value),
                    "GetAtt" => ("Fn::GetAtt".to_string(), split_get_att(value)),
                    other => (format!("Fn::{other}"), value),
                };
                converted.insert(name, value);
            }
            Json::Object(converted)
        }
        other => other,
    }
}

/// `"Resource.Attr.Nested"` becomes `["Resource", "Attr.Nested"]`.
fn split_get_att(value: Json) -> Json {
    match value {
        Json::String(path) => match path.split_once('.') {
            Some((resource, attribute)) => Json::Array(vec![
                Json::String(resource.to_string()),
                Json::String(attribute.to_string()),
            ]),
            None => Json::String(path),
        },
        other => other,
    }
}

fn is_tag_key(key: &str) -> bool {
    key.len() > 1 && key.starts_with('!') && !key[1..].starts_with('!')
}

fn number(n: &serde_yaml::Number) -> Json {
    if let Some(i) = n.as_i64() {
        Json::Number(i.into())
    } else if let Some(u) = n.as_u64() {
        Json::Number(u.into())
    } else {
        n.as_f64()
            .and_then(Number::from_f64)
            .map(Json::Number)
            .unwrap_or_else(|| Json::String(n.to_string()))
    }
}

fn yaml_number(n: &Number) -> Yaml {
    if let Some(i) = n.as_i64() {
        Yaml::Number(i.into())
    } else if let Some(u) = n.as_u64() {
        Yaml::Number(u.into())
    } else {
        Yaml::Number(n.as_f64().unwrap_or_default().into())
    }
}

fn key_string(key: Yaml) -> String {
    match key {
        Yaml::String(s) => s,
        Yaml::Null => "null".to_string(),
        Yaml::Bool(b) => b.to_string(),
        Yaml::Number(n) => n.to_string(),
        other => serde_yaml::to_string(&other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Yaml {
        serde_yaml::from_str(text).unwrap()
    }

    #[test]
    fn scalar_tags_become_single_key_maps() {
        let json = escape(parse("Bucket: !Ref ArtifactBucket\n"));
        assert_eq!(json, serde_json::json!({"Bucket": {"!Ref": "ArtifactBucket"}}));
    }

    #[test]
    fn sequence_tags_keep_their_items() {
        let json = escape(parse("Name: !Join ['-', [a, b]]\n"));
        assert_eq!(json, serde_json::json!({"Name": {"!Join": ["-", ["a", "b"]]}}));
    }

    #[test]
    fn unescape_restores_tags() {
        let original = parse("Arn: !GetAtt Function.Arn\nSub: !Sub '${AWS::Region}'\n");
        assert_eq!(unescape(escape(original.clone())), original);
    }

    #[test]
    fn long_form_intrinsics_are_untouched() {
        let original = parse("Bucket:\n  Ref: ArtifactBucket\n");
        assert_eq!(unescape(escape(original.clone())), original);
    }

    #[test]
    fn long_form_replaces_short_tags() {
        let json = to_long_form(escape(parse(
            "Bucket: !Ref ArtifactBucket\n\
             Arn: !GetAtt Api.Outputs.Url\n\
             Name: !Sub '${AWS::StackName}-q'\n\
             Pick: !Select [0, !GetAZs '']\n\
             Guard: !Condition IsProd\n",
        )));
        assert_eq!(
            json,
            serde_json::json!({
                "Bucket": {"Ref": "ArtifactBucket"},
                "Arn": {"Fn::GetAtt": ["Api", "Outputs.Url"]},
                "Name": {"Fn::Sub": "${AWS::StackName}-q"},
                "Pick": {"Fn::Select": [0, {"Fn::GetAZs": ""}]},
                "Guard": {"Condition": "IsProd"},
            })
        );
    }

    #[test]
    fn long_form_leaves_plain_maps_alone() {
        let value = serde_json::json!({"Ref": "X", "Tags": [{"Key": "team", "Value": "core"}]});
        assert_eq!(to_long_form(value.clone()), value);
    }

    #[test]
    fn bare_bang_keys_are_not_tags() {
        assert!(!is_tag_key("!"));
        assert!(!is_tag_key("!!str"));
        assert!(is_tag_key("!Ref"));
    }
}
