//! Tools derived from the GET operations of an OpenAPI document.
//!
//! Every GET operation becomes a proxy tool: path and query parameters turn into the input
//! schema, and a call substitutes the path parameters and forwards the rest as query
//! parameters.

use std::collections::BTreeMap;

use anyhow::Context;
use convert_case::{Case, Casing};
use dealpath::{DealpathApi, Query};
use serde::Deserialize;
use serde_json::{Map, Value, json};

use crate::{
    content::ToolOutput,
    error::McpError,
    tool::{JsonObject, is_blank},
};

/// The Dealpath v1 OpenAPI document shipped with the gateway.
pub const BUNDLED_DOCUMENT: &str = include_str!("openapi/dealpath_v1.yaml");

/// Schema keywords carried from a parameter's schema into the tool's input schema.
const COPIED_KEYWORDS: [&str; 11] = [
    "type",
    "format",
    "enum",
    "minimum",
    "maximum",
    "minLength",
    "maxLength",
    "items",
    "pattern",
    "description",
    "default",
];

const PARAMETER_REF_PREFIX: &str = "#/components/parameters/";

#[derive(Debug, Deserialize)]
struct Document {
    #[serde(default)]
    paths: BTreeMap<String, PathItem>,
    #[serde(default)]
    components: Components,
}

#[derive(Debug, Default, Deserialize)]
struct Components {
    #[serde(default)]
    parameters: BTreeMap<String, Parameter>,
}

#[derive(Debug, Deserialize)]
struct PathItem {
    #[serde(default)]
    parameters: Vec<ParameterOrRef>,
    get: Option<Operation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Operation {
    operation_id: Option<String>,
    summary: Option<String>,
    description: Option<String>,
    #[serde(default)]
    parameters: Vec<ParameterOrRef>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ParameterOrRef {
    Ref {
        #[serde(rename = "$ref")]
        reference: String,
    },
    Parameter(Parameter),
}

#[derive(Debug, Clone, Deserialize)]
struct Parameter {
    name: String,
    #[serde(rename = "in")]
    location: Location,
    #[serde(default)]
    required: bool,
    description: Option<String>,
    #[serde(default)]
    schema: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Location {
    Path,
    Query,
    Header,
    Cookie,
}

/// A tool forwarding to one upstream GET endpoint.
#[derive(Debug, Clone)]
pub struct ProxyTool {
    tool: rmcp::model::Tool,
    path: String,
    path_parameters: Vec<String>,
}

impl ProxyTool {
    /// Tool name.
    pub fn name(&self) -> &str {
        &self.tool.name
    }

    /// The upstream path template, e.g. `/deal/{deal_id}`.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Names of the parameters substituted into the path, in declaration order.
    pub fn path_parameters(&self) -> &[String] {
        &self.path_parameters
    }

    /// The tool as announced by `tools/list`.
    pub fn to_tool(&self) -> &rmcp::model::Tool {
        &self.tool
    }

    /// Issues the upstream GET and returns its JSON body verbatim.
    pub(crate) async fn call(&self, api: &dyn DealpathApi, arguments: JsonObject) -> Result<ToolOutput, McpError> {
        let (path, query) = self.request(arguments)?;

        Ok(ToolOutput::Json(api.get(&path, &query).await?))
    }

    fn request(&self, mut arguments: JsonObject) -> Result<(String, Query), McpError> {
        let mut path = self.path.clone();

        for name in &self.path_parameters {
            let value = arguments.remove(name);

            if is_blank(value.as_ref()) {
                return Err(McpError::MissingArgument(name.clone()));
            }

            let value = value.as_ref().and_then(scalar).unwrap_or_default();
            path = path.replace(&format!("{{{name}}}"), &urlencoding::encode(&value));
        }

        let mut query = Query::new();

        for (name, value) in arguments {
            match value {
                Value::Array(items) => query.extend(items.iter().filter_map(scalar).map(|item| (name.clone(), item))),
                value => query.extend(scalar(&value).map(|value| (name, value))),
            }
        }

        Ok((path, query))
    }
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Parses an OpenAPI document and builds one proxy tool per GET operation.
pub fn parse(document: &str) -> anyhow::Result<Vec<ProxyTool>> {
    let document: Document = serde_yaml::from_str(document).context("Failed to parse the OpenAPI document")?;

    let mut tools = Vec::new();

    for (path, item) in &document.paths {
        let Some(operation) = &item.get else {
            continue;
        };

        let parameters = merge_parameters(&document.components, &item.parameters, &operation.parameters)
            .with_context(|| format!("Invalid parameters for GET {path}"))?;

        tools.push(build_tool(path, operation, &parameters));
    }

    Ok(tools)
}

/// Path-level parameters first, overridden by operation-level ones with the same name and location.
fn merge_parameters(
    components: &Components,
    path_level: &[ParameterOrRef],
    operation_level: &[ParameterOrRef],
) -> anyhow::Result<Vec<Parameter>> {
    let mut merged: Vec<Parameter> = Vec::new();

    for entry in path_level.iter().chain(operation_level) {
        let parameter = match entry {
            ParameterOrRef::Parameter(parameter) => parameter.clone(),
            ParameterOrRef::Ref { reference } => {
                let name = reference
                    .strip_prefix(PARAMETER_REF_PREFIX)
                    .with_context(|| format!("Unsupported reference {reference}"))?;

                components
                    .parameters
                    .get(name)
                    .cloned()
                    .with_context(|| format!("Unresolved reference {reference}"))?
            }
        };

        match merged
            .iter_mut()
            .find(|existing| existing.name == parameter.name && existing.location == parameter.location)
        {
            Some(existing) => *existing = parameter,
            None => merged.push(parameter),
        }
    }

    Ok(merged)
}

fn build_tool(path: &str, operation: &Operation, parameters: &[Parameter]) -> ProxyTool {
    let name = tool_name(path, operation.operation_id.as_deref());

    let mut properties = Map::new();
    let mut required = Vec::new();
    let mut path_parameters = Vec::new();

    for parameter in parameters {
        match parameter.location {
            Location::Path => path_parameters.push(parameter.name.clone()),
            Location::Query => (),
            Location::Header | Location::Cookie => continue,
        }

        let mut property: Map<String, Value> = COPIED_KEYWORDS
            .iter()
            .filter_map(|keyword| Some((keyword.to_string(), parameter.schema.get(*keyword)?.clone())))
            .collect();

        if !property.contains_key("description")
            && let Some(description) = &parameter.description
        {
            property.insert("description".to_string(), Value::String(description.clone()));
        }

        if property.is_empty() {
            property.insert("type".to_string(), json!("string"));
        }

        properties.insert(parameter.name.clone(), Value::Object(property));

        let is_required = parameter.required || parameter.location == Location::Path;

        if is_required && !required.contains(&parameter.name) {
            required.push(parameter.name.clone());
        }
    }

    let mut input_schema = JsonObject::new();
    input_schema.insert("type".to_string(), json!("object"));
    input_schema.insert("properties".to_string(), Value::Object(properties));
    input_schema.insert("additionalProperties".to_string(), json!(false));

    if !required.is_empty() {
        input_schema.insert("required".to_string(), json!(required));
    }

    let title = operation
        .summary
        .clone()
        .unwrap_or_else(|| name.to_case(Case::Title));

    let description = operation
        .description
        .clone()
        .unwrap_or_else(|| format!("Proxy for GET {path}"));

    let mut tool = rmcp::model::Tool::new(name, description, input_schema);
    tool.title = Some(title);

    ProxyTool {
        tool,
        path: path.to_string(),
        path_parameters,
    }
}

/// The snake_case operation id, or `get_<path segments>` without one.
fn tool_name(path: &str, operation_id: Option<&str>) -> String {
    match operation_id {
        Some(id) => id.to_case(Case::Snake),
        None => {
            let segments = path.trim_matches('/').replace(['{', '}'], "").replace('/', "_");

            if segments.is_empty() {
                "get_root".to_string()
            } else {
                format!("get_{segments}").to_case(Case::Snake)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use serde_json::{Value, json};

    use super::{BUNDLED_DOCUMENT, parse, tool_name};
    use crate::error::McpError;

    const DOCUMENT: &str = indoc! {r#"
        openapi: 3.0.3
        info:
          title: Test
          version: "1"
        components:
          parameters:
            NextToken:
              name: next_token
              in: query
              description: Pagination cursor.
              schema:
                type: string
        paths:
          /fields/deal/{deal_id}:
            parameters:
              - name: deal_id
                in: path
                schema:
                  type: integer
                  minimum: 1
            get:
              operationId: getFieldsByDealId
              summary: Fields of a deal
              parameters:
                - $ref: '#/components/parameters/NextToken'
                - name: field_definition_ids
                  in: query
                  schema:
                    type: array
                    items:
                      type: integer
                - name: X-Trace
                  in: header
                  schema:
                    type: string
          /people:
            get:
              parameters:
                - name: updated_after
                  in: query
                  description: Unix timestamp.
                  required: true
            post:
              operationId: createPerson
    "#};

    #[test]
    fn builds_schemas_from_parameters() {
        let tools = parse(DOCUMENT).unwrap();
        let announced: Vec<_> = tools.iter().map(|tool| tool.to_tool()).collect();

        insta::assert_json_snapshot!(announced, @r#"
        [
          {
            "name": "get_fields_by_deal_id",
            "title": "Fields of a deal",
            "description": "Proxy for GET /fields/deal/{deal_id}",
            "inputSchema": {
              "additionalProperties": false,
              "properties": {
                "deal_id": {
                  "minimum": 1,
                  "type": "integer"
                },
                "field_definition_ids": {
                  "items": {
                    "type": "integer"
                  },
                  "type": "array"
                },
                "next_token": {
                  "description": "Pagination cursor.",
                  "type": "string"
                }
              },
              "required": [
                "deal_id"
              ],
              "type": "object"
            }
          },
          {
            "name": "get_people",
            "title": "Get People",
            "description": "Proxy for GET /people",
            "inputSchema": {
              "additionalProperties": false,
              "properties": {
                "updated_after": {
                  "description": "Unix timestamp."
                }
              },
              "required": [
                "updated_after"
              ],
              "type": "object"
            }
          }
        ]
        "#);
    }

    #[test]
    fn names() {
        assert_eq!(tool_name("/deals", Some("getDeals")), "get_deals");
        assert_eq!(tool_name("/deal/{deal_id}", None), "get_deal_deal_id");
        assert_eq!(tool_name("/", None), "get_root");
        assert_eq!(tool_name("/x", Some("search")), "search");
    }

    #[test]
    fn requests_substitute_path_and_forward_query() {
        let tools = parse(DOCUMENT).unwrap();

        let arguments = json!({
            "deal_id": 42,
            "field_definition_ids": [1, 2],
            "next_token": null,
            "extra": "a b"
        });

        let (path, query) = tools[0].request(arguments.as_object().cloned().unwrap()).unwrap();

        assert_eq!(path, "/fields/deal/42");
        insta::assert_json_snapshot!(query, @r#"
        [
          [
            "extra",
            "a b"
          ],
          [
            "field_definition_ids",
            "1"
          ],
          [
            "field_definition_ids",
            "2"
          ]
        ]
        "#);
    }

    #[test]
    fn path_parameters_are_encoded() {
        let tools = parse(DOCUMENT).unwrap();
        let arguments = json!({"deal_id": "../admin"});

        let (path, _) = tools[0].request(arguments.as_object().cloned().unwrap()).unwrap();

        assert_eq!(path, "/fields/deal/..%2Fadmin");
    }

    #[test]
    fn missing_path_parameter_names_the_field() {
        let tools = parse(DOCUMENT).unwrap();
        let error = tools[0].request(Default::default()).unwrap_err();

        assert!(matches!(error, McpError::MissingArgument(ref name) if name == "deal_id"));
    }

    #[test]
    fn unresolved_references_fail() {
        let document = indoc! {r#"
            paths:
              /deals:
                get:
                  parameters:
                    - $ref: '#/components/parameters/Missing'
        "#};

        let error = parse(document).unwrap_err();

        insta::assert_snapshot!(format!("{error:#}"), @"Invalid parameters for GET /deals: Unresolved reference #/components/parameters/Missing");
    }

    #[test]
    fn bundled_document_parses() {
        let tools = parse(BUNDLED_DOCUMENT).unwrap();
        let names: Vec<_> = tools.iter().map(|tool| tool.name()).collect();

        assert!(names.contains(&"get_deals"));
        assert!(names.contains(&"get_deal_by_id"));
        assert!(names.contains(&"get_fields_by_deal_id"));

        for tool in &tools {
            let required = tool
                .to_tool()
                .input_schema
                .get("required")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();

            for parameter in tool.path_parameters() {
                assert!(required.contains(&json!(parameter)), "{} must require {parameter}", tool.name());
            }
        }
    }
}
