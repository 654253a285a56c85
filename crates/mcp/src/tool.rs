mod deals;
mod file;

pub(crate) use deals::{GetDeal, GetDeals, SearchDeals, fetch_deal};
pub(crate) use file::GetFileById;

use std::{borrow::Cow, sync::Arc};

use dealpath::DealpathApi;
use futures_util::future::BoxFuture;
use schemars::{JsonSchema, schema_for};
use serde::{Deserialize, Deserializer, de::DeserializeOwned};
use serde_json::{Map, Value};

use crate::{cache::TtlCache, content::ToolOutput, error::McpError, files::LocalFileStore};

pub(crate) type JsonObject = Map<String, Value>;

/// What a tool call gets to work with.
pub(crate) struct ToolContext<'a> {
    pub api: Arc<dyn DealpathApi>,
    pub cache: &'a TtlCache,
    pub files: &'a LocalFileStore,
    pub base_url: &'a str,
}

/// A hand-written tool with typed parameters.
pub(crate) trait Tool: Send + Sync + 'static {
    type Parameters: DeserializeOwned + JsonSchema;

    fn name() -> &'static str;
    fn title(&self) -> &'static str;
    fn description(&self) -> Cow<'_, str>;

    fn call(
        &self,
        context: ToolContext<'_>,
        parameters: Self::Parameters,
    ) -> impl Future<Output = Result<ToolOutput, McpError>> + Send;
}

/// Object-safe face of a tool, taking raw JSON arguments.
pub(crate) trait DynTool: Send + Sync + 'static {
    fn name(&self) -> &str;
    fn to_tool(&self) -> rmcp::model::Tool;

    fn call<'a>(&'a self, context: ToolContext<'a>, arguments: JsonObject) -> BoxFuture<'a, Result<ToolOutput, McpError>>;
}

impl<T: Tool> DynTool for T {
    fn name(&self) -> &str {
        T::name()
    }

    fn to_tool(&self) -> rmcp::model::Tool {
        let mut tool = rmcp::model::Tool::new(
            T::name(),
            self.description().into_owned(),
            input_schema::<T::Parameters>(),
        );

        tool.title = Some(self.title().to_string());
        tool
    }

    fn call<'a>(&'a self, context: ToolContext<'a>, arguments: JsonObject) -> BoxFuture<'a, Result<ToolOutput, McpError>> {
        Box::pin(async move {
            check_required(&input_schema::<T::Parameters>(), &arguments)?;

            let parameters: T::Parameters = serde_json::from_value(Value::Object(arguments))
                .map_err(|err| McpError::InvalidArguments(err.to_string()))?;

            Tool::call(self, context, parameters).await
        })
    }
}

fn input_schema<P: JsonSchema>() -> JsonObject {
    let Ok(Value::Object(mut schema)) = serde_json::to_value(schema_for!(P)) else {
        return JsonObject::new();
    };

    schema.remove("$schema");
    schema.remove("title");

    schema
}

/// Fails with the first property the schema requires that is absent, null or an empty string.
pub(crate) fn check_required(schema: &JsonObject, arguments: &JsonObject) -> Result<(), McpError> {
    let required = schema
        .get("required")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str);

    for name in required {
        if is_blank(arguments.get(name)) {
            return Err(McpError::MissingArgument(name.to_string()));
        }
    }

    Ok(())
}

pub(crate) fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(_) => false,
    }
}

/// Identifiers arrive as strings or numbers depending on the client.
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!("expected a string or a number, got {other}"))),
    }
}
