use rmcp::model::{CallToolResult, Content, RawResource};
use serde_json::Value;

/// A resource link part, typed with the MIME type when it is known.
pub(crate) fn resource_link(name: impl Into<String>, uri: impl Into<String>, mime_type: Option<String>) -> Content {
    let mut link = RawResource::new(uri, name);
    link.mime_type = mime_type;

    Content::resource_link(link)
}

/// What a tool produced.
#[derive(Debug, Clone)]
pub enum ToolOutput {
    /// A JSON body, usually forwarded from the upstream verbatim.
    Json(Value),
    /// Ready-made content parts.
    Content(Vec<Content>),
}

impl ToolOutput {
    /// Converts the output to MCP content parts. JSON bodies become one compact text part.
    pub fn into_content(self) -> Vec<Content> {
        match self {
            Self::Json(Value::String(text)) => vec![Content::text(text)],
            Self::Json(value) => vec![Content::text(value.to_string())],
            Self::Content(parts) => parts,
        }
    }

    /// The `tools/call` result.
    pub fn into_call_result(self) -> CallToolResult {
        CallToolResult::success(self.into_content())
    }

    /// Converts the output to a JSON body for the REST endpoints.
    pub fn into_json(self) -> Value {
        match self {
            Self::Json(value) => value,
            Self::Content(parts) => serde_json::json!({ "content": parts }),
        }
    }
}

#[cfg(test)]
mod tests {
    use rmcp::model::Content;
    use serde_json::json;

    use super::{ToolOutput, resource_link};

    #[test]
    fn json_becomes_compact_text() {
        let result = ToolOutput::Json(json!({"deals": {"data": [], "next_token": null}})).into_call_result();

        insta::assert_json_snapshot!(result, @r#"
        {
          "content": [
            {
              "type": "text",
              "text": "{\"deals\":{\"data\":[],\"next_token\":null}}"
            }
          ],
          "isError": false
        }
        "#);
    }

    #[test]
    fn resource_links() {
        let parts = vec![
            resource_link("doc.pdf", "http://127.0.0.1:8000/local-files/20250901/1/doc.pdf", None),
            resource_link("doc.pdf", "https://signed.example/1", Some("application/pdf".into())),
        ];

        insta::assert_json_snapshot!(parts, @r#"
        [
          {
            "type": "resource_link",
            "uri": "http://127.0.0.1:8000/local-files/20250901/1/doc.pdf",
            "name": "doc.pdf"
          },
          {
            "type": "resource_link",
            "uri": "https://signed.example/1",
            "name": "doc.pdf",
            "mimeType": "application/pdf"
          }
        ]
        "#);
    }

    #[test]
    fn rest_body_wraps_content_parts() {
        let body = ToolOutput::Content(vec![Content::text("saved")]).into_json();

        insta::assert_json_snapshot!(body, @r#"
        {
          "content": [
            {
              "text": "saved",
              "type": "text"
            }
          ]
        }
        "#);
    }
}
