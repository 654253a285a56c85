use indoc::formatdoc;
use rmcp::model::{GetPromptResult, ListPromptsResult, Prompt, PromptArgument, PromptMessage, PromptMessageRole};
use serde_json::Value;

use crate::{error::McpError, tool::JsonObject};

const DEAL_BRIEF: &str = "deal_brief";

pub(crate) fn list() -> ListPromptsResult {
    let deal_id = PromptArgument {
        name: "deal_id".to_string(),
        title: None,
        description: Some("Identifier of the deal.".to_string()),
        required: Some(true),
    };

    let mut deal_brief = Prompt::new(
        DEAL_BRIEF,
        Some("Summarize a deal for an investment committee."),
        Some(vec![deal_id]),
    );
    deal_brief.title = Some("Deal Brief".to_string());

    ListPromptsResult::with_all_items(vec![deal_brief])
}

/// Renders a prompt with its arguments into a `prompts/get` result.
pub(crate) fn get(name: &str, arguments: &JsonObject) -> Result<GetPromptResult, McpError> {
    if name != DEAL_BRIEF {
        return Err(McpError::UnknownPrompt(name.to_string()));
    }

    let deal_id = match arguments.get("deal_id") {
        Some(Value::String(id)) if !id.trim().is_empty() => id.trim().to_string(),
        Some(Value::Number(id)) => id.to_string(),
        _ => return Err(McpError::MissingArgument("deal_id".to_string())),
    };

    let uri = format!("dealpath://deal/{deal_id}.md");

    let text = formatdoc! {"
        Write a one-page brief of deal {deal_id} for an investment committee.
        Read the resource {uri} first. Cover the property, the deal status, key dates and open risks."
    };

    Ok(GetPromptResult {
        description: Some(format!("Brief of deal {deal_id}")),
        messages: vec![PromptMessage::new_text(PromptMessageRole::User, text)],
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{get, list};
    use crate::error::McpError;

    #[test]
    fn deal_brief() {
        let arguments = json!({"deal_id": 42}).as_object().cloned().unwrap();

        insta::assert_json_snapshot!(get("deal_brief", &arguments).unwrap(), @r#"
        {
          "description": "Brief of deal 42",
          "messages": [
            {
              "role": "user",
              "content": {
                "type": "text",
                "text": "Write a one-page brief of deal 42 for an investment committee.\nRead the resource dealpath://deal/42.md first. Cover the property, the deal status, key dates and open risks."
              }
            }
          ]
        }
        "#);
    }

    #[test]
    fn listing() {
        insta::assert_json_snapshot!(list(), @r#"
        {
          "prompts": [
            {
              "name": "deal_brief",
              "title": "Deal Brief",
              "description": "Summarize a deal for an investment committee.",
              "arguments": [
                {
                  "name": "deal_id",
                  "description": "Identifier of the deal.",
                  "required": true
                }
              ]
            }
          ]
        }
        "#);
    }

    #[test]
    fn errors() {
        let empty = serde_json::Map::new();

        assert!(matches!(get("nope", &empty), Err(McpError::UnknownPrompt(_))));
        assert!(matches!(get("deal_brief", &empty), Err(McpError::MissingArgument(name)) if name == "deal_id"));
    }
}
