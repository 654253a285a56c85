//! `dealpath://deal/{id}.json` and `dealpath://deal/{id}.md` resources.

use std::fmt::Write;

use dealpath::DealpathApi;
use rmcp::model::{
    AnnotateAble, ListResourceTemplatesResult, RawResourceTemplate, ReadResourceResult, ResourceContents,
};
use serde_json::Value;

use crate::{
    cache::{TtlCache, deal_markdown_key},
    error::McpError,
    tool::fetch_deal,
};

const DEAL_PREFIX: &str = "dealpath://deal/";

/// Projection of a deal served as a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DealFormat {
    Json,
    Markdown,
}

impl DealFormat {
    fn mime_type(self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Markdown => "text/markdown",
        }
    }
}

pub(crate) fn templates() -> ListResourceTemplatesResult {
    let templates = [
        (
            "dealpath://deal/{id}.json",
            "deal-json",
            "Deal (JSON)",
            "The raw deal record as returned by Dealpath.",
            DealFormat::Json,
        ),
        (
            "dealpath://deal/{id}.md",
            "deal-markdown",
            "Deal (Markdown)",
            "A readable summary of the deal.",
            DealFormat::Markdown,
        ),
    ];

    let templates = templates
        .into_iter()
        .map(|(uri_template, name, title, description, format)| {
            RawResourceTemplate {
                uri_template: uri_template.to_string(),
                name: name.to_string(),
                title: Some(title.to_string()),
                description: Some(description.to_string()),
                mime_type: Some(format.mime_type().to_string()),
            }
            .no_annotation()
        })
        .collect();

    ListResourceTemplatesResult::with_all_items(templates)
}

/// Splits `dealpath://deal/{id}.{json|md}` into the deal id and the requested projection.
pub(crate) fn parse_uri(uri: &str) -> Result<(String, DealFormat), McpError> {
    let invalid = || McpError::InvalidUri(uri.to_string());

    let rest = uri.strip_prefix(DEAL_PREFIX).ok_or_else(invalid)?;
    let (id, extension) = rest.rsplit_once('.').ok_or_else(invalid)?;

    let format = match extension {
        "json" => DealFormat::Json,
        "md" => DealFormat::Markdown,
        _ => return Err(invalid()),
    };

    if id.is_empty() || id.contains('/') {
        return Err(invalid());
    }

    Ok((id.to_string(), format))
}

/// Reads a deal resource, serving from the cache when possible.
pub(crate) async fn read(api: &dyn DealpathApi, cache: &TtlCache, uri: &str) -> Result<ReadResourceResult, McpError> {
    let (deal_id, format) = parse_uri(uri)?;

    let text = match format {
        DealFormat::Json => fetch_deal(api, cache, &deal_id).await?.to_string(),
        DealFormat::Markdown => {
            let key = deal_markdown_key(&deal_id);

            match cache.get(&key) {
                Some(Value::String(markdown)) => markdown,
                _ => {
                    let deal = fetch_deal(api, cache, &deal_id).await?;
                    let markdown = render_markdown(&deal_id, &deal);

                    cache.set(key, Value::String(markdown.clone()));

                    markdown
                }
            }
        }
    };

    let contents = ResourceContents::TextResourceContents {
        uri: uri.to_string(),
        mime_type: Some(format.mime_type().to_string()),
        text,
        meta: None,
    };

    Ok(ReadResourceResult {
        contents: vec![contents],
    })
}

/// Renders a deal envelope as a short markdown summary.
pub(crate) fn render_markdown(deal_id: &str, envelope: &Value) -> String {
    let deal = envelope
        .pointer("/deal/data")
        .or_else(|| envelope.get("deal"))
        .unwrap_or(envelope);

    let title = deal
        .get("name")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("Deal {deal_id}"));

    let mut markdown = format!("# {title}\n\n");

    let Some(fields) = deal.as_object() else {
        return markdown;
    };

    let mut keys: Vec<&String> = fields.keys().collect();
    keys.sort();

    for key in keys {
        let value = &fields[key.as_str()];

        if key == "name" {
            continue;
        }

        let rendered = match value {
            Value::Null => continue,
            Value::String(s) if s.is_empty() => continue,
            Value::String(s) => s.clone(),
            Value::Object(object) => {
                let mut entries: Vec<_> = object.iter().collect();
                entries.sort_by_key(|(name, _)| *name);

                let parts: Vec<String> = entries.into_iter().filter_map(|(_, value)| plain(value)).collect();

                if parts.is_empty() {
                    continue;
                }

                parts.join(", ")
            }
            Value::Array(items) => format!("{} items", items.len()),
            other => other.to_string(),
        };

        let _ = writeln!(markdown, "- **{}:** {rendered}", label(key));
    }

    markdown
}

fn plain(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn label(key: &str) -> String {
    let spaced = key.replace('_', " ");
    let mut chars = spaced.chars();

    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => spaced,
    }
}
