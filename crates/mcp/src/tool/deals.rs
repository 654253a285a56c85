use std::borrow::Cow;

use dealpath::{DealpathApi, Query};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use super::{Tool, ToolContext, string_or_number};
use crate::{
    cache::{TtlCache, deal_json_key},
    content::ToolOutput,
    error::McpError,
};

/// Address fields searched by `search_deals`.
const ADDRESS_FIELDS: [&str; 7] = [
    "street",
    "street_address",
    "address",
    "city",
    "state",
    "postal_code",
    "country",
];

/// Fetches a deal envelope (`{"deal": {"data": {...}}}`), going through the cache.
pub(crate) async fn fetch_deal(api: &dyn DealpathApi, cache: &TtlCache, deal_id: &str) -> Result<Value, McpError> {
    let key = deal_json_key(deal_id);

    if let Some(cached) = cache.get(&key) {
        return Ok(cached);
    }

    let path = format!("/deal/{}", urlencoding::encode(deal_id));
    let deal = api.get(&path, &Query::new()).await?;

    cache.set(key, deal.clone());

    Ok(deal)
}

#[derive(Debug, Deserialize, JsonSchema)]
pub(crate) struct GetDealsParameters {
    /// Only deals in this state, e.g. `Active`.
    status: Option<String>,
    /// Only deals of this property type, e.g. `Office`.
    #[serde(rename = "propertyType")]
    property_type: Option<String>,
}

pub(crate) struct GetDeals;

impl Tool for GetDeals {
    type Parameters = GetDealsParameters;

    fn name() -> &'static str {
        "get_deals"
    }

    fn title(&self) -> &'static str {
        "List Deals"
    }

    fn description(&self) -> Cow<'_, str> {
        Cow::Borrowed("Return deals with optional filters: status, propertyType.")
    }

    async fn call(&self, context: ToolContext<'_>, parameters: Self::Parameters) -> Result<ToolOutput, McpError> {
        let filters = [("status", parameters.status), ("propertyType", parameters.property_type)];

        let query: Query = filters
            .into_iter()
            .filter_map(|(key, value)| Some((key.to_string(), value.filter(|v| !v.is_empty())?)))
            .collect();

        Ok(ToolOutput::Json(context.api.get("/deals", &query).await?))
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub(crate) struct GetDealParameters {
    /// Identifier of the deal.
    #[serde(deserialize_with = "string_or_number")]
    #[schemars(with = "String")]
    deal_id: String,
}

pub(crate) struct GetDeal;

impl Tool for GetDeal {
    type Parameters = GetDealParameters;

    fn name() -> &'static str {
        "get_deal"
    }

    fn title(&self) -> &'static str {
        "Get Deal"
    }

    fn description(&self) -> Cow<'_, str> {
        Cow::Borrowed("Return a single deal by ID.")
    }

    async fn call(&self, context: ToolContext<'_>, parameters: Self::Parameters) -> Result<ToolOutput, McpError> {
        let deal = fetch_deal(context.api.as_ref(), context.cache, &parameters.deal_id).await?;

        Ok(ToolOutput::Json(deal))
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub(crate) struct SearchDealsParameters {
    /// Case-insensitive text matched against deal names and addresses.
    query: String,
}

pub(crate) struct SearchDeals;

impl Tool for SearchDeals {
    type Parameters = SearchDealsParameters;

    fn name() -> &'static str {
        "search_deals"
    }

    fn title(&self) -> &'static str {
        "Search Deals"
    }

    fn description(&self) -> Cow<'_, str> {
        Cow::Borrowed("Find deals whose name or address contains the query, ignoring case.")
    }

    async fn call(&self, context: ToolContext<'_>, parameters: Self::Parameters) -> Result<ToolOutput, McpError> {
        let mut body = context.api.get("/deals", &Query::new()).await?;
        let needle = parameters.query.to_lowercase();

        if let Some(deals) = body.pointer_mut("/deals/data").and_then(Value::as_array_mut) {
            deals.retain(|deal| matches_deal(deal, &needle));
        }

        Ok(ToolOutput::Json(body))
    }
}

fn matches_deal(deal: &Value, needle: &str) -> bool {
    let contains = |value: &Value| {
        value
            .as_str()
            .is_some_and(|text| text.to_lowercase().contains(needle))
    };

    if deal.get("name").is_some_and(contains) {
        return true;
    }

    match deal.get("address") {
        Some(Value::Object(address)) => ADDRESS_FIELDS
            .iter()
            .filter_map(|field| address.get(*field))
            .any(contains),
        Some(address) => contains(address),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::matches_deal;

    #[test]
    fn matches_name_and_address_ignoring_case() {
        let deal = json!({"id": 1, "name": "Boston Office Tower", "address": {"city": "Boston", "state": "MA"}});

        assert!(matches_deal(&deal, "office"));
        assert!(matches_deal(&deal, "ma"));
        assert!(!matches_deal(&deal, "chicago"));
    }

    #[test]
    fn address_as_plain_text() {
        let deal = json!({"id": 2, "name": "Warehouse", "address": "12 Dock St, Houston TX"});

        assert!(matches_deal(&deal, "houston"));
    }

    #[test]
    fn deals_without_name_or_address() {
        assert!(!matches_deal(&json!({"id": 3}), "anything"));
    }
}
