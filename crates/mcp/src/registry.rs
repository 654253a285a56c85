use std::collections::HashSet;

use rmcp::model::{ListToolsResult, Tool};

use crate::{
    openapi::{self, ProxyTool},
    tool::{DynTool, GetDeal, GetDeals, GetFileById, SearchDeals},
};

/// A tool found by name.
pub(crate) enum ResolvedTool<'a> {
    /// A hand-written tool.
    Static(&'a dyn DynTool),
    /// A tool proxying an OpenAPI GET operation.
    Proxy(&'a ProxyTool),
}

impl ResolvedTool<'_> {
    pub(crate) fn to_tool(&self) -> Tool {
        match self {
            Self::Static(tool) => tool.to_tool(),
            Self::Proxy(tool) => tool.to_tool().clone(),
        }
    }
}

/// The merged tool list: hand-written tools first, then the OpenAPI proxies whose names are free.
pub struct ToolRegistry {
    statics: Vec<Box<dyn DynTool>>,
    proxies: Vec<ProxyTool>,
}

impl ToolRegistry {
    /// Builds the registry from an OpenAPI document.
    pub fn new(document: &str) -> anyhow::Result<Self> {
        let statics: Vec<Box<dyn DynTool>> = vec![
            Box::new(GetDeals),
            Box::new(GetDeal),
            Box::new(SearchDeals),
            Box::new(GetFileById),
        ];

        let mut taken: HashSet<String> = statics.iter().map(|tool| tool.name().to_string()).collect();
        let mut proxies = Vec::new();

        for proxy in openapi::parse(document)? {
            if taken.insert(proxy.name().to_string()) {
                proxies.push(proxy);
            } else {
                log::debug!("Tool '{}' from the OpenAPI document is shadowed", proxy.name());
            }
        }

        log::info!(
            "Tool registry loaded: {} built-in tools, {} OpenAPI tools",
            statics.len(),
            proxies.len()
        );

        Ok(Self { statics, proxies })
    }

    /// Builds the registry from the bundled OpenAPI document.
    pub fn bundled() -> anyhow::Result<Self> {
        Self::new(openapi::BUNDLED_DOCUMENT)
    }

    /// All tools, as announced by `tools/list`.
    pub fn list(&self) -> ListToolsResult {
        let tools = self
            .statics
            .iter()
            .map(|tool| tool.to_tool())
            .chain(self.proxies.iter().map(|tool| tool.to_tool().clone()))
            .collect();

        ListToolsResult::with_all_items(tools)
    }

    /// Number of tools.
    pub fn len(&self) -> usize {
        self.statics.len() + self.proxies.len()
    }

    /// Whether the registry holds no tools.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Finds a tool, hand-written ones first.
    pub(crate) fn resolve(&self, name: &str) -> Option<ResolvedTool<'_>> {
        if let Some(tool) = self.statics.iter().find(|tool| tool.name() == name) {
            return Some(ResolvedTool::Static(tool.as_ref()));
        }

        self.proxies
            .iter()
            .find(|tool| tool.name() == name)
            .map(ResolvedTool::Proxy)
    }
}
