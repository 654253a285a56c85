use std::{collections::BTreeMap, time::Duration};

use dashmap::DashMap;
use serde::Serialize;

/// Per-tool call counters kept in process memory.
#[derive(Default)]
pub struct ToolCallStats {
    tools: DashMap<String, Counters>,
}

#[derive(Default, Clone, Copy)]
struct Counters {
    calls: u64,
    errors: u64,
    total_latency: Duration,
}

/// Point-in-time view of one tool's counters.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolStatsSnapshot {
    /// Number of calls, failed ones included.
    pub calls: u64,
    /// Number of failed calls.
    pub errors: u64,
    /// Sum of call latencies in milliseconds.
    pub total_latency_ms: f64,
    /// Mean call latency in milliseconds.
    pub avg_latency_ms: f64,
}

impl ToolCallStats {
    /// Creates empty statistics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one call of `tool` that took `latency`.
    pub fn record(&self, tool: &str, latency: Duration, success: bool) {
        let mut counters = self.tools.entry(tool.to_string()).or_default();

        counters.calls += 1;
        counters.total_latency += latency;

        if !success {
            counters.errors += 1;
        }
    }

    /// Returns the counters of every tool called so far, ordered by tool name.
    pub fn snapshot(&self) -> BTreeMap<String, ToolStatsSnapshot> {
        self.tools
            .iter()
            .map(|entry| {
                let Counters {
                    calls,
                    errors,
                    total_latency,
                } = *entry.value();

                let total_latency_ms = total_latency.as_secs_f64() * 1000.0;

                let snapshot = ToolStatsSnapshot {
                    calls,
                    errors,
                    total_latency_ms,
                    avg_latency_ms: if calls == 0 { 0.0 } else { total_latency_ms / calls as f64 },
                };

                (entry.key().clone(), snapshot)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::ToolCallStats;

    #[test]
    fn counts_calls_and_errors_per_tool() {
        let stats = ToolCallStats::new();

        stats.record("get_deal", Duration::from_millis(10), true);
        stats.record("get_deal", Duration::from_millis(30), false);
        stats.record("search", Duration::from_millis(5), true);

        insta::assert_json_snapshot!(stats.snapshot(), @r#"
        {
          "get_deal": {
            "calls": 2,
            "errors": 1,
            "totalLatencyMs": 40.0,
            "avgLatencyMs": 20.0
          },
          "search": {
            "calls": 1,
            "errors": 0,
            "totalLatencyMs": 5.0,
            "avgLatencyMs": 5.0
          }
        }
        "#);
    }

    #[test]
    fn empty_stats() {
        assert!(ToolCallStats::new().snapshot().is_empty());
    }
}
