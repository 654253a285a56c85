use std::time::{Duration, Instant};

use opentelemetry::{Key, KeyValue, Value, metrics::Histogram};

/// Measures an operation and records its duration, in milliseconds, to a histogram.
///
/// ```rust,ignore
/// let mut recorder = Recorder::new(MCP_TOOL_CALL_DURATION);
/// recorder.push_attribute("tool.name", "get_deal");
///
/// let result = call_tool().await;
/// recorder.push_attribute("status", if result.is_ok() { "success" } else { "error" });
/// recorder.record();
/// ```
pub struct Recorder {
    start: Instant,
    histogram: Histogram<f64>,
    attributes: Vec<KeyValue>,
}

impl Recorder {
    /// Creates a recorder for the named histogram and starts timing.
    pub fn new(name: &'static str) -> Self {
        Self {
            start: Instant::now(),
            histogram: super::meter().f64_histogram(name).with_unit("ms").build(),
            attributes: Vec::new(),
        }
    }

    /// Adds an attribute to be recorded with the metric.
    pub fn push_attribute<K, V>(&mut self, key: K, value: V)
    where
        K: Into<Key>,
        V: Into<Value>,
    {
        self.attributes.push(KeyValue::new(key, value));
    }

    /// Records the elapsed time to the histogram and returns it.
    pub fn record(self) -> Duration {
        let elapsed = self.start.elapsed();
        self.histogram.record(elapsed.as_secs_f64() * 1000.0, &self.attributes);

        elapsed
    }
}
