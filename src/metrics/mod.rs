use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One recorded business metric sample.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricEntry {
    pub timestamp: DateTime<Utc>,
    pub name: String, // "orders.created" | "payments.completed" | ...
    pub value: f64,
    pub properties: Option<serde_json::Value>,
}

impl MetricEntry {
    pub fn new(name: impl Into<String>, value: f64, properties: Option<serde_json::Value>) -> Self {
        Self {
            timestamp: Utc::now(),
            name: name.into(),
            value,
            properties,
        }
    }
}

/// In-memory store for all metric samples collected across requests.
#[derive(Debug, Default)]
pub struct MetricsStore {
    pub entries: Vec<MetricEntry>,
}

impl MetricsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, entry: MetricEntry) {
        self.entries.push(entry);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Aggregate stats per metric name.
    pub fn aggregated(&self) -> Vec<AggregatedMetric> {
        let mut map: HashMap<&str, Vec<f64>> = HashMap::new();

        for e in &self.entries {
            map.entry(e.name.as_str()).or_default().push(e.value);
        }

        let mut out: Vec<AggregatedMetric> = map
            .into_iter()
            .map(|(name, mut values)| {
                values.sort_by(|a, b| a.total_cmp(b));
                let count = values.len();
                let sum: f64 = values.iter().sum();
                let p50 = values[count / 2];
                let p95 = values[((count as f64 * 0.95) as usize).min(count.saturating_sub(1))];

                AggregatedMetric {
                    name: name.to_string(),
                    sample_count: count,
                    sum,
                    min: values[0],
                    max: values[count - 1],
                    avg: sum / count as f64,
                    p50,
                    p95,
                }
            })
            .collect();

        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }

    /// Export all entries as a CSV string.
    pub fn to_csv(&self) -> anyhow::Result<String> {
        let mut wtr = csv::Writer::from_writer(vec![]);
        wtr.write_record(["timestamp", "name", "value", "properties"])?;

        for e in &self.entries {
            wtr.write_record([
                e.timestamp.to_rfc3339(),
                e.name.clone(),
                e.value.to_string(),
                e.properties
                    .as_ref()
                    .map(|p| p.to_string())
                    .unwrap_or_default(),
            ])?;
        }

        let data = wtr.into_inner()?;
        Ok(String::from_utf8(data)?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatedMetric {
    pub name: String,
    pub sample_count: usize,
    pub sum: f64,
    pub min: f64,
    pub max: f64,
    pub avg: f64,
    pub p50: f64,
    pub p95: f64,
}
