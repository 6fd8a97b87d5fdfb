use parking_lot::Mutex;
use serde_json::Value;

#[derive(Debug, Default, Clone)]
struct RequestMetric {
    ok: u64,
    err: u64,
    total_latency_ms: f64,
    max_latency_ms: f64,
}

#[derive(Debug, Default)]
pub struct MetricsRegistry {
    rerank: Mutex<RequestMetric>,
}

impl MetricsRegistry {
    pub fn record_rerank(&self, ok: bool, latency_ms: f64) {
        let mut metric = self.rerank.lock();
        if ok {
            metric.ok = metric.ok.saturating_add(1);
        } else {
            metric.err = metric.err.saturating_add(1);
        }
        metric.total_latency_ms += latency_ms;
        if latency_ms > metric.max_latency_ms {
            metric.max_latency_ms = latency_ms;
        }
    }

    pub fn summary(&self) -> Value {
        let metric = self.rerank.lock().clone();
        serde_json::json!({
            "rerank": {
                "ok": metric.ok,
                "err": metric.err,
                "total_latency_ms": metric.total_latency_ms,
                "max_latency_ms": metric.max_latency_ms,
            }
        })
    }

    pub fn render_text(&self, cache_stats: &Value) -> String {
        let metric = self.rerank.lock().clone();
        let mut lines = vec![
            "# TYPE fuserank_rerank_requests_total counter".to_string(),
            format!(
                "fuserank_rerank_requests_total{{status=\"ok\"}} {}",
                metric.ok
            ),
            format!(
                "fuserank_rerank_requests_total{{status=\"err\"}} {}",
                metric.err
            ),
            "# TYPE fuserank_rerank_latency_ms_total counter".to_string(),
            format!(
                "fuserank_rerank_latency_ms_total {:.3}",
                metric.total_latency_ms
            ),
            "# TYPE fuserank_rerank_latency_ms_max gauge".to_string(),
            format!("fuserank_rerank_latency_ms_max {:.3}", metric.max_latency_ms),
        ];

        for field in ["hits", "misses", "evictions"] {
            lines.push(format!("# TYPE fuserank_cache_{field}_total counter"));
            lines.push(format!(
                "fuserank_cache_{field}_total {}",
                sum_field(cache_stats, field)
            ));
        }

        let mut out = lines.join("\n");
        out.push('\n');
        out
    }
}

// cache stats are flat for single-tier backends and nested for tiered
fn sum_field(value: &Value, field: &str) -> u64 {
    match value {
        Value::Object(map) => map
            .iter()
            .map(|(key, inner)| {
                if key == field {
                    inner.as_u64().unwrap_or(0)
                } else {
                    sum_field(inner, field)
                }
            })
            .sum(),
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate_and_track_max() {
        let metrics = MetricsRegistry::default();
        metrics.record_rerank(true, 12.0);
        metrics.record_rerank(false, 40.0);
        metrics.record_rerank(true, 5.0);

        let summary = metrics.summary();
        assert_eq!(summary["rerank"]["ok"], 2);
        assert_eq!(summary["rerank"]["err"], 1);
        assert_eq!(summary["rerank"]["max_latency_ms"], 40.0);
    }

    #[test]
    fn render_text_sums_nested_cache_counters() {
        let metrics = MetricsRegistry::default();
        let stats = serde_json::json!({
            "backend": "tiered",
            "volatile": {"hits": 3, "misses": 1},
            "durable": {"hits": 2, "misses": 4},
        });
        let text = metrics.render_text(&stats);
        assert!(text.contains("fuserank_cache_hits_total 5"));
        assert!(text.contains("fuserank_cache_misses_total 5"));
        assert!(text.contains("fuserank_rerank_requests_total{status=\"ok\"} 0"));
    }
}
