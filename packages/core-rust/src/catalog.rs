//! Benchmark and provider catalog entries.
//!
//! The catalog is static for the lifetime of the process: it is loaded from
//! configuration at startup and served read-only.

use serde::{Deserialize, Serialize};

/// A benchmark offered by a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenchmarkResource {
    pub id: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub provider_id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// List of benchmarks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenchmarksList {
    pub total_count: usize,
    pub items: Vec<BenchmarkResource>,
}

/// Simplified benchmark reference used inside a provider entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportedBenchmark {
    pub id: String,
}

/// An evaluation provider (e.g. an evaluation framework adapter).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider {
    pub id: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub supported_benchmarks: Vec<SupportedBenchmark>,
}

/// List of providers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderList {
    pub total_count: usize,
    pub items: Vec<Provider>,
}

/// Filter applied when listing benchmarks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BenchmarkFilter {
    pub provider_id: Option<String>,
    pub category: Option<String>,
}

impl BenchmarkFilter {
    /// Whether the benchmark passes every set criterion.
    #[must_use]
    pub fn matches(&self, benchmark: &BenchmarkResource) -> bool {
        let provider_ok = self
            .provider_id
            .as_deref()
            .map_or(true, |p| p == benchmark.provider_id);
        let category_ok = self
            .category
            .as_deref()
            .map_or(true, |c| benchmark.category.as_deref() == Some(c));
        provider_ok && category_ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn benchmark(id: &str, provider: &str, category: Option<&str>) -> BenchmarkResource {
        BenchmarkResource {
            id: id.to_string(),
            label: id.to_uppercase(),
            description: None,
            category: category.map(str::to_string),
            provider_id: provider.to_string(),
            tags: Vec::new(),
        }
    }

    #[test]
    fn empty_filter_matches_everything() {
        let filter = BenchmarkFilter::default();
        assert!(filter.matches(&benchmark("mmlu", "lm_eval", None)));
    }

    #[test]
    fn filter_by_provider_and_category() {
        let filter = BenchmarkFilter {
            provider_id: Some("lm_eval".to_string()),
            category: Some("reasoning".to_string()),
        };
        assert!(filter.matches(&benchmark("arc", "lm_eval", Some("reasoning"))));
        assert!(!filter.matches(&benchmark("arc", "ragas", Some("reasoning"))));
        assert!(!filter.matches(&benchmark("mmlu", "lm_eval", Some("knowledge"))));
        assert!(!filter.matches(&benchmark("mmlu", "lm_eval", None)));
    }
}
