//! Input types shared by the analyze and heal paths.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// An ordered `name -> value` reading set.
///
/// Iteration order is insertion order, so anomaly output is deterministic
/// for a given input document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metrics {
    entries: Vec<(String, f64)>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a reading. Re-inserting a name overwrites the value in place.
    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for Metrics {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        let mut metrics = Metrics::new();
        for (name, value) in iter {
            metrics.insert(name, value);
        }
        metrics
    }
}

impl Serialize for Metrics {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.entries.iter().map(|(n, v)| (n, v)))
    }
}

impl<'de> Deserialize<'de> for Metrics {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct MetricsVisitor;

        impl<'de> Visitor<'de> for MetricsVisitor {
            type Value = Metrics;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of metric names to numbers")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Metrics, A::Error> {
                let mut metrics = Metrics::new();
                while let Some((name, value)) = map.next_entry::<String, f64>()? {
                    metrics.insert(name, value);
                }
                Ok(metrics)
            }
        }

        deserializer.deserialize_map(MetricsVisitor)
    }
}

/// Contextual hints supplied alongside metrics.
///
/// Unknown keys are kept in `extra` and passed through untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HealingContext {
    #[serde(default)]
    pub services: Vec<String>,
    #[serde(default)]
    pub queues: Vec<String>,
    #[serde(default)]
    pub containers: Vec<String>,
    /// Identity of the caller, used as the audit actor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl HealingContext {
    pub fn with_services<I, S>(mut self, services: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.services = services.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_queues<I, S>(mut self, queues: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.queues = queues.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_containers<I, S>(mut self, containers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.containers = containers.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_preserve_document_order() {
        let metrics: Metrics =
            serde_json::from_str(r#"{"zeta": 1.0, "alpha": 2.0, "mid": 3}"#).unwrap();
        let names: Vec<&str> = metrics.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
        assert_eq!(metrics.get("mid"), Some(3.0));
    }

    #[test]
    fn test_metrics_duplicate_key_overwrites_in_place() {
        let mut metrics = Metrics::new();
        metrics.insert("a", 1.0);
        metrics.insert("b", 2.0);
        metrics.insert("a", 5.0);
        assert_eq!(metrics.len(), 2);
        assert_eq!(metrics.iter().next(), Some(("a", 5.0)));
    }

    #[test]
    fn test_metrics_reject_non_numeric() {
        let parsed = serde_json::from_str::<Metrics>(r#"{"cpu_load": "high"}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_context_defaults_and_extra_keys() {
        let ctx: HealingContext =
            serde_json::from_str(r#"{"services": ["svc-a"], "region": "eu-west"}"#).unwrap();
        assert_eq!(ctx.services, vec!["svc-a"]);
        assert!(ctx.queues.is_empty());
        assert!(ctx.containers.is_empty());
        assert!(ctx.user.is_none());
        assert_eq!(ctx.extra["region"], "eu-west");
    }
}
