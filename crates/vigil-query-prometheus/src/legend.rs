//! Series display-name formatting
//!
//! Dashboards configure a legend template per query; `{{label}}`
//! placeholders are replaced with the series' label values.

use std::collections::BTreeMap;

use regex::{Captures, Regex};

const LEGEND_PATTERN: &str = r"\{\{\s*(.+?)\s*\}\}";

/// Renders series display names from legend templates
pub struct LegendFormatter {
    pattern: Regex,
}

impl LegendFormatter {
    pub fn new() -> Self {
        Self {
            pattern: Regex::new(LEGEND_PATTERN).expect("legend placeholder pattern is valid"),
        }
    }

    /// Render the display name for one series. An empty template falls back
    /// to the conventional `metric{label="value"}` signature; placeholders
    /// naming unknown labels render as empty.
    pub fn format(&self, template: &str, labels: &BTreeMap<String, String>) -> String {
        if template.trim().is_empty() {
            return metric_signature(labels);
        }

        self.pattern
            .replace_all(template, |caps: &Captures<'_>| {
                labels.get(&caps[1]).cloned().unwrap_or_default()
            })
            .into_owned()
    }
}

impl Default for LegendFormatter {
    fn default() -> Self {
        Self::new()
    }
}

/// Conventional series signature: the metric name followed by the remaining
/// labels in stable order
fn metric_signature(labels: &BTreeMap<String, String>) -> String {
    let name = labels.get("__name__").cloned().unwrap_or_default();
    let rest: Vec<String> = labels
        .iter()
        .filter(|(key, _)| key.as_str() != "__name__")
        .map(|(key, value)| format!("{}=\"{}\"", key, value))
        .collect();

    if rest.is_empty() {
        return name;
    }
    format!("{}{{{}}}", name, rest.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    #[test]
    fn test_placeholders_are_substituted() {
        let formatter = LegendFormatter::new();
        let labels = labels(&[("handler", "/api/users"), ("method", "GET")]);

        assert_eq!(
            formatter.format("{{method}} {{ handler }}", &labels),
            "GET /api/users"
        );
    }

    #[test]
    fn test_unknown_labels_render_empty() {
        let formatter = LegendFormatter::new();
        assert_eq!(
            formatter.format("{{job}}-{{missing}}", &labels(&[("job", "api")])),
            "api-"
        );
    }

    #[test]
    fn test_template_without_placeholders_is_literal() {
        let formatter = LegendFormatter::new();
        assert_eq!(formatter.format("errors", &labels(&[])), "errors");
    }

    #[test]
    fn test_empty_template_falls_back_to_signature() {
        let formatter = LegendFormatter::new();
        let labels = labels(&[("__name__", "up"), ("job", "api"), ("instance", "a:9090")]);

        assert_eq!(
            formatter.format("", &labels),
            "up{instance=\"a:9090\", job=\"api\"}"
        );
    }

    #[test]
    fn test_signature_without_metric_name() {
        let formatter = LegendFormatter::new();
        assert_eq!(formatter.format("  ", &labels(&[("job", "api")])), "{job=\"api\"}");
        assert_eq!(formatter.format("", &labels(&[])), "");
    }
}
