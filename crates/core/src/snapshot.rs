//! Configuration snapshot schema.
//!
//! A snapshot is the fully-resolved configuration of an integration at a
//! point in time: overview metadata, domain allowlist, RAG parameters,
//! theme, and webhooks. Incoming JSON is parsed into [`IntegrationConfig`],
//! validated, and re-serialized so the stored value always carries every
//! default explicitly.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const DEFAULT_TEMPERATURE: f64 = 0.7;
pub const MAX_TEMPERATURE: f64 = 2.0;
pub const DEFAULT_MAX_TOKENS: u32 = 1024;
pub const DEFAULT_TOP_K: u32 = 5;
pub const MAX_TOP_K: u32 = 100;
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.75;
pub const DEFAULT_BORDER_RADIUS: u32 = 8;

/// Maximum length of the display name carried in a snapshot.
pub const MAX_NAME_LENGTH: usize = 120;

static HEX_COLOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#[0-9a-fA-F]{6}$").expect("valid regex"));

static DOMAIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\*\.)?([a-zA-Z0-9]([a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?\.)*[a-zA-Z0-9]([a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(:\d{1,5})?$")
        .expect("valid regex")
});

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WidgetPosition {
    #[default]
    BottomRight,
    BottomLeft,
    TopRight,
    TopLeft,
}

/// Retrieval-augmented generation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RagSettings {
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_top_k")]
    pub top_k: u32,
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,
    #[serde(default)]
    pub system_prompt: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ThemeSettings {
    pub primary_color: String,
    #[serde(default)]
    pub background_color: Option<String>,
    #[serde(default)]
    pub text_color: Option<String>,
    #[serde(default)]
    pub font_family: Option<String>,
    #[serde(default = "default_border_radius")]
    pub border_radius: u32,
    #[serde(default)]
    pub position: WidgetPosition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WebhookConfig {
    pub url: String,
    pub events: Vec<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// The structured record every snapshot must satisfy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IntegrationConfig {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub allowed_domains: Vec<String>,
    pub rag: RagSettings,
    pub theme: ThemeSettings,
    #[serde(default)]
    pub webhooks: Vec<WebhookConfig>,
}

fn default_temperature() -> f64 {
    DEFAULT_TEMPERATURE
}
fn default_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS
}
fn default_top_k() -> u32 {
    DEFAULT_TOP_K
}
fn default_similarity_threshold() -> f64 {
    DEFAULT_SIMILARITY_THRESHOLD
}
fn default_border_radius() -> u32 {
    DEFAULT_BORDER_RADIUS
}
fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

impl IntegrationConfig {
    /// Check field-level constraints that serde cannot express.
    pub fn validate(&self) -> Result<(), String> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err("name must not be empty".into());
        }
        if name.chars().count() > MAX_NAME_LENGTH {
            return Err(format!("name must be at most {MAX_NAME_LENGTH} characters"));
        }

        for domain in &self.allowed_domains {
            if !DOMAIN_RE.is_match(domain) {
                return Err(format!("allowed_domains: '{domain}' is not a valid hostname"));
            }
        }

        self.rag.validate()?;
        self.theme.validate()?;

        for (i, hook) in self.webhooks.iter().enumerate() {
            hook.validate()
                .map_err(|e| format!("webhooks[{i}].{e}"))?;
        }
        Ok(())
    }
}

impl RagSettings {
    fn validate(&self) -> Result<(), String> {
        if self.model.trim().is_empty() {
            return Err("rag.model must not be empty".into());
        }
        if !(0.0..=MAX_TEMPERATURE).contains(&self.temperature) {
            return Err(format!(
                "rag.temperature must be between 0 and {MAX_TEMPERATURE}"
            ));
        }
        if self.max_tokens == 0 {
            return Err("rag.max_tokens must be at least 1".into());
        }
        if !(1..=MAX_TOP_K).contains(&self.top_k) {
            return Err(format!("rag.top_k must be between 1 and {MAX_TOP_K}"));
        }
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err("rag.similarity_threshold must be between 0 and 1".into());
        }
        Ok(())
    }
}

impl ThemeSettings {
    fn validate(&self) -> Result<(), String> {
        validate_color("theme.primary_color", Some(&self.primary_color))?;
        validate_color("theme.background_color", self.background_color.as_deref())?;
        validate_color("theme.text_color", self.text_color.as_deref())?;
        Ok(())
    }
}

impl WebhookConfig {
    fn validate(&self) -> Result<(), String> {
        if !(self.url.starts_with("https://") || self.url.starts_with("http://")) {
            return Err(format!("url '{}' must be an http(s) URL", self.url));
        }
        if self.events.is_empty() {
            return Err("events must not be empty".into());
        }
        Ok(())
    }
}

fn validate_color(field: &str, value: Option<&str>) -> Result<(), String> {
    match value {
        Some(color) if !HEX_COLOR_RE.is_match(color) => {
            Err(format!("{field} must be a #RRGGBB color, got '{color}'"))
        }
        _ => Ok(()),
    }
}

/// Parse, validate, and fully resolve a raw snapshot.
///
/// Returns the normalized JSON (all defaults filled in) that is stored as
/// the version's `config_snapshot`.
pub fn resolve_snapshot(raw: &Value) -> Result<Value, CoreError> {
    if !raw.is_object() {
        return Err(CoreError::Validation(
            "snapshot must be a JSON object".into(),
        ));
    }

    let config: IntegrationConfig = serde_json::from_value(raw.clone())
        .map_err(|e| CoreError::Validation(format!("snapshot: {e}")))?;
    config
        .validate()
        .map_err(|e| CoreError::Validation(format!("snapshot: {e}")))?;

    serde_json::to_value(&config).map_err(|e| CoreError::Internal(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn minimal() -> Value {
        json!({
            "name": "Support bot",
            "rag": {"model": "gpt-4o-mini"},
            "theme": {"primary_color": "#3366ff"}
        })
    }

    #[test]
    fn minimal_snapshot_is_fully_resolved() {
        let resolved = resolve_snapshot(&minimal()).unwrap();
        assert_eq!(resolved["environment"], "development");
        assert_eq!(resolved["rag"]["temperature"], json!(DEFAULT_TEMPERATURE));
        assert_eq!(resolved["rag"]["top_k"], json!(DEFAULT_TOP_K));
        assert_eq!(resolved["theme"]["position"], "bottom-right");
        assert_eq!(resolved["theme"]["border_radius"], json!(8));
        assert_eq!(resolved["webhooks"], json!([]));
    }

    #[test]
    fn resolving_twice_is_stable() {
        let once = resolve_snapshot(&minimal()).unwrap();
        let twice = resolve_snapshot(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn missing_rag_section_is_rejected() {
        let raw = json!({"name": "x", "theme": {"primary_color": "#000000"}});
        let err = resolve_snapshot(&raw).unwrap_err();
        assert_matches!(err, CoreError::Validation(msg) if msg.contains("rag"));
    }

    #[test]
    fn unknown_top_level_field_is_rejected() {
        let mut raw = minimal();
        raw["surprise"] = json!(true);
        assert_matches!(resolve_snapshot(&raw), Err(CoreError::Validation(_)));
    }

    #[test]
    fn non_object_snapshot_is_rejected() {
        assert_matches!(resolve_snapshot(&json!([1, 2])), Err(CoreError::Validation(_)));
    }

    #[test]
    fn blank_name_is_rejected() {
        let mut raw = minimal();
        raw["name"] = json!("   ");
        let err = resolve_snapshot(&raw).unwrap_err();
        assert_matches!(err, CoreError::Validation(msg) if msg.contains("name"));
    }

    #[test]
    fn temperature_out_of_range_is_rejected() {
        let mut raw = minimal();
        raw["rag"]["temperature"] = json!(3.5);
        let err = resolve_snapshot(&raw).unwrap_err();
        assert_matches!(err, CoreError::Validation(msg) if msg.contains("rag.temperature"));
    }

    #[test]
    fn bad_color_is_rejected() {
        let mut raw = minimal();
        raw["theme"]["text_color"] = json!("blue");
        let err = resolve_snapshot(&raw).unwrap_err();
        assert_matches!(err, CoreError::Validation(msg) if msg.contains("theme.text_color"));
    }

    #[test]
    fn wildcard_domains_are_accepted() {
        let mut raw = minimal();
        raw["allowed_domains"] = json!(["*.example.com", "localhost:3000", "docs.acme.io"]);
        assert!(resolve_snapshot(&raw).is_ok());
    }

    #[test]
    fn invalid_domain_is_rejected() {
        let mut raw = minimal();
        raw["allowed_domains"] = json!(["https://example.com/path"]);
        assert_matches!(resolve_snapshot(&raw), Err(CoreError::Validation(_)));
    }

    #[test]
    fn webhook_without_events_is_rejected() {
        let mut raw = minimal();
        raw["webhooks"] = json!([{"url": "https://hooks.example.com/x", "events": []}]);
        let err = resolve_snapshot(&raw).unwrap_err();
        assert_matches!(err, CoreError::Validation(msg) if msg.contains("webhooks[0]"));
    }

    #[test]
    fn webhook_defaults_to_enabled() {
        let mut raw = minimal();
        raw["webhooks"] = json!([{"url": "https://hooks.example.com/x", "events": ["message.created"]}]);
        let resolved = resolve_snapshot(&raw).unwrap();
        assert_eq!(resolved["webhooks"][0]["enabled"], true);
    }
}
