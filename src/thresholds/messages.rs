use std::collections::HashMap;

use serde::Deserialize;

use super::Severity;
use crate::db::models::SensorKind;

/// Fixed wording substituted into alert templates.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Phrases {
    pub critical_headline: String,
    pub warning_headline: String,
    pub above_critical: String,
    pub approaching_upper: String,
    pub approaching_lower: String,
    pub below_critical: String,
    pub critical_instruction: String,
    pub warning_instruction: String,
}

impl Default for Phrases {
    fn default() -> Self {
        Self {
            critical_headline: "DANGER WARNING".to_owned(),
            warning_headline: "WARNING".to_owned(),
            above_critical: "ABOVE THE LIMIT".to_owned(),
            approaching_upper: "APPROACHING THE UPPER LIMIT".to_owned(),
            approaching_lower: "APPROACHING THE LOWER LIMIT".to_owned(),
            below_critical: "BELOW THE LIMIT".to_owned(),
            critical_instruction: "Take corrective action immediately.".to_owned(),
            warning_instruction: "Monitor the area closely.".to_owned(),
        }
    }
}

impl Phrases {
    fn headline(&self, severity: Severity) -> &str {
        if severity.is_critical() {
            &self.critical_headline
        } else {
            &self.warning_headline
        }
    }

    fn band(&self, severity: Severity) -> &str {
        match severity {
            Severity::CritUpper => &self.above_critical,
            Severity::WarnUpper => &self.approaching_upper,
            Severity::WarnLower => &self.approaching_lower,
            Severity::CritLower => &self.below_critical,
            Severity::Normal => "",
        }
    }

    fn instruction(&self, severity: Severity) -> &str {
        if severity.is_critical() {
            &self.critical_instruction
        } else {
            &self.warning_instruction
        }
    }
}

/// One template per severity tier for a single `(area, kind)`.
///
/// Templates use named placeholders: `{headline}`, `{location}`, `{value}`,
/// `{phrase}`, `{limit}` and `{instruction}`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MessageTemplate {
    #[serde(default)]
    pub upper_critical: Option<String>,
    #[serde(default)]
    pub upper_warning: Option<String>,
    #[serde(default)]
    pub lower_warning: Option<String>,
    #[serde(default)]
    pub lower_critical: Option<String>,
}

impl MessageTemplate {
    pub fn for_severity(&self, severity: Severity) -> Option<&str> {
        let template = match severity {
            Severity::CritUpper => &self.upper_critical,
            Severity::WarnUpper => &self.upper_warning,
            Severity::WarnLower => &self.lower_warning,
            Severity::CritLower => &self.lower_critical,
            Severity::Normal => return None,
        };
        template.as_deref().filter(|t| !t.is_empty())
    }
}

/// Everything a breach needs to be put into words.
#[derive(Debug, Clone, Copy)]
pub struct MessageContext<'a> {
    pub location: &'a str,
    pub value: f64,
    pub limit: f64,
    pub severity: Severity,
}

#[derive(Debug, Clone, Default)]
pub struct MessageCatalog {
    templates: HashMap<(SensorKind, i32), MessageTemplate>,
    phrases: Phrases,
}

impl MessageCatalog {
    pub fn new(templates: HashMap<(SensorKind, i32), MessageTemplate>, phrases: Phrases) -> Self {
        Self { templates, phrases }
    }

    pub fn template(&self, kind: SensorKind, area_id: i32) -> Option<&MessageTemplate> {
        self.templates.get(&(kind, area_id))
    }

    /// Renders the template for `ctx.severity`, or an empty string when the
    /// area has no template for that tier.
    pub fn render(&self, kind: SensorKind, area_id: i32, ctx: &MessageContext<'_>) -> String {
        self.template(kind, area_id)
            .and_then(|t| t.for_severity(ctx.severity))
            .map(|t| fill(t, &self.phrases, ctx))
            .unwrap_or_default()
    }
}

fn fill(template: &str, phrases: &Phrases, ctx: &MessageContext<'_>) -> String {
    template
        .replace("{headline}", phrases.headline(ctx.severity))
        .replace("{location}", ctx.location)
        .replace("{value}", &format!("{:.1}", ctx.value))
        .replace("{phrase}", phrases.band(ctx.severity))
        .replace("{limit}", &format!("{:.0}", ctx.limit))
        .replace("{instruction}", phrases.instruction(ctx.severity))
}
