use std::sync::Arc;

use serde::Serialize;
use utoipa::ToSchema;

use super::{messages::MessageContext, Severity, ThresholdLadder};
use crate::{catalog::Catalog, db::models::SensorKind};

/// Outcome of evaluating one value. Recomputed on demand, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct SafetyStatus {
    pub is_alert: bool,
    pub severity: Severity,
    /// The breached limit, when there is one.
    pub threshold: Option<f64>,
    /// Rendered alert text; empty when no template is configured.
    pub message: String,
}

impl SafetyStatus {
    pub fn normal() -> Self {
        Self {
            is_alert: false,
            severity: Severity::Normal,
            threshold: None,
            message: String::new(),
        }
    }
}

/// Classifies `value` against `ladder` without rendering a message.
///
/// A missing ladder means the sensor is not monitored and is always normal.
pub fn evaluate(ladder: Option<&ThresholdLadder>, value: f64) -> SafetyStatus {
    match ladder.and_then(|l| l.classify(value)) {
        Some(breach) => SafetyStatus {
            is_alert: true,
            severity: breach.severity,
            threshold: Some(breach.limit),
            message: String::new(),
        },
        None => SafetyStatus::normal(),
    }
}

/// Evaluates readings against the catalog's ladders and renders alert text.
///
/// Both ingestion and the status queries go through this type so a value is
/// always classified the same way.
#[derive(Debug, Clone)]
pub struct Evaluator {
    catalog: Arc<Catalog>,
}

impl Evaluator {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn evaluate(&self, kind: SensorKind, area_id: i32, sensor_no: i32, value: f64) -> SafetyStatus {
        let ladder = self.catalog.thresholds.ladder(kind, area_id, sensor_no);
        let mut status = evaluate(ladder, value);

        if let Some(limit) = status.threshold {
            let location = self.catalog.sites.area_name(area_id);
            let ctx = MessageContext {
                location: &location,
                value,
                limit,
                severity: status.severity,
            };
            status.message = self.catalog.messages.render(kind, area_id, &ctx);
        }
        status
    }
}
