//! Classification vocabulary and the classifier collaborator trait.
//!
//! The wire vocabulary (Spanish lowercase strings) is the contract with the
//! external classification service and is also what the database stores, so
//! both serde and the string conversions use it verbatim.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Request priority, ordered from least to most pressing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Priority {
    #[serde(rename = "baja")]
    Low,
    #[serde(rename = "media")]
    Medium,
    #[serde(rename = "alta")]
    High,
    #[serde(rename = "urgente")]
    Urgent,
}

impl Priority {
    /// Wire / storage representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "baja",
            Priority::Medium => "media",
            Priority::High => "alta",
            Priority::Urgent => "urgente",
        }
    }

    /// Parse the wire representation. Unknown values are rejected so the
    /// caller can fall back to a default.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "baja" => Some(Priority::Low),
            "media" => Some(Priority::Medium),
            "alta" => Some(Priority::High),
            "urgente" => Some(Priority::Urgent),
            _ => None,
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for Priority {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Priority::parse(&value).ok_or_else(|| format!("unknown priority: {value}"))
    }
}

/// Maintenance issue category, as produced by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IssueType {
    #[serde(rename = "mantenimiento_preventivo")]
    PreventiveMaintenance,
    #[serde(rename = "reparacion_urgente")]
    UrgentRepair,
    #[serde(rename = "revision_rutinaria")]
    RoutineCheck,
    #[serde(rename = "falla_mecanica")]
    MechanicalFailure,
    #[serde(rename = "falla_electrica")]
    ElectricalFailure,
    #[serde(rename = "accidente")]
    Accident,
    #[serde(rename = "neumaticos")]
    Tires,
    /// Initial type for requests created by the guided intake flow, before
    /// classification runs.
    #[serde(rename = "ingreso_taller")]
    WorkshopIntake,
    #[serde(rename = "otro")]
    Other,
}

impl IssueType {
    /// Wire / storage representation.
    pub fn as_str(self) -> &'static str {
        match self {
            IssueType::PreventiveMaintenance => "mantenimiento_preventivo",
            IssueType::UrgentRepair => "reparacion_urgente",
            IssueType::RoutineCheck => "revision_rutinaria",
            IssueType::MechanicalFailure => "falla_mecanica",
            IssueType::ElectricalFailure => "falla_electrica",
            IssueType::Accident => "accidente",
            IssueType::Tires => "neumaticos",
            IssueType::WorkshopIntake => "ingreso_taller",
            IssueType::Other => "otro",
        }
    }

    /// Parse the wire representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "mantenimiento_preventivo" => Some(IssueType::PreventiveMaintenance),
            "reparacion_urgente" => Some(IssueType::UrgentRepair),
            "revision_rutinaria" => Some(IssueType::RoutineCheck),
            "falla_mecanica" => Some(IssueType::MechanicalFailure),
            "falla_electrica" => Some(IssueType::ElectricalFailure),
            "accidente" => Some(IssueType::Accident),
            "neumaticos" => Some(IssueType::Tires),
            "ingreso_taller" => Some(IssueType::WorkshopIntake),
            "otro" => Some(IssueType::Other),
            _ => None,
        }
    }
}

impl std::fmt::Display for IssueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for IssueType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        IssueType::parse(&value).ok_or_else(|| format!("unknown issue type: {value}"))
    }
}

/// Result of classifying a driver's problem description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    #[serde(rename = "tipo")]
    pub issue_type: IssueType,
    #[serde(rename = "prioridad")]
    pub priority: Priority,
    #[serde(rename = "resumen")]
    pub summary: String,
}

impl Classification {
    /// Default classification used whenever the classifier is unavailable
    /// or returns garbage. Request creation never blocks on it.
    pub fn fallback() -> Self {
        Self {
            issue_type: IssueType::Other,
            priority: Priority::Medium,
            summary: "Clasificación manual requerida".to_string(),
        }
    }
}

/// Errors from the classification collaborator.
#[derive(Debug, Error)]
pub enum ClassifierError {
    /// The remote service failed or timed out.
    #[error("classifier unavailable: {0}")]
    Unavailable(String),

    /// The service answered with something unparseable.
    #[error("invalid classifier response: {0}")]
    InvalidResponse(String),
}

/// Trait for the external text-classification service.
///
/// Implementations wrap whatever transport the deployment uses; callers must
/// treat every error as "use [`Classification::fallback`]".
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Classify a problem description.
    async fn classify(
        &self,
        text: &str,
        has_photos: bool,
    ) -> Result<Classification, ClassifierError>;
}

/// Classifier that always returns the fallback classification.
///
/// Used when no classification service is configured, mirroring the
/// degraded mode of the rest of the pipeline.
#[derive(Debug, Clone, Default)]
pub struct DefaultClassifier;

#[async_trait]
impl Classifier for DefaultClassifier {
    async fn classify(
        &self,
        _text: &str,
        _has_photos: bool,
    ) -> Result<Classification, ClassifierError> {
        Ok(Classification::fallback())
    }
}

/// Classifier that always returns a fixed result. Handy in tests and demos.
#[derive(Debug, Clone)]
pub struct FixedClassifier {
    pub result: Classification,
}

impl FixedClassifier {
    pub fn new(issue_type: IssueType, priority: Priority, summary: impl Into<String>) -> Self {
        Self {
            result: Classification {
                issue_type,
                priority,
                summary: summary.into(),
            },
        }
    }
}

#[async_trait]
impl Classifier for FixedClassifier {
    async fn classify(
        &self,
        _text: &str,
        _has_photos: bool,
    ) -> Result<Classification, ClassifierError> {
        Ok(self.result.clone())
    }
}
