//! Validation events and the `ValidatedResult` container.

use serde::{Deserialize, Serialize};

use crate::{Model, SourceLocation};

/// Severity of a validation event, ordered from least to most severe.
#[derive(
    Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Note,
    #[default]
    Warning,
    Danger,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Note => "NOTE",
            Self::Warning => "WARNING",
            Self::Danger => "DANGER",
            Self::Error => "ERROR",
        };
        f.write_str(s)
    }
}

/// A single event produced while assembling or validating a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationEvent {
    pub severity: Severity,
    /// Stable identifier of the check or assembly step that produced this.
    pub id: String,
    pub message: String,
    pub location: SourceLocation,
}

impl ValidationEvent {
    #[must_use]
    pub fn new(
        severity: Severity,
        id: impl Into<String>,
        message: impl Into<String>,
        location: SourceLocation,
    ) -> Self {
        Self {
            severity,
            id: id.into(),
            message: message.into(),
            location,
        }
    }

    pub(crate) fn error(
        id: impl Into<String>,
        message: impl Into<String>,
        location: SourceLocation,
    ) -> Self {
        Self::new(Severity::Error, id, message, location)
    }
}

/// The result of model assembly: a value, events, or both.
///
/// A broken model is still present; consumers serve best-effort answers over
/// it and surface the events as diagnostics.
#[derive(Debug, Clone, Default)]
pub struct ValidatedResult<T> {
    value: Option<T>,
    events: Vec<ValidationEvent>,
}

impl<T> ValidatedResult<T> {
    #[must_use]
    pub fn new(value: Option<T>, events: Vec<ValidationEvent>) -> Self {
        Self { value, events }
    }

    #[must_use]
    pub fn from_value(value: T) -> Self {
        Self {
            value: Some(value),
            events: Vec::new(),
        }
    }

    #[must_use]
    pub fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    #[must_use]
    pub fn events(&self) -> &[ValidationEvent] {
        &self.events
    }

    /// Whether any event is an error.
    #[must_use]
    pub fn is_broken(&self) -> bool {
        self.events
            .iter()
            .any(|event| event.severity == Severity::Error)
    }

    /// The contained value.
    ///
    /// # Panics
    ///
    /// Panics when no value is present. Test helper; production paths go
    /// through [`ValidatedResult::value`].
    #[must_use]
    pub fn unwrap(&self) -> &T {
        self.value.as_ref().expect("result has no value")
    }
}

/// Severity mapping and extra checks run on full builds.
///
/// Assembly itself produces parse and resolution events; this pass adds the
/// advisory checks that only matter once a model is complete.
pub(crate) fn validate(model: &Model) -> Vec<ValidationEvent> {
    let mut events = Vec::new();

    for shape in model.shapes.values() {
        for trait_id in shape.traits.keys() {
            if !model.is_known_trait(trait_id) {
                events.push(ValidationEvent::new(
                    Severity::Warning,
                    "UnknownTrait",
                    format!("Unable to resolve trait `{trait_id}`"),
                    shape.source.clone(),
                ));
            }
        }

        if shape
            .id
            .name
            .chars()
            .next()
            .is_some_and(char::is_lowercase)
        {
            events.push(ValidationEvent::new(
                Severity::Note,
                "ShapeNameCase",
                format!("Shape name `{}` should be UpperCamelCase", shape.id.name),
                shape.source.clone(),
            ));
        }
    }

    events
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_is_ordered() {
        assert!(Severity::Note < Severity::Warning);
        assert!(Severity::Warning < Severity::Danger);
        assert!(Severity::Danger < Severity::Error);
    }

    #[test]
    fn broken_result_still_has_value() {
        let result = ValidatedResult::new(
            Some(1),
            vec![ValidationEvent::error("X", "boom", SourceLocation::NONE)],
        );
        assert!(result.is_broken());
        assert_eq!(result.value(), Some(&1));
    }
}
