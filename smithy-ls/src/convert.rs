//! Conversions between model source locations and LSP positions.
//!
//! Model locations are 1-indexed; LSP is 0-indexed.

use smithy_model::{Severity, SourceLocation, ValidationEvent};
use tower_lsp::lsp_types::{Diagnostic, DiagnosticSeverity, Location, Position, Range, Url};

/// Convert a model source location to an LSP position.
#[must_use]
pub fn location_to_position(location: &SourceLocation) -> Position {
    Position {
        line: location.line.saturating_sub(1) as u32,
        character: location.column.saturating_sub(1) as u32,
    }
}

/// Convert a model source location to a zero-length LSP range.
#[must_use]
pub fn location_to_range(location: &SourceLocation) -> Range {
    let position = location_to_position(location);
    Range {
        start: position,
        end: position,
    }
}

/// Convert a model source location to an LSP location, when it has a file.
#[must_use]
pub fn location_to_lsp(location: &SourceLocation) -> Option<Location> {
    if location.is_none() {
        return None;
    }
    let uri = Url::from_file_path(&location.filename).ok()?;
    Some(Location {
        uri,
        range: location_to_range(location),
    })
}

#[must_use]
pub fn severity_to_lsp(severity: Severity) -> DiagnosticSeverity {
    match severity {
        Severity::Note => DiagnosticSeverity::HINT,
        Severity::Warning => DiagnosticSeverity::WARNING,
        Severity::Danger => DiagnosticSeverity::WARNING,
        Severity::Error => DiagnosticSeverity::ERROR,
    }
}

/// Convert a validation event to an LSP diagnostic.
#[must_use]
pub fn event_to_diagnostic(event: &ValidationEvent) -> Diagnostic {
    Diagnostic {
        range: location_to_range(&event.location),
        severity: Some(severity_to_lsp(event.severity)),
        source: Some("smithy".to_string()),
        code: Some(tower_lsp::lsp_types::NumberOrString::String(
            event.id.clone(),
        )),
        message: event.message.clone(),
        ..Diagnostic::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locations_convert_to_zero_indexed() {
        let location = SourceLocation::new("/p/a.smithy", 3, 5);
        assert_eq!(location_to_position(&location), Position::new(2, 4));

        let lsp = location_to_lsp(&location).unwrap();
        assert_eq!(lsp.uri.path(), "/p/a.smithy");
        assert!(location_to_lsp(&SourceLocation::NONE).is_none());
    }

    #[test]
    fn events_become_diagnostics() {
        let event = ValidationEvent::new(
            Severity::Error,
            "Model",
            "boom",
            SourceLocation::new("/p/a.smithy", 1, 1),
        );
        let diagnostic = event_to_diagnostic(&event);
        assert_eq!(diagnostic.severity, Some(DiagnosticSeverity::ERROR));
        assert_eq!(diagnostic.message, "boom");
        assert_eq!(diagnostic.source.as_deref(), Some("smithy"));
    }
}
