//! Diagnostics: validation events and config errors per file.

use std::path::Path;

use smithy_model::Severity;
use tower_lsp::lsp_types::{Diagnostic, DiagnosticSeverity, Range};

use crate::convert::event_to_diagnostic;
use crate::project::Project;

/// The diagnostics for one file of a project, filtered by the configured
/// minimum severity. Config errors always surface on their build file.
#[must_use]
pub fn file_diagnostics(project: &Project, path: &Path, minimum: Severity) -> Vec<Diagnostic> {
    let filename = path.to_string_lossy();
    let mut diagnostics: Vec<Diagnostic> = project
        .model_result()
        .events()
        .iter()
        .filter(|event| event.severity >= minimum)
        .filter(|event| event.location.filename == filename)
        .map(event_to_diagnostic)
        .collect();

    for error in project.config_errors() {
        if error.path == path {
            diagnostics.push(Diagnostic {
                range: Range::default(),
                severity: Some(DiagnosticSeverity::ERROR),
                source: Some("smithy".to_string()),
                message: error.message.clone(),
                ..Diagnostic::default()
            });
        }
    }

    diagnostics
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project;
    use std::path::PathBuf;

    #[test]
    fn events_filter_by_file_and_severity() {
        // `mystery` is an unknown trait (warning); the lowercase shape name
        // is a note.
        let text = "namespace com.foo\n@mystery\nstring lower\n";
        let project = project::detached(PathBuf::from("/p/a.smithy"), text.to_string());

        let warnings =
            file_diagnostics(&project, Path::new("/p/a.smithy"), Severity::Warning);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].severity, Some(DiagnosticSeverity::WARNING));

        let notes = file_diagnostics(&project, Path::new("/p/a.smithy"), Severity::Note);
        assert_eq!(notes.len(), 2);

        let errors = file_diagnostics(&project, Path::new("/p/a.smithy"), Severity::Error);
        assert!(errors.is_empty());

        let other = file_diagnostics(&project, Path::new("/p/other.smithy"), Severity::Note);
        assert!(other.is_empty());
    }
}
