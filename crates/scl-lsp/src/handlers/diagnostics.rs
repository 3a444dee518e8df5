//! Marker line diagnostics.
//!
//! A marker line starts with one of the configured prefixes (e.g.
//! `# req-Id:`) followed by a comma-separated list of need IDs. Every ID not
//! present in the need index is reported as an error; a marker with nothing
//! after it is reported as a warning.

use scl_core::{NeedIndex, utf16_len};
use tower_lsp_server::ls_types::{Diagnostic, DiagnosticSeverity, Position, Range};

/// `source` of every diagnostic published by the server.
pub const SOURCE: &str = "scl_lsp";

const EMPTY_MARKER_MESSAGE: &str = "template marker with no reference";

/// Scans `content` line by line and returns all marker diagnostics.
///
/// Columns are UTF-16 code units. The result depends only on the arguments.
///
/// # Examples
///
/// ```
/// use scl_core::{Need, NeedIndex};
/// use scl_lsp::handlers::diagnostics::scan;
///
/// let index = NeedIndex::from_needs([Need { id: "REQ_001".into(), ..Need::default() }]);
/// let markers = vec!["# req-Id:".to_string()];
///
/// let diagnostics = scan("# req-Id: REQ_001, REQ_404", &index, &markers);
/// assert_eq!(diagnostics.len(), 1);
/// assert_eq!(diagnostics[0].range.start.character, 19);
/// ```
pub fn scan(content: &str, index: &NeedIndex, markers: &[String]) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    for (line_number, line) in content.split('\n').enumerate() {
        let line = line.strip_suffix('\r').unwrap_or(line);
        let Some(marker) = markers.iter().find(|marker| line.starts_with(marker.as_str())) else {
            continue;
        };
        scan_marker_line(
            line_number as u32,
            line,
            marker,
            index,
            &mut diagnostics,
        );
    }

    tracing::debug!(count = diagnostics.len(), "scanned marker diagnostics");
    diagnostics
}

fn scan_marker_line(
    line_number: u32,
    line: &str,
    marker: &str,
    index: &NeedIndex,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let references = &line[marker.len()..];
    let marker_end = utf16_len(marker);

    if references.trim().is_empty() {
        let position = Position::new(line_number, marker_end);
        diagnostics.push(diagnostic(
            Range::new(position, position),
            DiagnosticSeverity::WARNING,
            EMPTY_MARKER_MESSAGE.to_string(),
        ));
        return;
    }

    // UTF-16 offset of the current fragment from the end of the marker.
    let mut offset = 0;
    for fragment in references.split(',') {
        let candidate = fragment.trim();
        if !candidate.is_empty() && !index.contains(candidate) {
            let leading = fragment.len() - fragment.trim_start().len();
            let start = marker_end + offset + utf16_len(&fragment[..leading]);
            let end = start + utf16_len(candidate);
            tracing::debug!(line = line_number, candidate, "unknown need reference");
            diagnostics.push(diagnostic(
                Range::new(
                    Position::new(line_number, start),
                    Position::new(line_number, end),
                ),
                DiagnosticSeverity::ERROR,
                format!("Need '{candidate}' not found. Typo or missing definition?"),
            ));
        }
        offset += utf16_len(fragment) + 1;
    }
}

fn diagnostic(range: Range, severity: DiagnosticSeverity, message: String) -> Diagnostic {
    Diagnostic {
        range,
        severity: Some(severity),
        source: Some(SOURCE.to_string()),
        message,
        ..Default::default()
    }
}
