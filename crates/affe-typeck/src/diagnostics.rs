//! Ariadne-based diagnostic rendering.
//!
//! Renders `TypeError` variants into formatted, labeled error messages.
//! Output is colorless for stable test output and includes an error code,
//! a terse message, a labeled source span where the error carries one, and
//! a help line when a plausible hint exists.

use std::ops::Range;

use ariadne::{Color, Config, Label, Report, ReportKind, Source};

use affe_common::Span;

use crate::error::TypeError;

// ── Error codes ────────────────────────────────────────────────────────

/// Assign a unique error code to each TypeError variant.
fn error_code(err: &TypeError) -> &'static str {
    match err {
        TypeError::TypeMismatch { .. } => "E0001",
        TypeError::KindMismatch { .. } => "E0002",
        TypeError::KindInfeasibility { .. } => "E0003",
        TypeError::UseMismatch { .. } => "E0004",
        TypeError::RecursiveType { .. } => "E0005",
        TypeError::UnknownName { .. } => "E0006",
        TypeError::UnknownType { .. } => "E0007",
        TypeError::IllegalRecLHS { .. } => "E0008",
        TypeError::AlreadyGeneralised { .. } => "E0009",
        TypeError::ArityMismatch { .. } => "E0010",
    }
}

/// The primary span of an error, if it carries one.
fn error_span(err: &TypeError) -> Option<Span> {
    match err {
        TypeError::TypeMismatch { origin, .. }
        | TypeError::KindMismatch { origin, .. }
        | TypeError::RecursiveType { origin, .. }
        | TypeError::ArityMismatch { origin, .. } => origin.span(),
        TypeError::UnknownName { span, .. } | TypeError::IllegalRecLHS { span } => {
            Some(*span)
        }
        TypeError::KindInfeasibility { .. }
        | TypeError::UseMismatch { .. }
        | TypeError::UnknownType { .. }
        | TypeError::AlreadyGeneralised { .. } => None,
    }
}

/// The label placed on the primary span.
fn span_label(err: &TypeError) -> String {
    match err {
        TypeError::TypeMismatch { expected, found, .. } => {
            format!("expected {}, found {}", expected, found)
        }
        TypeError::KindMismatch { expected, found, .. } => {
            format!("expected {}, found {}", expected, found)
        }
        TypeError::RecursiveType { .. } => "recursive type here".to_string(),
        TypeError::UnknownName { .. } => "not found in this scope".to_string(),
        TypeError::IllegalRecLHS { .. } => "only a plain variable may be bound here".to_string(),
        TypeError::ArityMismatch { expected, .. } => {
            format!("expected {} type argument(s)", expected)
        }
        _ => format!("{}", err),
    }
}

/// A help line, when a plausible hint exists.
fn help_text(err: &TypeError) -> Option<String> {
    match err {
        TypeError::RecursiveType { .. } => {
            Some("a value cannot have a type that refers to itself".to_string())
        }
        TypeError::UseMismatch { name, .. } => Some(format!(
            "`{}` may be consumed, borrowed shared, or borrowed exclusively, but not a mix",
            name
        )),
        TypeError::KindInfeasibility { .. } => {
            Some("the required usages have no common qualifier".to_string())
        }
        TypeError::IllegalRecLHS { .. } => {
            Some("bind the tuple or constructor with an inner `let` instead".to_string())
        }
        _ => None,
    }
}

// ── Main rendering function ────────────────────────────────────────────

/// Render a type error into a formatted diagnostic string.
pub fn render_diagnostic(error: &TypeError, source: &str, _filename: &str) -> String {
    let config = Config::default().with_color(false);
    let source_len = source.len();

    // Clamp a range to be valid and non-empty within the source.
    let clamp = |r: Range<usize>| -> Range<usize> {
        let s = r.start.min(source_len);
        let e = r.end.min(source_len).max(s);
        if s == e {
            s..e.saturating_add(1).min(source_len)
        } else {
            s..e
        }
    };

    // Placeholder spans from programmatically built trees carry no real
    // position; report against the whole source instead.
    let span = error_span(error)
        .filter(|s| !s.is_dummy())
        .map(|s| s.start as usize..s.end as usize)
        .unwrap_or(0..source_len);
    let span = clamp(span);

    let mut builder = Report::build(ReportKind::Error, span.clone())
        .with_code(error_code(error))
        .with_message(format!("{}", error))
        .with_config(config);

    builder.add_label(
        Label::new(span)
            .with_message(span_label(error))
            .with_color(Color::Red),
    );

    if let Some(help) = help_text(error) {
        builder.set_help(help);
    }

    let report = builder.finish();

    // Render to buffer without colors.
    let mut buf = Vec::new();
    let cache = Source::from(source);
    report
        .write(cache, &mut buf)
        .expect("failed to write diagnostic");
    String::from_utf8(buf).expect("diagnostic output should be valid UTF-8")
}
