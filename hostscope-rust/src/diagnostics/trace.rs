//! Call stack capture for the call-stack log

use std::backtrace::Backtrace;

/// Frames belonging to the capture machinery itself
const INTERNAL_PREFIXES: &[&str] = &[
    "std::backtrace",
    "std::backtrace_rs",
    "hostscope::diagnostics::trace::",
    "hostscope::diagnostics::DiagnosticSink::trace_calling_methods",
];

/// Symbols of the current call stack, innermost caller first
///
/// Capture machinery frames are dropped, then `skip` more.
pub fn calling_frames(skip: usize) -> Vec<String> {
    let rendered = Backtrace::force_capture().to_string();
    parse_frames(&rendered)
        .into_iter()
        .skip_while(|frame| INTERNAL_PREFIXES.iter().any(|p| frame.starts_with(p)))
        .skip(skip)
        .collect()
}

/// Extract frame symbols from a rendered backtrace
///
/// Frame lines look like `  12: crate::module::function::h0123456789abcdef`;
/// the `at file:line` lines that follow are ignored.
pub fn parse_frames(rendered: &str) -> Vec<String> {
    rendered
        .lines()
        .filter_map(|line| {
            let (index, symbol) = line.trim_start().split_once(": ")?;
            if index.is_empty() || !index.chars().all(|c| c.is_ascii_digit()) {
                return None;
            }
            Some(strip_hash(symbol.trim()).to_string())
        })
        .collect()
}

/// Drop the trailing `::h<16 hex digits>` disambiguator
fn strip_hash(symbol: &str) -> &str {
    match symbol.rsplit_once("::") {
        Some((path, hash))
            if hash.len() == 17
                && hash.starts_with('h')
                && hash[1..].chars().all(|c| c.is_ascii_hexdigit()) =>
        {
            path
        }
        _ => symbol,
    }
}
