//! Output formatting for parse failures.

use std::fmt::Write;

use crate::error::Diagnostic;
use crate::run::ParseResult;

/// Format diagnostics for display with source context.
///
/// ```text
/// input.txt:1:5: expected digit, found '+'
///   1 + + 2
///       ^
/// ```
pub fn format_diagnostics(diagnostics: &[Diagnostic], filename: &str) -> String {
    let mut result = String::new();
    for diag in diagnostics {
        let _ = writeln!(result, "{}:{}:{}: {}", filename, diag.loc.line, diag.loc.col, diag.msg);
        let _ = writeln!(result, "  {}", diag.source_line);
        let spaces = diag.loc.col.saturating_sub(1) as usize;
        let _ = writeln!(result, "  {}^", " ".repeat(spaces));
    }
    result
}

/// Format the units active at the furthest failure, innermost last, one per
/// line and indented by depth.
pub fn format_trace<V>(result: &ParseResult<V>) -> String {
    let mut out = String::new();
    for (depth, unit) in result.error_trace.iter().enumerate() {
        let _ = writeln!(out, "{}{}", "  ".repeat(depth), unit);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::SourceLoc;
    use indoc::indoc;

    #[test]
    fn test_format_diagnostics() {
        let diag = Diagnostic {
            msg: "expected digit, found '+'".to_string(),
            loc: SourceLoc::new(4, 1, 5),
            source_line: "1 + + 2".to_string(),
        };
        let expected = indoc! {"
            calc.txt:1:5: expected digit, found '+'
              1 + + 2
                  ^
        "};
        assert_eq!(format_diagnostics(&[diag], "calc.txt"), expected);
    }

    #[test]
    fn test_format_nothing() {
        assert_eq!(format_diagnostics(&[], "x"), "");
    }
}
