use super::{Diagnostic, Location};
use crate::ast::{SourceMap, Span};

pub struct AnsiRenderer {
    pub use_color: bool,
}

impl AnsiRenderer {
    fn paint(&self, code: &str, s: &str) -> String {
        if self.use_color { format!("\x1b[{code}m{s}\x1b[0m") } else { s.to_string() }
    }

    fn bold(&self, s: &str) -> String {
        self.paint("1", s)
    }

    fn bold_red(&self, s: &str) -> String {
        self.paint("1;31", s)
    }

    fn cyan(&self, s: &str) -> String {
        self.paint("36", s)
    }

    fn dim(&self, s: &str) -> String {
        self.paint("2", s)
    }

    pub fn render(&self, d: &Diagnostic) -> String {
        let mut out = String::new();

        let head = match d.code {
            Some(code) => format!("error[{code}]"),
            None => "error".to_string(),
        };
        out.push_str(&format!("{}: {}\n", self.bold_red(&head), self.bold(&d.message)));

        match (d.location, &d.source) {
            (Some(location), Some(source)) => self.render_snippet(&mut out, location, source),
            (Some(Location::Line(line)), None) => {
                out.push_str(&format!("  {} line {line}\n", self.cyan("-->")));
            }
            _ => {}
        }

        for note in &d.notes {
            out.push_str(&format!("  {} note: {}\n", self.dim("="), note));
        }
        if let Some(suggestion) = &d.suggestion {
            out.push_str(&format!("  {} suggestion: {}\n", self.dim("="), suggestion));
        }
        out
    }

    fn render_snippet(&self, out: &mut String, location: Location, source: &str) {
        let map = SourceMap::new(source);
        // A line location underlines the instruction text, leading indentation excluded.
        let (line, span) = match location {
            Location::Offset(span) => (map.line_of(span.start), span),
            Location::Line(line) => {
                let whole = map.line_span(source, line);
                let text = map.line_text(source, line);
                let indent = text.len() - text.trim_start().len();
                (line, Span { start: whole.start + indent, end: whole.end })
            }
        };
        let text = map.line_text(source, line);
        let (_, col) = map.lookup(span.start);

        out.push_str(&format!("  {} {}:{}\n", self.cyan("-->"), line, col));

        let gutter = line.to_string().len();
        let pipe = self.cyan("|");
        let pad = " ".repeat(gutter);
        let number = self.cyan(&format!("{line:>gutter$}"));
        let width = span.end.saturating_sub(span.start).max(1);
        let carets = self.bold_red(&"^".repeat(width));
        let indent = " ".repeat(col.saturating_sub(1));

        out.push_str(&format!("{pad} {pipe}\n"));
        out.push_str(&format!("{number} {pipe} {text}\n"));
        out.push_str(&format!("{pad} {pipe} {indent}{carets}\n"));
        out.push_str(&format!("{pad} {pipe}\n"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = "start main 0:\n.entry:\n  r1 = udiv 1 0 64\n  ret r1\nend main\n";

    fn plain() -> AnsiRenderer {
        AnsiRenderer { use_color: false }
    }

    #[test]
    fn header_carries_code() {
        let d = Diagnostic::error("unknown instruction 'frob'").with_code("ASM-P015");
        assert!(plain().render(&d).starts_with("error[ASM-P015]: unknown instruction 'frob'\n"));
    }

    #[test]
    fn line_location_underlines_instruction() {
        let d = Diagnostic::error("division by zero").with_line(3).with_source(SOURCE);
        let out = plain().render(&d);
        assert!(out.contains("--> 3:3\n"), "{out}");
        assert!(out.contains("3 |   r1 = udiv 1 0 64\n"), "{out}");
        assert!(out.contains(&format!("  |   {}\n", "^".repeat(16))), "{out}");
    }

    #[test]
    fn offset_location_points_at_column() {
        let d = Diagnostic::error("unexpected input '#'")
            .with_span(Span { start: 28, end: 29 })
            .with_source("start main 0:\n.entry:\n  ret #\n");
        let out = plain().render(&d);
        assert!(out.contains("--> 3:7\n"), "{out}");
        assert!(out.contains("  |       ^\n"), "{out}");
    }

    #[test]
    fn line_without_source_still_locates() {
        let d = Diagnostic::error("division by zero").with_line(9);
        let out = plain().render(&d);
        assert!(out.contains("--> line 9\n"), "{out}");
        assert!(!out.contains('^'));
    }

    #[test]
    fn no_location_no_snippet() {
        let out = plain().render(&Diagnostic::error("missing main function").with_source(SOURCE));
        assert_eq!(out, "error: missing main function\n");
    }

    #[test]
    fn notes_and_suggestion_follow() {
        let d = Diagnostic::error("bad").with_note("while loading the cost table").with_suggestion("fix it");
        let out = plain().render(&d);
        assert!(out.contains("= note: while loading the cost table\n"));
        assert!(out.contains("= suggestion: fix it\n"));
    }

    #[test]
    fn color_only_when_asked() {
        let d = Diagnostic::error("bad").with_line(3).with_source(SOURCE);
        assert!(AnsiRenderer { use_color: true }.render(&d).contains("\x1b["));
        assert!(!plain().render(&d).contains("\x1b["));
    }
}
