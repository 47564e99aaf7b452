pub mod ast;
pub mod config;
pub mod diagnostic;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod report;

use std::path::PathBuf;

pub use config::CostModel;
pub use interpreter::{Console, RuntimeError, run};
pub use report::Report;

/// Any failure between reading a program file and producing its report.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Lex(#[from] lexer::LexError),
    #[error(transparent)]
    Parse(#[from] parser::ParseError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
    #[error(transparent)]
    Config(#[from] config::ConfigError),
    #[error("cannot serialize output: {0}")]
    Json(#[from] serde_json::Error),
}

/// Lex and parse a program.
pub fn load(source: &str) -> Result<ast::Program, Error> {
    let tokens = lexer::lex(source)?;
    Ok(parser::parse(source, tokens)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_reports_lex_errors() {
        let err = load("start main 0:\n.entry:\n  ret #\nend main\n").unwrap_err();
        assert!(matches!(err, Error::Lex(_)), "{err:?}");
    }

    #[test]
    fn load_reports_parse_errors() {
        let err = load("start main 0:\n.entry:\n  r1 = frobnicate 1\n  ret r1\nend main\n").unwrap_err();
        match err {
            Error::Parse(e) => assert_eq!(e.line, 3),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn serialization_failures_convert() {
        let json_err = serde_json::from_str::<u64>("not json").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
        assert!(err.to_string().starts_with("cannot serialize output: "), "{err}");
    }

    #[test]
    fn load_then_run() {
        let prog = load("start main 0:\n.entry:\n  ret 7\nend main\n").unwrap();
        let report = run(&prog, CostModel::default(), Console::null()).unwrap();
        assert_eq!(report.result, 7);
        assert_eq!(report.cost, 1.0);
    }
}
