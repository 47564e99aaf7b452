use logos::Logos;

#[derive(Logos, Debug, PartialEq, Clone)]
#[logos(skip r"[ \t\r]+")]
#[logos(skip(r";[^\n]*", allow_greedy = true))]
pub enum Token {
    #[token(":")]
    Colon,
    #[token("=")]
    Assign,

    /// `.label`, stored without the leading dot
    #[regex(r"\.[A-Za-z0-9_][A-Za-z0-9_.]*", |lex| lex.slice()[1..].to_string())]
    Label(String),

    /// Negative literals wrap to their two's complement encoding.
    #[regex(r"-?[0-9]+", |lex| parse_int(lex.slice()))]
    Int(u64),

    // Mnemonics, registers and function names all lex as identifiers; the parser sorts them out.
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),

    // One statement per line
    #[token("\n")]
    Newline,
}

fn parse_int(s: &str) -> Option<u64> {
    match s.strip_prefix('-') {
        Some(digits) => {
            let magnitude: u64 = digits.parse().ok()?;
            (magnitude <= 1 << 63).then(|| magnitude.wrapping_neg())
        }
        None => s.parse().ok(),
    }
}

/// Lex source text into tokens with byte ranges.
/// Stops at the first bad character and reports where it is.
pub fn lex(source: &str) -> Result<Vec<(Token, std::ops::Range<usize>)>, LexError> {
    let mut lexer = Token::lexer(source);
    let mut tokens = Vec::new();

    while let Some(result) = lexer.next() {
        match result {
            Ok(token) => tokens.push((token, lexer.span())),
            Err(()) => {
                let span = lexer.span();
                return Err(LexError {
                    position: span.start,
                    snippet: source[span.clone()].to_string(),
                    suggestion: suggest_fix(&source[span]),
                });
            }
        }
    }

    Ok(tokens)
}

fn suggest_fix(bad_token: &str) -> String {
    if bad_token.starts_with('-') || bad_token.bytes().all(|b| b.is_ascii_digit()) {
        "Integer literals must fit in 64 bits.".to_string()
    } else if bad_token == "." {
        "Labels are written '.name'.".to_string()
    } else if bad_token == "#" || bad_token == "//" {
        "Comments start with ';'.".to_string()
    } else {
        format!("Unexpected character(s): '{}'.", bad_token)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Lex error at position {position}: '{snippet}'. {suggestion}")]
pub struct LexError {
    pub position: usize,
    pub snippet: String,
    pub suggestion: String,
}
