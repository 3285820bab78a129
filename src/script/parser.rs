//! Loadfile line parser
//!
//! A line is `[timestamp] OP ["path" ["path2"]] [param...] status`. Quoted
//! tokens are always paths; an unquoted token is a path only if it starts
//! with `/`. Numeric parameters are decimal or `0x` hex.

use super::op::OpKind;
use super::{Operation, MAX_PARAMS};
use crate::error::ScriptError;

/// One token of a loadfile line
#[derive(Debug, Clone, PartialEq, Eq)]
enum Token<'a> {
    Quoted(&'a str),
    Bare(&'a str),
}

impl<'a> Token<'a> {
    fn text(&self) -> &'a str {
        match self {
            Token::Quoted(s) | Token::Bare(s) => s,
        }
    }
}

fn tokenize(line: &str, line_no: usize) -> Result<Vec<Token<'_>>, ScriptError> {
    let mut tokens = Vec::new();
    let mut rest = line.trim_start();

    while !rest.is_empty() {
        if let Some(after_quote) = rest.strip_prefix('"') {
            let end = after_quote.find('"').ok_or_else(|| ScriptError::Parse {
                line: line_no,
                reason: "unterminated quoted path".into(),
            })?;
            tokens.push(Token::Quoted(&after_quote[..end]));
            rest = &after_quote[end + 1..];
        } else {
            let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
            tokens.push(Token::Bare(&rest[..end]));
            rest = &rest[end..];
        }
        rest = rest.trim_start();
    }

    Ok(tokens)
}

fn parse_param(token: &str) -> Option<i64> {
    match token.strip_prefix("0x").or_else(|| token.strip_prefix("0X")) {
        Some(hex) => i64::from_str_radix(hex, 16).ok(),
        None => token.parse::<i64>().ok(),
    }
}

fn is_timestamp(token: &Token<'_>) -> bool {
    matches!(token, Token::Bare(s) if s.contains('.') && s.parse::<f64>().is_ok())
}

/// Parse one loadfile line
///
/// Returns `Ok(None)` for blank and comment lines. The returned operation
/// still carries unexpanded `$CLIENT` placeholders and client id 0.
pub fn parse_line(line: &str, line_no: usize) -> Result<Option<Operation>, ScriptError> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }

    let tokens = tokenize(trimmed, line_no)?;
    let mut tokens = tokens.as_slice();

    if tokens.first().is_some_and(is_timestamp) {
        tokens = &tokens[1..];
    }

    let (name, args) = tokens.split_first().ok_or_else(|| ScriptError::Parse {
        line: line_no,
        reason: "missing operation".into(),
    })?;
    let kind = OpKind::from_name(name.text()).ok_or_else(|| ScriptError::UnknownOperation {
        line: line_no,
        name: name.text().to_string(),
    })?;

    let (status, args) = args.split_last().ok_or_else(|| ScriptError::Parse {
        line: line_no,
        reason: format!("{} is missing its expected status", kind),
    })?;
    let expected = match status {
        Token::Bare(s) => s.to_string(),
        Token::Quoted(_) => {
            return Err(ScriptError::Parse {
                line: line_no,
                reason: "expected status must not be quoted".into(),
            })
        }
    };

    let mut paths = Vec::new();
    let mut params = [0i64; MAX_PARAMS];
    let mut nparams = 0;

    for token in args {
        match token {
            Token::Quoted(p) => paths.push(p.to_string()),
            Token::Bare(p) if p.starts_with('/') => paths.push(p.to_string()),
            Token::Bare(p) => {
                let value = parse_param(p).ok_or_else(|| ScriptError::Parse {
                    line: line_no,
                    reason: format!("invalid numeric parameter '{}'", p),
                })?;
                if nparams == MAX_PARAMS {
                    return Err(ScriptError::TooManyParams {
                        line: line_no,
                        max: MAX_PARAMS,
                    });
                }
                params[nparams] = value;
                nparams += 1;
            }
        }
    }

    if paths.len() != kind.path_count() {
        return Err(ScriptError::PathCount {
            line: line_no,
            op: kind,
            expected: kind.path_count(),
            found: paths.len(),
        });
    }

    if nparams < kind.min_params() {
        return Err(ScriptError::MissingParams {
            line: line_no,
            op: kind,
            needed: kind.min_params(),
            found: nparams,
        });
    }

    let mut paths = paths.into_iter();
    Ok(Some(Operation {
        kind,
        client: 0,
        line: line_no,
        path: paths.next().unwrap_or_default(),
        path2: paths.next(),
        expected,
        params,
        nparams,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skip_blank_and_comments() {
        assert!(parse_line("", 1).unwrap().is_none());
        assert!(parse_line("   ", 2).unwrap().is_none());
        assert!(parse_line("# a comment", 3).unwrap().is_none());
    }

    #[test]
    fn test_parse_write_with_timestamp() {
        let op = parse_line(
            "0.123 WRITE3 \"/clients/client$CLIENT/f 1\" 0 65536 2 0x00000000",
            4,
        )
        .unwrap()
        .unwrap();
        assert_eq!(op.kind, OpKind::Write);
        assert_eq!(op.line, 4);
        assert_eq!(op.path, "/clients/client$CLIENT/f 1");
        assert_eq!(op.path2, None);
        assert_eq!(op.params(), &[0, 65536, 2]);
        assert_eq!(op.expected, "0x00000000");
    }

    #[test]
    fn test_parse_two_path_op() {
        let op = parse_line("RENAME \"/a\" \"/b\" *", 1).unwrap().unwrap();
        assert_eq!(op.kind, OpKind::Rename);
        assert_eq!(op.path, "/a");
        assert_eq!(op.path2.as_deref(), Some("/b"));
        assert_eq!(op.expected, "*");
    }

    #[test]
    fn test_parse_no_path_op() {
        let op = parse_line("Fsstat3 0x00000000", 9).unwrap().unwrap();
        assert_eq!(op.kind, OpKind::Fsstat);
        assert!(op.path.is_empty());
        assert_eq!(op.nparams, 0);
    }

    #[test]
    fn test_hex_parameters() {
        let op = parse_line("LOCK /f 0x10 0x20 0x0", 1).unwrap().unwrap();
        assert_eq!(op.params(), &[16, 32]);
    }

    #[test]
    fn test_errors_carry_line_numbers() {
        assert!(matches!(
            parse_line("FROB \"/f\" *", 7),
            Err(ScriptError::UnknownOperation { line: 7, .. })
        ));
        assert!(matches!(
            parse_line("RENAME \"/a\" *", 8),
            Err(ScriptError::PathCount { line: 8, expected: 2, found: 1, .. })
        ));
        assert!(matches!(
            parse_line("READ \"/a\" 0 *", 9),
            Err(ScriptError::MissingParams { line: 9, needed: 2, found: 1, .. })
        ));
        assert!(matches!(
            parse_line("GETATTR \"/a", 10),
            Err(ScriptError::Parse { line: 10, .. })
        ));
        assert!(matches!(
            parse_line("GETATTR \"/a\" abc *", 11),
            Err(ScriptError::Parse { line: 11, .. })
        ));
        assert!(matches!(
            parse_line("GETATTR", 12),
            Err(ScriptError::Parse { line: 12, .. })
        ));
        assert!(matches!(
            parse_line("WRITE \"/a\" 1 2 3 4 5 6 7 8 9 10 11 *", 13),
            Err(ScriptError::TooManyParams { line: 13, max: 10 })
        ));
    }

    #[test]
    fn test_malformed_status_is_kept_verbatim() {
        // Fails closed later, in the validator
        let op = parse_line("GETATTR \"/a\" 0", 1).unwrap().unwrap();
        assert_eq!(op.expected, "0");
    }
}
