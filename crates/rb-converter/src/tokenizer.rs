//! Argument and command splitting.
//!
//! Only delimiter structure is interpreted here. Argument contents such as
//! `$` or `/regex/` literals pass through untouched.

use std::iter::Peekable;
use std::str::Chars;

/// Structural failure while splitting call text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SyntaxError {
    #[error("{}", self.reason())]
    UnterminatedQuote,
    #[error("{}", self.reason())]
    UnbalancedParens,
}

impl SyntaxError {
    pub fn reason(self) -> &'static str {
        match self {
            Self::UnterminatedQuote => "unterminated quote",
            Self::UnbalancedParens => "unbalanced parentheses",
        }
    }
}

/// One argument of a parenthesized call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub value: String,
    /// The whole argument was wrapped in `'` or `"`.
    pub quoted: bool,
}

// =============================================================================
// Comma-separated calls: `(name, arg, 'arg')`
// =============================================================================

/// Split the interior of a call's parentheses into arguments.
///
/// Commas split only at the top level: `\,` is a literal comma. A token is
/// quoted only when its quotes wrap the whole argument; `"a" in b` is read as
/// a literal.
pub fn split_args(text: &str) -> Result<Vec<Token>, SyntaxError> {
    let mut tokens = Vec::new();
    if text.trim().is_empty() {
        return Ok(tokens);
    }

    let mut chars = text.chars().peekable();
    loop {
        skip_whitespace(&mut chars);
        let token = match chars.peek().copied() {
            Some(quote @ ('\'' | '"')) => {
                let start = chars.clone();
                chars.next();
                let value = read_quoted(&mut chars, quote)?;
                skip_whitespace(&mut chars);
                if matches!(chars.peek(), None | Some(',')) {
                    Token { value, quoted: true }
                } else {
                    chars = start;
                    Token {
                        value: read_unquoted(&mut chars),
                        quoted: false,
                    }
                }
            }
            _ => Token {
                value: read_unquoted(&mut chars),
                quoted: false,
            },
        };
        tokens.push(token);

        // Either a separator or the end of input
        if chars.next().is_none() {
            break;
        }
    }

    Ok(tokens)
}

fn skip_whitespace(chars: &mut Peekable<Chars<'_>>) {
    while chars.next_if(|c| c.is_whitespace()).is_some() {}
}

/// Body of a quoted token, after the opening quote.
///
/// A run of backslashes counts as escapes only in front of a quote character:
/// `2n` backslashes leave `n` and the quote, `2n + 1` leave `n` and a literal
/// quote. Elsewhere backslashes are kept as written.
fn read_quoted(chars: &mut Peekable<Chars<'_>>, quote: char) -> Result<String, SyntaxError> {
    let mut value = String::new();
    loop {
        match chars.next() {
            None => return Err(SyntaxError::UnterminatedQuote),
            Some('\\') => {
                let mut run = 1;
                while chars.next_if_eq(&'\\').is_some() {
                    run += 1;
                }
                match chars.peek().copied() {
                    Some(next @ ('\'' | '"')) => {
                        value.extend(std::iter::repeat('\\').take(run / 2));
                        if run % 2 == 1 {
                            chars.next();
                            value.push(next);
                        }
                    }
                    _ => value.extend(std::iter::repeat('\\').take(run)),
                }
            }
            Some(c) if c == quote => return Ok(value),
            Some(c) => value.push(c),
        }
    }
}

/// `value` wrapped in `quote`, readable back by `split_args`.
pub fn quote_with(value: &str, quote: char) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push(quote);
    let mut run = 0;
    for c in value.chars() {
        match c {
            '\\' => run += 1,
            '\'' | '"' => {
                let escapes = if c == quote { 2 * run + 1 } else { 2 * run };
                out.extend(std::iter::repeat('\\').take(escapes));
                out.push(c);
                run = 0;
            }
            c => {
                out.extend(std::iter::repeat('\\').take(run));
                out.push(c);
                run = 0;
            }
        }
    }
    out.extend(std::iter::repeat('\\').take(2 * run));
    out.push(quote);
    out
}

fn read_unquoted(chars: &mut Peekable<Chars<'_>>) -> String {
    let mut value = String::new();
    while let Some(&c) = chars.peek() {
        match c {
            ',' => break,
            '\\' => {
                chars.next();
                if chars.next_if_eq(&',').is_some() {
                    value.push(',');
                } else {
                    value.push('\\');
                }
            }
            _ => {
                chars.next();
                value.push(c);
            }
        }
    }
    value.truncate(value.trim_end().len());
    value
}

/// Interior of `( ... )` where `(` opens the text and `)` closes it.
pub fn find_call_parens(text: &str) -> Result<&str, SyntaxError> {
    let trimmed = text.trim();
    trimmed
        .strip_prefix('(')
        .and_then(|rest| rest.strip_suffix(')'))
        .ok_or(SyntaxError::UnbalancedParens)
}

// =============================================================================
// Space-separated commands: `name arg 'arg two'; name2`
// =============================================================================

/// Split a snippet filter body into its `;`-separated commands.
///
/// Semicolons inside single quotes or behind a backslash do not split. Empty
/// commands are dropped.
pub fn split_commands(text: &str) -> Result<Vec<&str>, SyntaxError> {
    let mut commands = Vec::new();
    let mut start = 0;
    let mut in_quote = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '\'' => in_quote = !in_quote,
            ';' if !in_quote => {
                commands.push(&text[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if in_quote {
        return Err(SyntaxError::UnterminatedQuote);
    }
    commands.push(&text[start..]);

    Ok(commands
        .into_iter()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .collect())
}

/// Split one snippet command into whitespace-separated words.
///
/// Single quotes group text containing spaces and may appear mid-word. A
/// backslash escapes the next character; `\n`, `\t` and `\r` stand for the
/// control characters.
pub fn split_words(command: &str) -> Result<Vec<String>, SyntaxError> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut in_quote = false;
    let mut chars = command.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                in_word = true;
                match chars.next() {
                    Some('n') => current.push('\n'),
                    Some('t') => current.push('\t'),
                    Some('r') => current.push('\r'),
                    Some(other) => current.push(other),
                    None => current.push('\\'),
                }
            }
            '\'' => {
                in_word = true;
                in_quote = !in_quote;
            }
            c if c.is_whitespace() && !in_quote => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            c => {
                in_word = true;
                current.push(c);
            }
        }
    }
    if in_quote {
        return Err(SyntaxError::UnterminatedQuote);
    }
    if in_word {
        words.push(current);
    }

    Ok(words)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(text: &str) -> Vec<String> {
        split_args(text)
            .unwrap()
            .into_iter()
            .map(|t| t.value)
            .collect()
    }

    #[test]
    fn test_escaped_comma_is_literal() {
        assert_eq!(values("a\\,b, c"), vec!["a,b", "c"]);
    }

    #[test]
    fn test_quoted_comma_does_not_split() {
        assert_eq!(values("'a, b', c"), vec!["a, b", "c"]);
        let tokens = split_args("'a, b', c").unwrap();
        assert!(tokens[0].quoted);
        assert!(!tokens[1].quoted);
    }

    #[test]
    fn test_quote_escapes() {
        assert_eq!(values(r#"'it\'s', "say \"hi\"""#), vec!["it's", "say \"hi\""]);
        assert_eq!(values(r"'/\d+/'"), vec![r"/\d+/"]);
    }

    #[test]
    fn test_contents_are_not_interpreted() {
        assert_eq!(values("set-constant, $, /a(b/"), vec!["set-constant", "$", "/a(b/"]);
        assert_eq!(values("remove-node-text, #text, don't"), vec!["remove-node-text", "#text", "don't"]);
    }

    #[test]
    fn test_empty_and_blank_arguments() {
        assert!(split_args("   ").unwrap().is_empty());
        assert_eq!(values("a, , b"), vec!["a", "", "b"]);
        assert_eq!(values("a,"), vec!["a", ""]);
        assert_eq!(values("'a', ''"), vec!["a", ""]);
    }

    #[test]
    fn test_unterminated_quote_fails() {
        assert_eq!(split_args("'a, b"), Err(SyntaxError::UnterminatedQuote));
        assert_eq!(SyntaxError::UnterminatedQuote.to_string(), "unterminated quote");
        assert_eq!(SyntaxError::UnbalancedParens.to_string(), SyntaxError::UnbalancedParens.reason());
    }

    #[test]
    fn test_partial_quotes_are_literal() {
        let tokens = split_args(r#"script, "adblock" in window"#).unwrap();
        assert_eq!(tokens[1].value, r#""adblock" in window"#);
        assert!(!tokens[1].quoted);

        assert_eq!(values("'a'b, c"), vec!["'a'b", "c"]);
        assert_eq!(values(r#" "yes" , x"#), vec!["yes", "x"]);
    }

    #[test]
    fn test_backslashes_before_quotes() {
        assert_eq!(values(r"'/foo\\'"), vec![r"/foo\"]);
        assert_eq!(values(r"'a\\\'b'"), vec![r"a\'b"]);
        assert_eq!(values(r#"'a\\"'"#), vec![r#"a\""#]);
        assert_eq!(values(r"'a\\b'"), vec![r"a\\b"]);
    }

    #[test]
    fn test_quote_with_reads_back() {
        let samples = [
            "plain",
            "",
            "it's",
            r#""yes""#,
            r"/foo\",
            r"\",
            r"a\'b",
            r#"a\"b"#,
            r"/\d+/",
            " padded ",
            "a, b",
        ];
        for sample in samples {
            for quote in ['\'', '"'] {
                let text = quote_with(sample, quote);
                let tokens = split_args(&text).unwrap();
                assert_eq!(tokens.len(), 1, "{text}");
                assert_eq!(tokens[0].value, sample, "{text}");
                assert!(tokens[0].quoted, "{text}");
            }
        }
    }

    #[test]
    fn test_find_call_parens() {
        assert_eq!(find_call_parens(" ('a', 'b') "), Ok("'a', 'b'"));
        assert_eq!(find_call_parens("(a, b"), Err(SyntaxError::UnbalancedParens));
        assert_eq!(find_call_parens("a, b)"), Err(SyntaxError::UnbalancedParens));
    }

    #[test]
    fn test_split_commands() {
        assert_eq!(
            split_commands("log 'a;b'; abort-on-property-read x;").unwrap(),
            vec!["log 'a;b'", "abort-on-property-read x"]
        );
        assert_eq!(split_commands(r"log a\;b").unwrap(), vec![r"log a\;b"]);
        assert_eq!(split_commands("log 'a"), Err(SyntaxError::UnterminatedQuote));
    }

    #[test]
    fn test_split_words() {
        assert_eq!(
            split_words("hide-if-contains 'two words' x'y z'").unwrap(),
            vec!["hide-if-contains", "two words", "xy z"]
        );
        assert_eq!(split_words(r"log a\ b \n ''").unwrap(), vec!["log", "a b", "\n", ""]);
        assert_eq!(split_words(r"log a\;b").unwrap(), vec!["log", "a;b"]);
    }
}
