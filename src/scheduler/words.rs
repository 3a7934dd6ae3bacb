//! Shell Word Handling
//!
//! POSIX-style word splitting for configured passthrough arguments, and
//! quoting for logging a reproducible command line.
//!
//! Splitting honours single quotes, double quotes and backslash escapes.
//! A `#` has no special meaning: configured arguments never carry
//! comments, and schedulers accept `#` inside values (e.g. `-N job#1`).

use std::fmt;

/// Reason a string could not be split into words.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitError {
    UnterminatedSingleQuote,
    UnterminatedDoubleQuote,
    TrailingBackslash,
}

impl fmt::Display for SplitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            SplitError::UnterminatedSingleQuote => "unterminated single quote",
            SplitError::UnterminatedDoubleQuote => "unterminated double quote",
            SplitError::TrailingBackslash => "no character after backslash",
        };
        f.write_str(msg)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum State {
    Unquoted,
    Single,
    Double,
}

/// Splits `input` into words using shell quoting rules.
///
/// # Example
///
/// ```
/// use gridrunner::scheduler::words::split_words;
///
/// let words = split_words(r#"-l "h_vmem=4G, h_rt=1:00:00" -P lab"#).unwrap();
/// assert_eq!(words, vec!["-l", "h_vmem=4G, h_rt=1:00:00", "-P", "lab"]);
/// ```
pub fn split_words(input: &str) -> Result<Vec<String>, SplitError> {
    let mut words = Vec::new();
    let mut current = String::new();
    // Distinguishes an empty quoted word ('') from no word at all
    let mut in_word = false;
    let mut state = State::Unquoted;
    let mut chars = input.chars();

    while let Some(c) = chars.next() {
        match state {
            State::Unquoted => match c {
                c if c.is_whitespace() => {
                    if in_word {
                        words.push(std::mem::take(&mut current));
                        in_word = false;
                    }
                }
                '\'' => {
                    state = State::Single;
                    in_word = true;
                }
                '"' => {
                    state = State::Double;
                    in_word = true;
                }
                '\\' => {
                    let escaped = chars.next().ok_or(SplitError::TrailingBackslash)?;
                    current.push(escaped);
                    in_word = true;
                }
                c => {
                    current.push(c);
                    in_word = true;
                }
            },
            State::Single => match c {
                '\'' => state = State::Unquoted,
                c => current.push(c),
            },
            State::Double => match c {
                '"' => state = State::Unquoted,
                '\\' => {
                    let next = chars.next().ok_or(SplitError::UnterminatedDoubleQuote)?;
                    if next != '"' && next != '\\' {
                        current.push('\\');
                    }
                    current.push(next);
                }
                c => current.push(c),
            },
        }
    }

    match state {
        State::Single => Err(SplitError::UnterminatedSingleQuote),
        State::Double => Err(SplitError::UnterminatedDoubleQuote),
        State::Unquoted => {
            if in_word {
                words.push(current);
            }
            Ok(words)
        }
    }
}

/// Renders `tokens` as a single shell-quoted command line.
pub fn quote_all(tokens: &[String]) -> String {
    shlex::try_join(tokens.iter().map(String::as_str)).unwrap_or_else(|_| {
        // Only NUL bytes are unquotable; fall back to a debug rendering
        format!("{:?}", tokens)
    })
}
