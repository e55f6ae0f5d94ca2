//! Splitting command lines into words, roughly the way a POSIX shell does.

use crate::ParseError;

/// Something that can be executed: a line of text, or words that were already split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandLine {
    Text(String),
    Tokens(Vec<String>),
}

impl CommandLine {
    pub fn into_tokens(self) -> Result<Vec<String>, ParseError> {
        match self {
            CommandLine::Text(text) => split(&text),
            CommandLine::Tokens(tokens) => Ok(tokens),
        }
    }
}

impl From<&str> for CommandLine {
    fn from(text: &str) -> CommandLine {
        CommandLine::Text(text.to_string())
    }
}

impl From<String> for CommandLine {
    fn from(text: String) -> CommandLine {
        CommandLine::Text(text)
    }
}

impl From<&String> for CommandLine {
    fn from(text: &String) -> CommandLine {
        CommandLine::Text(text.clone())
    }
}

impl From<Vec<String>> for CommandLine {
    fn from(tokens: Vec<String>) -> CommandLine {
        CommandLine::Tokens(tokens)
    }
}

impl From<Vec<&str>> for CommandLine {
    fn from(tokens: Vec<&str>) -> CommandLine {
        tokens.into_iter().collect()
    }
}

impl From<&[&str]> for CommandLine {
    fn from(tokens: &[&str]) -> CommandLine {
        tokens.iter().copied().collect()
    }
}

impl<const N: usize> From<[&str; N]> for CommandLine {
    fn from(tokens: [&str; N]) -> CommandLine {
        tokens.into_iter().collect()
    }
}

impl<S: Into<String>> FromIterator<S> for CommandLine {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> CommandLine {
        CommandLine::Tokens(iter.into_iter().map(Into::into).collect())
    }
}

/// Whitespace separates words. Single quotes keep everything literally, double quotes
/// allow `\"` and `\\`, a backslash outside of quotes escapes the next character.
pub fn split(line: &str) -> Result<Vec<String>, ParseError> {
    let mut res = Vec::new();
    let mut word = String::new();
    let mut in_word = false;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match c {
            c if c.is_whitespace() => {
                if in_word {
                    res.push(std::mem::take(&mut word));
                    in_word = false;
                }
            }
            '\'' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(c) => word.push(c),
                        None => return Err(ParseError::new(format!("Unterminated quote in `{line}`"))),
                    }
                }
            }
            '"' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some(c @ ('"' | '\\')) => word.push(c),
                            Some(c) => {
                                word.push('\\');
                                word.push(c);
                            }
                            None => {
                                return Err(ParseError::new(format!(
                                    "Unterminated quote in `{line}`"
                                )))
                            }
                        },
                        Some(c) => word.push(c),
                        None => return Err(ParseError::new(format!("Unterminated quote in `{line}`"))),
                    }
                }
            }
            '\\' => {
                in_word = true;
                match chars.next() {
                    Some(c) => word.push(c),
                    None => return Err(ParseError::new(format!("Dangling escape in `{line}`"))),
                }
            }
            c => {
                in_word = true;
                word.push(c);
            }
        }
    }
    if in_word {
        res.push(word);
    }
    Ok(res)
}
