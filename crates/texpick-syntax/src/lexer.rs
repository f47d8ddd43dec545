use crate::component::ComponentKind;

/// Token classes produced by the [`Lexer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// `\section`, `\item`, `\\`, `\%`
    Command,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Whitespace,
    /// Everything else, consumed greedily until a special character.
    Text,
}

/// A lexer for LaTeX source code.
///
/// ## Overview
///
/// The lexer performs **character-level scanning** of LaTeX source, producing
/// a stream of ([`TokenKind`], `&str`, offset) triples. It only knows about the
/// characters that matter for locating headings: commands, braces and
/// brackets. Comments, math and verbatim regions are plain text to it.
///
/// Offsets are byte positions into the input and always fall on character
/// boundaries.
///
/// ## Examples
///
/// ```
/// use texpick_syntax::lexer::{Lexer, TokenKind};
///
/// let tokens: Vec<_> = Lexer::new(r"\section{Hello}").collect();
///
/// assert_eq!(tokens[0], (TokenKind::Command, r"\section", 0));
/// assert_eq!(tokens[1], (TokenKind::LBrace, "{", 8));
/// assert_eq!(tokens[2], (TokenKind::Text, "Hello", 9));
/// ```
pub struct Lexer<'a> {
    /// The input source text being lexed.
    input: &'a str,
    /// Current byte position in the input.
    position: usize,
}

impl<'a> Lexer<'a> {
    /// Creates a new `Lexer` for the given input string.
    pub fn new(input: &'a str) -> Self {
        Self { input, position: 0 }
    }

    /// Returns the next token, or `None` at end of input.
    pub fn next_token(&mut self) -> Option<(TokenKind, &'a str, usize)> {
        let start = self.position;
        let mut chars = self.input[start..].chars();
        let c = chars.next()?;

        let kind = match c {
            '\\' => {
                self.position += c.len_utf8();
                if let Some(next) = chars.next() {
                    if next.is_ascii_alphabetic() {
                        // Multi-letter command: \section
                        self.position += next.len_utf8();
                        while let Some(n) = self.input[self.position..].chars().next() {
                            if n.is_ascii_alphabetic() {
                                self.position += n.len_utf8();
                            } else {
                                break;
                            }
                        }
                    } else {
                        // Single-symbol command: \\ or \{
                        self.position += next.len_utf8();
                    }
                }
                TokenKind::Command
            }
            '{' => {
                self.position += c.len_utf8();
                TokenKind::LBrace
            }
            '}' => {
                self.position += c.len_utf8();
                TokenKind::RBrace
            }
            '[' => {
                self.position += c.len_utf8();
                TokenKind::LBracket
            }
            ']' => {
                self.position += c.len_utf8();
                TokenKind::RBracket
            }
            c if c.is_whitespace() => {
                self.position += c.len_utf8();
                while let Some(n) = self.input[self.position..].chars().next() {
                    if n.is_whitespace() {
                        self.position += n.len_utf8();
                    } else {
                        break;
                    }
                }
                TokenKind::Whitespace
            }
            _ => {
                self.position += c.len_utf8();
                while let Some(n) = self.input[self.position..].chars().next() {
                    match n {
                        '\\' | '{' | '}' | '[' | ']' => break,
                        c if c.is_whitespace() => break,
                        _ => self.position += n.len_utf8(),
                    }
                }
                TokenKind::Text
            }
        };

        Some((kind, &self.input[start..self.position], start))
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = (TokenKind, &'a str, usize);

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token()
    }
}

/// A sectioning command found in the source, immediately followed by `{`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeadingMarker {
    pub kind: ComponentKind,
    /// Byte offset of the leading backslash.
    pub offset: usize,
    /// Byte offset just past the opening brace of the title.
    pub title_start: usize,
}

impl HeadingMarker {
    pub fn level(&self) -> u8 {
        self.kind.level()
    }
}

/// Scans `text` for heading markers.
///
/// Only the exact forms `\section{`, `\subsection{` and `\subsubsection{`
/// count; starred variants and headings with optional short titles are not
/// markers. Offsets are shifted by `base` so callers can scan a slice of a
/// larger document.
pub fn heading_markers(text: &str, base: usize) -> Vec<HeadingMarker> {
    let mut markers = Vec::new();
    let mut tokens = Lexer::new(text).peekable();

    while let Some((kind, lexeme, offset)) = tokens.next() {
        if kind != TokenKind::Command {
            continue;
        }
        let Some(heading) = ComponentKind::from_command(lexeme) else {
            continue;
        };
        if let Some(&(TokenKind::LBrace, brace, brace_offset)) = tokens.peek() {
            markers.push(HeadingMarker {
                kind: heading,
                offset: base + offset,
                title_start: base + brace_offset + brace.len(),
            });
        }
    }

    markers
}
