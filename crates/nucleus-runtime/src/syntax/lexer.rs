//! Tokens of the generated-source dialect.

use logos::Logos;
use std::ops::Range;

use super::ParseError;

/// A token of the generated-source dialect.
///
/// Keywords are matched before identifiers, so `type` lexes as
/// [`Token::Type`] while `type_` is an identifier.
#[allow(missing_docs)]
#[derive(Logos, Debug, Clone, PartialEq, Eq)]
#[logos(skip(r"([ \t\r\n\f]+|//[^\n]*)", allow_greedy = true))]
pub enum Token<'src> {
    #[token("import")]
    Import,

    #[token("from")]
    From,

    #[token("export")]
    Export,

    #[token("function")]
    Function,

    #[token("async")]
    Async,

    #[token("await")]
    Await,

    #[token("class")]
    Class,

    #[token("extends")]
    Extends,

    #[token("const")]
    Const,

    #[token("let")]
    Let,

    #[token("return")]
    Return,

    #[token("interface")]
    Interface,

    #[token("type")]
    Type,

    #[token("as")]
    As,

    #[token("true")]
    True,

    #[token("false")]
    False,

    #[token("null")]
    Null,

    #[token("{")]
    LBrace,

    #[token("}")]
    RBrace,

    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token("[")]
    LBracket,

    #[token("]")]
    RBracket,

    #[token("<")]
    LAngle,

    #[token(">")]
    RAngle,

    #[token(",")]
    Comma,

    #[token(";")]
    Semicolon,

    #[token(":")]
    Colon,

    #[token(".")]
    Dot,

    #[token("=")]
    Eq,

    #[token("|")]
    Pipe,

    #[token("?")]
    Question,

    #[regex(r"[A-Za-z_$][A-Za-z0-9_$]*", |lex| lex.slice())]
    Ident(&'src str),

    #[regex(r"[0-9]+(\.[0-9]+)?", |lex| lex.slice())]
    Number(&'src str),

    #[regex(r#""([^"\\\n]|\\.)*""#, |lex| lex.slice())]
    #[regex(r"'([^'\\\n]|\\.)*'", |lex| lex.slice())]
    Str(&'src str),
}

impl Token<'_> {
    /// Source text of a keyword token, used when a keyword appears where a
    /// property name is expected.
    #[must_use]
    pub const fn keyword(&self) -> Option<&'static str> {
        Some(match self {
            Self::Import => "import",
            Self::From => "from",
            Self::Export => "export",
            Self::Function => "function",
            Self::Async => "async",
            Self::Await => "await",
            Self::Class => "class",
            Self::Extends => "extends",
            Self::Const => "const",
            Self::Let => "let",
            Self::Return => "return",
            Self::Interface => "interface",
            Self::Type => "type",
            Self::As => "as",
            Self::True => "true",
            Self::False => "false",
            Self::Null => "null",
            _ => return None,
        })
    }

    /// Returns `true` for tokens that can start a top-level item.
    #[must_use]
    pub const fn starts_item(&self) -> bool {
        matches!(
            self,
            Self::Import
                | Self::Export
                | Self::Function
                | Self::Async
                | Self::Class
                | Self::Const
                | Self::Let
                | Self::Interface
                | Self::Type
        )
    }
}

/// Maps byte offsets to 1-based line and column numbers.
#[derive(Debug, Clone)]
pub struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    /// Indexes the line starts of `input`.
    #[must_use]
    pub fn new(input: &str) -> Self {
        let starts = std::iter::once(0)
            .chain(input.match_indices('\n').map(|(at, _)| at + 1))
            .collect();
        Self { starts }
    }

    /// Line and column of `offset`.
    #[must_use]
    pub fn position(&self, offset: usize) -> (usize, usize) {
        let line = self.starts.partition_point(|&start| start <= offset);
        let start = self.starts[line.saturating_sub(1)];
        (line.max(1), offset - start + 1)
    }
}

/// Splits `input` into tokens with their byte spans.
///
/// Characters no token matches are skipped and reported, so a stray
/// character only breaks the item it appears in.
#[must_use]
pub fn tokenize<'src>(
    input: &'src str,
    lines: &LineIndex,
) -> (Vec<(Token<'src>, Range<usize>)>, Vec<ParseError>) {
    let mut tokens = Vec::new();
    let mut errors = Vec::new();
    for (result, span) in Token::lexer(input).spanned() {
        match result {
            Ok(token) => tokens.push((token, span)),
            Err(()) => {
                let (line, column) = lines.position(span.start);
                errors.push(ParseError {
                    line,
                    column,
                    message: format!("unexpected character {:?}", &input[span]),
                });
            }
        }
    }
    (tokens, errors)
}

/// Returns the contents of a quoted string token.
#[must_use]
pub fn unquote(raw: &str) -> String {
    if raw.starts_with('"') {
        if let Ok(text) = serde_json::from_str::<String>(raw) {
            return text;
        }
    }
    let inner = raw.get(1..raw.len().saturating_sub(1)).unwrap_or_default();
    inner.replace("\\'", "'").replace("\\\\", "\\")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<Token<'_>> {
        tokenize(input, &LineIndex::new(input))
            .0
            .into_iter()
            .map(|(token, _)| token)
            .collect()
    }

    #[test]
    fn test_keywords_and_identifiers() {
        assert_eq!(
            kinds("export const type_ = U32;"),
            vec![
                Token::Export,
                Token::Const,
                Token::Ident("type_"),
                Token::Eq,
                Token::Ident("U32"),
                Token::Semicolon,
            ]
        );
    }

    #[test]
    fn test_comments_are_skipped() {
        assert_eq!(
            kinds("// header\nclass // trailing\nA"),
            vec![Token::Class, Token::Ident("A")]
        );
    }

    #[test]
    fn test_strings_and_numbers() {
        assert_eq!(
            kinds(r#""@nucleus/codec" 'x' 32 1.5"#),
            vec![
                Token::Str("\"@nucleus/codec\""),
                Token::Str("'x'"),
                Token::Number("32"),
                Token::Number("1.5"),
            ]
        );
    }

    #[test]
    fn test_unexpected_character_position() {
        let input = "const A = 1;\n  #";
        let (tokens, errors) = tokenize(input, &LineIndex::new(input));
        assert_eq!(tokens.len(), 5);
        assert_eq!((errors[0].line, errors[0].column), (2, 3));
    }

    #[test]
    fn test_unquote() {
        assert_eq!(unquote(r#""a\"b""#), "a\"b");
        assert_eq!(unquote(r"'it\'s'"), "it's");
    }

    #[test]
    fn test_line_index() {
        let index = LineIndex::new("ab\ncd\n");
        assert_eq!(index.position(0), (1, 1));
        assert_eq!(index.position(4), (2, 2));
    }
}
