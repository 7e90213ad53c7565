//! Lexer for RASP source
//!
//! Tokenizes source into a stream for the parser.

use chumsky::prelude::*;
use std::ops::Range;

/// Token types for RASP
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Token {
    // Keywords
    Let,
    True,
    False,

    // Literals and identifiers
    Ident(String),
    Int(i64),
    Char(char),
    Str(String),

    // Punctuation
    LParen,    // (
    RParen,    // )
    Comma,     // ,
    Dot,       // .
    Semicolon, // ;
    Assign,    // =

    // Operators
    EqEq,    // ==
    NotEq,   // !=
    Le,      // <=
    Ge,      // >=
    Lt,      // <
    Gt,      // >
    Plus,    // +
    Minus,   // -
    Star,    // *
    Slash,   // /
    Percent, // %
    Amp,     // &
    Pipe,    // |
    Tilde,   // ~ (also written !)
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Let => write!(f, "let"),
            Token::True => write!(f, "true"),
            Token::False => write!(f, "false"),
            Token::Ident(s) => write!(f, "{}", s),
            Token::Int(n) => write!(f, "{}", n),
            Token::Char(c) => write!(f, "'{}'", c),
            Token::Str(s) => write!(f, "\"{}\"", s),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::Comma => write!(f, ","),
            Token::Dot => write!(f, "."),
            Token::Semicolon => write!(f, ";"),
            Token::Assign => write!(f, "="),
            Token::EqEq => write!(f, "=="),
            Token::NotEq => write!(f, "!="),
            Token::Le => write!(f, "<="),
            Token::Ge => write!(f, ">="),
            Token::Lt => write!(f, "<"),
            Token::Gt => write!(f, ">"),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::Percent => write!(f, "%"),
            Token::Amp => write!(f, "&"),
            Token::Pipe => write!(f, "|"),
            Token::Tilde => write!(f, "~"),
        }
    }
}

/// Type alias for spans
pub type Span = Range<usize>;

/// Create a lexer for RASP
pub fn lexer() -> impl Parser<char, Vec<(Token, Span)>, Error = Simple<char>> {
    let keyword_or_ident = text::ident().map(|s: String| match s.as_str() {
        "let" => Token::Let,
        "true" => Token::True,
        "false" => Token::False,
        _ => Token::Ident(s),
    });

    let int = text::int(10).try_map(|digits: String, span| {
        digits
            .parse::<i64>()
            .map(Token::Int)
            .map_err(|e| Simple::custom(span, format!("invalid integer: {}", e)))
    });

    let escape = just('\\').ignore_then(choice((
        just('\\'),
        just('\''),
        just('"'),
        just('n').to('\n'),
        just('t').to('\t'),
    )));

    let char_lit = escape
        .clone()
        .or(none_of("\\'"))
        .delimited_by(just('\''), just('\''))
        .map(Token::Char);

    let str_lit = escape
        .or(none_of("\\\""))
        .repeated()
        .delimited_by(just('"'), just('"'))
        .collect::<String>()
        .map(Token::Str);

    // Two-character operators must come before their one-character prefixes
    let punctuation = choice((
        just("==").to(Token::EqEq),
        just("!=").to(Token::NotEq),
        just("<=").to(Token::Le),
        just(">=").to(Token::Ge),
        just('<').to(Token::Lt),
        just('>').to(Token::Gt),
        just('=').to(Token::Assign),
        just('(').to(Token::LParen),
        just(')').to(Token::RParen),
        just(',').to(Token::Comma),
        just('.').to(Token::Dot),
        just(';').to(Token::Semicolon),
        just('+').to(Token::Plus),
        just('-').to(Token::Minus),
        just('*').to(Token::Star),
        just('%').to(Token::Percent),
        just('&').to(Token::Amp),
        just('|').to(Token::Pipe),
        just('~').to(Token::Tilde),
        just('!').to(Token::Tilde),
    ));

    // Comments: // to end of line (handles both mid-file and end-of-file)
    // Must be tried before '/' so it is not lexed as two Slash tokens
    let line_comment = just("//")
        .then(none_of('\n').repeated())
        .then(just('\n').or_not())
        .ignored();

    let slash = just('/').to(Token::Slash);

    let token = choice((keyword_or_ident, int, char_lit, str_lit, punctuation, slash));

    // Token OR comment - comments produce None, tokens produce Some
    let token_or_skip = line_comment.to(None).or(token.map(Some));

    token_or_skip
        .map_with_span(|opt_tok, span| opt_tok.map(|tok| (tok, span)))
        .padded()
        .repeated()
        .then_ignore(end())
        .map(|items| items.into_iter().flatten().collect())
}

// Unit tests live in tests/unit_parsing.rs
