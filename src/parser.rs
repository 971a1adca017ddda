use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char, digit1, not_line_ending, one_of, satisfy},
    combinator::{not, opt, recognize, value},
    error::ErrorKind,
    sequence::{pair, preceded, terminated},
};

use crate::ast::{Expr, IntegerType, is_symbol_char};
use crate::{Error, MAX_PARSE_DEPTH, ParseError, ParseErrorKind};

/// Characters skipped between data
const WHITESPACE: &str = " \t\r\n";

/// Parser options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseConfig {
    /// Treat `;` as the start of a comment running to the end of the line
    pub handle_comments: bool,
}

type ParseResult<'a, T> = IResult<&'a str, T>;

fn failure(input: &str, code: ErrorKind) -> nom::Err<nom::error::Error<&str>> {
    nom::Err::Failure(nom::error::Error::new(input, code))
}

/// Once a compound datum has started, any error inside it is final
fn commit(err: nom::Err<nom::error::Error<&str>>) -> nom::Err<nom::error::Error<&str>> {
    match err {
        nom::Err::Error(e) => nom::Err::Failure(e),
        other => other,
    }
}

/// Convert nom parsing errors to structured parse errors
fn parse_error_from_nom(input: &str, error: nom::Err<nom::error::Error<&str>>) -> ParseError {
    match error {
        nom::Err::Error(e) | nom::Err::Failure(e) => {
            let position = input.len().saturating_sub(e.input.len());
            let (kind, message) = match e.code {
                ErrorKind::TooLarge => (
                    ParseErrorKind::TooDeeplyNested,
                    format!("Expression too deeply nested (max depth: {MAX_PARSE_DEPTH})"),
                ),
                ErrorKind::Digit => (
                    ParseErrorKind::ImplementationLimit,
                    format!("Integer literal out of range at position {position}"),
                ),
                ErrorKind::Eof => (
                    ParseErrorKind::Incomplete,
                    "Unexpected end of input: missing ')'".to_owned(),
                ),
                ErrorKind::TakeUntil => (
                    ParseErrorKind::Incomplete,
                    "Unterminated string literal".to_owned(),
                ),
                _ if position < input.len() => {
                    let near: String = input[position..].chars().take(10).collect();
                    (
                        ParseErrorKind::InvalidSyntax,
                        format!("Invalid syntax near '{near}'"),
                    )
                }
                _ => (
                    ParseErrorKind::Incomplete,
                    "Unexpected end of input".to_owned(),
                ),
            };
            ParseError::with_context(kind, message, input, position)
        }
        nom::Err::Incomplete(_) => {
            ParseError::from_message(ParseErrorKind::Incomplete, "Incomplete input")
        }
    }
}

/// Skip whitespace and, when enabled, `;` comments
pub(crate) fn skip_trivia<'a>(input: &'a str, config: &ParseConfig) -> &'a str {
    let mut rest = input.trim_start_matches(|c: char| WHITESPACE.contains(c));
    while config.handle_comments && rest.starts_with(';') {
        let comment: ParseResult<'_, &str> = preceded(char(';'), not_line_ending).parse(rest);
        match comment {
            Ok((after, _)) => rest = after.trim_start_matches(|c: char| WHITESPACE.contains(c)),
            Err(_) => break,
        }
    }
    rest
}

/// Parse an integer: optional sign followed by decimal digits
fn parse_integer(input: &str) -> ParseResult<'_, Expr> {
    let (rest, digits) = recognize(pair(opt(one_of("+-")), digit1)).parse(input)?;

    match digits.parse::<IntegerType>() {
        Ok(n) => Ok((rest, Expr::Integer(n))),
        // Digits were matched, so the only failure left is overflow
        Err(_) => Err(failure(input, ErrorKind::Digit)),
    }
}

fn parse_symbol(input: &str) -> ParseResult<'_, Expr> {
    let (rest, name) = take_while1(is_symbol_char).parse(input)?;
    Ok((rest, Expr::Symbol(name.to_owned())))
}

/// Parse `#t` or `#f`, rejecting a trailing symbol character (`#true`)
fn parse_bool(input: &str) -> ParseResult<'_, Expr> {
    terminated(
        alt((
            value(Expr::Boolean(true), tag("#t")),
            value(Expr::Boolean(false), tag("#f")),
        )),
        not(satisfy(is_symbol_char)),
    )
    .parse(input)
}

/// Parse a string literal. There are no escape sequences: the literal runs to
/// the next double quote.
fn parse_string(input: &str) -> ParseResult<'_, Expr> {
    let (rest, _) = char('"').parse(input)?;
    let (rest, text) = take_while(|c: char| c != '"').parse(rest)?;
    match rest.strip_prefix('"') {
        Some(rest) => Ok((rest, Expr::Str(text.to_owned()))),
        None => Err(failure(input, ErrorKind::TakeUntil)),
    }
}

/// Parse a parenthesized list. Elements need no separating whitespace.
fn parse_list<'a>(input: &'a str, config: &ParseConfig, depth: usize) -> ParseResult<'a, Expr> {
    let (mut rest, _) = char('(').parse(input)?;
    let mut elements = Vec::new();

    loop {
        rest = skip_trivia(rest, config);
        if let Some(after) = rest.strip_prefix(')') {
            return Ok((after, Expr::List(elements)));
        }
        if rest.is_empty() {
            return Err(failure(rest, ErrorKind::Eof));
        }
        let (after, element) = parse_datum(rest, config, depth + 1).map_err(commit)?;
        elements.push(element);
        rest = after;
    }
}

/// Parse `'expr` as `(quote expr)`
fn parse_quote<'a>(input: &'a str, config: &ParseConfig, depth: usize) -> ParseResult<'a, Expr> {
    let (rest, _) = char('\'').parse(input)?;
    let rest = skip_trivia(rest, config);
    let (rest, quoted) = parse_datum(rest, config, depth + 1).map_err(commit)?;
    Ok((
        rest,
        Expr::List(vec![Expr::Symbol("quote".to_owned()), quoted]),
    ))
}

/// Parse one datum at the current position (no leading trivia)
fn parse_datum<'a>(input: &'a str, config: &ParseConfig, depth: usize) -> ParseResult<'a, Expr> {
    if depth >= MAX_PARSE_DEPTH {
        return Err(failure(input, ErrorKind::TooLarge));
    }
    alt((
        parse_integer,
        |i| parse_quote(i, config, depth),
        parse_symbol,
        parse_bool,
        parse_string,
        |i| parse_list(i, config, depth),
    ))
    .parse(input)
}

/// Parse one datum from the front of `input`.
///
/// Returns the datum and the remaining text with leading whitespace removed, so
/// an empty remainder means the input held exactly one datum.
pub fn parse(input: &str) -> Result<(Expr, &str), Error> {
    parse_with_config(input, &ParseConfig::default())
}

pub fn parse_with_config<'a>(
    input: &'a str,
    config: &ParseConfig,
) -> Result<(Expr, &'a str), Error> {
    let start = skip_trivia(input, config);
    if start.is_empty() {
        return Err(Error::ParseError(ParseError::from_message(
            ParseErrorKind::Incomplete,
            "Unexpected end of input",
        )));
    }

    match parse_datum(start, config, 0) {
        Ok((rest, expr)) => Ok((expr, skip_trivia(rest, config))),
        Err(e) => Err(Error::ParseError(parse_error_from_nom(input, e))),
    }
}

/// Parse exactly one datum; anything but trivia after it is an error
pub fn parse_expr(input: &str) -> Result<Expr, Error> {
    parse_expr_with_config(input, &ParseConfig::default())
}

pub fn parse_expr_with_config(input: &str, config: &ParseConfig) -> Result<Expr, Error> {
    let (expr, rest) = parse_with_config(input, config)?;
    if rest.is_empty() {
        Ok(expr)
    } else {
        Err(Error::ParseError(ParseError::with_context(
            ParseErrorKind::TrailingContent,
            format!("Unexpected remaining input: '{rest}'"),
            input,
            input.len() - rest.len(),
        )))
    }
}

/// Heuristic check used for buffering interactive input: parentheses are balanced
/// (or over-closed), no string literal is left open, and there is at least one
/// non-whitespace character. This does not parse, so malformed but balanced text
/// counts as complete.
pub fn is_complete(text: &str) -> bool {
    is_complete_with_config(text, &ParseConfig::default())
}

/// Like [`is_complete`], but with `handle_comments` set the text of `;` comments
/// is ignored, so a comment cannot leave the input looking unfinished.
pub fn is_complete_with_config(text: &str, config: &ParseConfig) -> bool {
    let mut balance: i64 = 0;
    let mut in_string = false;
    let mut in_comment = false;
    let mut has_content = false;

    for c in text.chars() {
        if in_comment {
            in_comment = c != '\n';
            continue;
        }
        if !WHITESPACE.contains(c) {
            has_content = true;
        }
        match c {
            '"' => in_string = !in_string,
            ';' if config.handle_comments && !in_string => in_comment = true,
            '(' if !in_string => balance += 1,
            ')' if !in_string => balance -= 1,
            _ => {}
        }
    }

    balance <= 0 && has_content && !in_string
}
