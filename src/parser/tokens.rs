//! Lexical building blocks: identifiers, keywords, operands, operators.

use nom::{
    IResult,
    branch::alt,
    bytes::complete::{tag, tag_no_case, take_while, take_while1},
    character::complete::{char, digit1, multispace0, satisfy},
    combinator::{map, map_res, not, opt, recognize, value, verify},
    multi::separated_list1,
    sequence::{delimited, pair, preceded, terminated, tuple},
};

use crate::ast::{Column, Value};

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Parse an identifier (table name, column name).
pub fn parse_identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(satisfy(is_ident_start), take_while(is_ident_char)))(input)
}

/// Case-insensitive keyword that must end on a word boundary.
pub fn parse_keyword<'a>(kw: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    terminated(tag_no_case(kw), not(satisfy(is_ident_char)))
}

/// Comma separator with optional surrounding whitespace.
pub fn comma(input: &str) -> IResult<&str, char> {
    delimited(multispace0, char(','), multispace0)(input)
}

/// Comma-separated identifiers.
pub fn parse_identifier_list(input: &str) -> IResult<&str, Vec<&str>> {
    separated_list1(comma, parse_identifier)(input)
}

/// `*` or a list of column names.
pub fn parse_projection(input: &str) -> IResult<&str, Vec<Column>> {
    alt((
        value(vec![Column::Star], char('*')),
        map(parse_identifier_list, |names| {
            names
                .into_iter()
                .map(|n| Column::Named(n.to_string()))
                .collect()
        }),
    ))(input)
}

/// Parameter placeholder: $1, $2, etc. `$0` is rejected.
fn parse_placeholder(input: &str) -> IResult<&str, Value> {
    map(
        verify(
            map_res(preceded(char('$'), digit1), |n: &str| n.parse::<usize>()),
            |n: &usize| *n > 0,
        ),
        Value::Param,
    )(input)
}

/// Parse a number (integer or float).
fn parse_number(input: &str) -> IResult<&str, Value> {
    map_res(
        recognize(tuple((
            opt(char('-')),
            digit1,
            opt(pair(char('.'), digit1)),
        ))),
        |num: &str| {
            if num.contains('.') {
                num.parse().map(Value::Float).map_err(|_| ())
            } else {
                num.parse().map(Value::Int).map_err(|_| ())
            }
        },
    )(input)
}

fn quote(input: &str) -> IResult<&str, char> {
    char('\'')(input)
}

fn unquoted(input: &str) -> IResult<&str, &str> {
    take_while(|c: char| c != '\'')(input)
}

/// Single-quoted string; a doubled quote stands for one quote.
fn parse_quoted_string(input: &str) -> IResult<&str, Value> {
    let (mut rest, _) = quote(input)?;
    let mut out = String::new();
    loop {
        let (r, chunk) = unquoted(rest)?;
        out.push_str(chunk);
        let (r, _) = quote(r)?;
        match r.strip_prefix('\'') {
            Some(r) => {
                out.push('\'');
                rest = r;
            }
            None => return Ok((r, Value::String(out))),
        }
    }
}

/// `NOW()` with optional inner whitespace.
fn parse_now_call(input: &str) -> IResult<&str, &str> {
    recognize(tuple((
        tag_no_case("NOW"),
        multispace0,
        char('('),
        multispace0,
        char(')'),
    )))(input)
}

/// A right-hand side: placeholder or literal.
pub fn parse_operand(input: &str) -> IResult<&str, Value> {
    alt((
        parse_placeholder,
        parse_quoted_string,
        parse_number,
        value(Value::Bool(true), parse_keyword("TRUE")),
        value(Value::Bool(false), parse_keyword("FALSE")),
        value(Value::Null, parse_keyword("NULL")),
        value(Value::Now, parse_keyword("CURRENT_TIMESTAMP")),
        value(Value::Now, parse_now_call),
    ))(input)
}

/// Comma-separated operands.
pub fn parse_operand_list(input: &str) -> IResult<&str, Vec<Value>> {
    separated_list1(comma, parse_operand)(input)
}

/// Any operator-looking token. Whether it is supported is decided by the
/// caller, so `IN`, `BETWEEN` or `~` come back as text.
pub fn parse_operator_token(input: &str) -> IResult<&str, &str> {
    alt((
        tag("<>"),
        tag("!="),
        tag(">="),
        tag("<="),
        tag("="),
        tag(">"),
        tag("<"),
        take_while1(|c: char| c.is_ascii_alphabetic()),
        take_while1(|c: char| {
            !c.is_whitespace() && !is_ident_char(c) && c != '$' && c != '\'' && c != '('
        }),
    ))(input)
}

/// Whether `FROM <identifier>` appears anywhere on a word boundary.
pub fn contains_from_table(input: &str) -> bool {
    let mut prev_is_ident = false;
    for (i, c) in input.char_indices() {
        if !prev_is_ident {
            let found = tuple((
                parse_keyword("FROM"),
                nom::character::complete::multispace1,
                parse_identifier,
            ))(&input[i..])
            .is_ok();
            if found {
                return true;
            }
        }
        prev_is_ident = is_ident_char(c);
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_boundary() {
        assert!(parse_keyword("ORDER")("ORDER BY id").is_ok());
        assert!(parse_keyword("ORDER")("order by id").is_ok());
        assert!(parse_keyword("ORDER")("ORDERS").is_err());
    }

    #[test]
    fn test_operands() {
        assert_eq!(parse_operand("$12").unwrap().1, Value::Param(12));
        assert!(parse_operand("$0").is_err());
        assert_eq!(parse_operand("-4").unwrap().1, Value::Int(-4));
        assert_eq!(parse_operand("2.50").unwrap().1, Value::Float(2.5));
        assert_eq!(parse_operand("'it''s'").unwrap().1, Value::String("it's".into()));
        assert_eq!(parse_operand("false").unwrap().1, Value::Bool(false));
        assert_eq!(parse_operand("now( )").unwrap().1, Value::Now);
        assert_eq!(parse_operand("CURRENT_TIMESTAMP").unwrap().1, Value::Now);
        assert!(parse_operand("quantity").is_err());
    }

    #[test]
    fn test_operator_token() {
        assert_eq!(parse_operator_token(">= $1").unwrap().1, ">=");
        assert_eq!(parse_operator_token("IN ($1)").unwrap().1, "IN");
        assert_eq!(parse_operator_token("~* $1").unwrap().1, "~*");
    }

    #[test]
    fn test_contains_from_table() {
        assert!(contains_from_table("SELECT COUNT(*) FROM orders"));
        assert!(!contains_from_table("SELECT id"));
        assert!(!contains_from_table("SELECT datefrom x"));
    }
}
