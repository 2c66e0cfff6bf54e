//! Optional clauses: WHERE, ORDER BY, LIMIT, OFFSET, RETURNING.
//!
//! Each function takes the full statement text (for error positions) and the
//! remaining input. An absent clause returns the input untouched.

use nom::{
    Offset,
    branch::alt,
    character::complete::{multispace0, multispace1},
    combinator::{opt, value},
    multi::separated_list1,
    sequence::{pair, preceded, terminated, tuple},
};

use super::tokens::{
    comma, parse_identifier, parse_keyword, parse_operand, parse_operator_token, parse_projection,
};
use crate::ast::{Column, Condition, Operator, OrderBy, SortOrder, Value};
use crate::error::{ShimError, ShimResult};

fn syntax(full: &str, at: &str, message: impl Into<String>) -> ShimError {
    ShimError::syntax(full.offset(at), message)
}

/// `WHERE cond AND cond ...`
pub fn parse_where<'a>(full: &'a str, input: &'a str) -> ShimResult<(&'a str, Vec<Condition>)> {
    let Ok((mut rest, _)) = preceded(multispace0, parse_keyword("WHERE"))(input) else {
        return Ok((input, Vec::new()));
    };

    let mut conditions = Vec::new();
    loop {
        let (r, cond) = parse_condition(full, rest)?;
        conditions.push(cond);

        if let Ok((r, _)) = preceded(multispace0, parse_keyword("AND"))(r) {
            rest = r;
            continue;
        }
        if preceded(multispace0, parse_keyword("OR"))(r).is_ok() {
            return Err(ShimError::UnsupportedPredicate("OR".to_string()));
        }
        return Ok((r, conditions));
    }
}

/// `column op operand` or `column IS [NOT] NULL`.
fn parse_condition<'a>(full: &'a str, input: &'a str) -> ShimResult<(&'a str, Condition)> {
    let (rest, column) = preceded(multispace0, parse_identifier)(input)
        .map_err(|_| syntax(full, input.trim_start(), "condition WHERE attendue"))?;
    let column = column.to_string();

    let is_null = tuple((
        multispace1,
        parse_keyword("IS"),
        multispace1,
        opt(terminated(parse_keyword("NOT"), multispace1)),
        parse_keyword("NULL"),
    ))(rest);
    if let Ok((r, (_, _, _, negated, _))) = is_null {
        let op = if negated.is_some() {
            Operator::IsNotNull
        } else {
            Operator::IsNull
        };
        return Ok((r, Condition { column, op, value: Value::Null }));
    }

    let (r, token) = preceded(multispace0, parse_operator_token)(rest).map_err(|_| {
        syntax(full, rest.trim_start(), format!("opérateur attendu après '{}'", column))
    })?;
    let op = Operator::from_token(token)
        .ok_or_else(|| ShimError::UnsupportedPredicate(token.to_ascii_uppercase()))?;

    let (r, value) = preceded(multispace0, parse_operand)(r).map_err(|_| {
        syntax(full, r.trim_start(), format!("valeur non reconnue pour '{}'", column))
    })?;

    Ok((r, Condition { column, op, value }))
}

/// `ORDER BY col [ASC|DESC], ...`
pub fn parse_order_by<'a>(full: &'a str, input: &'a str) -> ShimResult<(&'a str, Vec<OrderBy>)> {
    let mut head = tuple((
        multispace0,
        parse_keyword("ORDER"),
        multispace1,
        parse_keyword("BY"),
    ));
    let Ok((rest, _)) = head(input) else {
        return Ok((input, Vec::new()));
    };

    let direction = alt((
        value(SortOrder::Desc, parse_keyword("DESC")),
        value(SortOrder::Asc, parse_keyword("ASC")),
    ));
    let term = pair(parse_identifier, opt(preceded(multispace1, direction)));

    let (rest, terms) = preceded(multispace0, separated_list1(comma, term))(rest)
        .map_err(|_| syntax(full, rest.trim_start(), "colonne ORDER BY attendue"))?;

    let order_by = terms
        .into_iter()
        .map(|(column, order)| OrderBy {
            column: column.to_string(),
            order: order.unwrap_or_default(),
        })
        .collect();
    Ok((rest, order_by))
}

/// `LIMIT n` or `OFFSET n`, where n is a non-negative integer or a placeholder.
pub fn parse_paging<'a>(
    full: &'a str,
    input: &'a str,
    clause: &'static str,
) -> ShimResult<(&'a str, Option<Value>)> {
    let Ok((rest, _)) = preceded(multispace0, parse_keyword(clause))(input) else {
        return Ok((input, None));
    };

    let (rest, value) = preceded(multispace0, parse_operand)(rest)
        .map_err(|_| syntax(full, rest.trim_start(), format!("valeur {} attendue", clause)))?;

    match value {
        Value::Int(n) if n >= 0 => Ok((rest, Some(value))),
        Value::Param(_) => Ok((rest, Some(value))),
        other => Err(ShimError::InvalidPaging {
            clause,
            value: other.to_string(),
        }),
    }
}

/// `RETURNING * | col, ...`
pub fn parse_returning<'a>(
    full: &'a str,
    input: &'a str,
) -> ShimResult<(&'a str, Option<Vec<Column>>)> {
    let Ok((rest, _)) = preceded(multispace0, parse_keyword("RETURNING"))(input) else {
        return Ok((input, None));
    };

    let (rest, columns) = preceded(multispace0, parse_projection)(rest)
        .map_err(|_| syntax(full, rest.trim_start(), "colonnes RETURNING attendues"))?;
    Ok((rest, Some(columns)))
}

/// Accept trailing whitespace and one `;`, reject anything else.
pub fn finish(full: &str, input: &str) -> ShimResult<()> {
    let rest = input.trim_start();
    let rest = rest.strip_prefix(';').unwrap_or(rest).trim_start();
    if rest.is_empty() {
        return Ok(());
    }
    if preceded(multispace0, parse_keyword("OR"))(rest).is_ok() {
        return Err(ShimError::UnsupportedPredicate("OR".to_string()));
    }
    Err(syntax(full, rest, format!("contenu inattendu: '{}'", rest.trim_end())))
}
