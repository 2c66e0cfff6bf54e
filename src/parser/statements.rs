//! Statement headers: the fragments each kind cannot do without.
//!
//! A header that does not match yields the kind-specific error. What follows
//! the header is handled by the optional clause parsers.

use nom::{
    Offset,
    character::complete::{char, multispace0, multispace1},
    multi::separated_list1,
    sequence::{delimited, pair, preceded, tuple},
};

use super::clauses::{finish, parse_order_by, parse_paging, parse_returning, parse_where};
use super::tokens::{
    comma, contains_from_table, parse_identifier, parse_identifier_list, parse_keyword,
    parse_operand, parse_operand_list, parse_projection,
};
use crate::ast::{Assignment, Column, Statement, StatementKind};
use crate::error::{ShimError, ShimResult};

/// `SELECT projection FROM table [WHERE] [ORDER BY] [LIMIT] [OFFSET]`
pub fn parse_select(input: &str) -> ShimResult<Statement> {
    let (rest, _) = parse_keyword("SELECT")(input).map_err(|_| ShimError::TableNotFound)?;

    let header = pair(
        preceded(multispace0, parse_projection),
        preceded(tuple((multispace0, parse_keyword("FROM"), multispace1)), parse_identifier),
    )(rest);

    let (rest, (columns, table)) = match header {
        Ok(parsed) => parsed,
        Err(_) if contains_from_table(input) => {
            let at = rest.trim_start();
            return Err(ShimError::syntax(
                input.offset(at),
                "liste de colonnes non reconnue",
            ));
        }
        Err(_) => return Err(ShimError::TableNotFound),
    };

    let mut stmt = Statement::new(StatementKind::Select, table);
    stmt.columns = columns;

    let (rest, filters) = parse_where(input, rest)?;
    let (rest, order_by) = parse_order_by(input, rest)?;
    let (rest, limit) = parse_paging(input, rest, "LIMIT")?;
    let (rest, offset) = parse_paging(input, rest, "OFFSET")?;
    finish(input, rest)?;

    stmt.filters = filters;
    stmt.order_by = order_by;
    stmt.limit = limit;
    stmt.offset = offset;
    Ok(stmt)
}

/// `INSERT INTO table (cols) [VALUES (operands)] [RETURNING]`
pub fn parse_insert(input: &str) -> ShimResult<Statement> {
    let header = tuple((
        parse_keyword("INSERT"),
        multispace1,
        parse_keyword("INTO"),
        multispace1,
        parse_identifier,
        multispace0,
        delimited(
            pair(char('('), multispace0),
            parse_identifier_list,
            pair(multispace0, char(')')),
        ),
    ))(input);
    let Ok((rest, (_, _, _, _, table, _, columns))) = header else {
        return Err(ShimError::InvalidInsert);
    };

    let mut stmt = Statement::new(StatementKind::Insert, table);
    stmt.columns = columns
        .into_iter()
        .map(|c| Column::Named(c.to_string()))
        .collect();

    let mut rest = rest;
    if let Ok((r, _)) = preceded(multispace0, parse_keyword("VALUES"))(rest) {
        let (r, values) = preceded(
            multispace0,
            delimited(
                pair(char('('), multispace0),
                parse_operand_list,
                pair(multispace0, char(')')),
            ),
        )(r)
        .map_err(|_| ShimError::syntax(input.offset(r.trim_start()), "liste VALUES non reconnue"))?;

        if values.len() != stmt.columns.len() {
            return Err(ShimError::ValueCount {
                columns: stmt.columns.len(),
                values: values.len(),
            });
        }
        stmt.values = values;
        rest = r;
    }

    let (rest, returning) = parse_returning(input, rest)?;
    finish(input, rest)?;

    stmt.returning = returning;
    Ok(stmt)
}

/// `UPDATE table SET col = operand, ... [WHERE] [RETURNING]`
pub fn parse_update(input: &str) -> ShimResult<Statement> {
    let assignment = tuple((
        parse_identifier,
        multispace0,
        char('='),
        multispace0,
        parse_operand,
    ));
    let header = tuple((
        parse_keyword("UPDATE"),
        multispace1,
        parse_identifier,
        multispace1,
        parse_keyword("SET"),
        multispace1,
        separated_list1(comma, assignment),
    ))(input);
    let Ok((rest, (_, _, table, _, _, _, pairs))) = header else {
        return Err(ShimError::InvalidUpdate);
    };
    // The assignment list ends at WHERE, RETURNING, `;` or end of input.
    // Anything else is a right-hand side that is not a plain operand.
    let tail = rest.trim_start();
    let list_ends = tail.is_empty()
        || tail.starts_with(';')
        || parse_keyword("WHERE")(tail).is_ok()
        || parse_keyword("RETURNING")(tail).is_ok();
    if !list_ends {
        return Err(ShimError::InvalidUpdate);
    }

    let mut stmt = Statement::new(StatementKind::Update, table);
    stmt.assignments = pairs
        .into_iter()
        .map(|(column, _, _, _, value)| Assignment {
            column: column.to_string(),
            value,
        })
        .collect();

    let (rest, filters) = parse_where(input, rest)?;
    let (rest, returning) = parse_returning(input, rest)?;
    finish(input, rest)?;

    stmt.filters = filters;
    stmt.returning = returning;
    Ok(stmt)
}

/// `DELETE FROM table [WHERE] [RETURNING]`
pub fn parse_delete(input: &str) -> ShimResult<Statement> {
    let header = tuple((
        parse_keyword("DELETE"),
        multispace1,
        parse_keyword("FROM"),
        multispace1,
        parse_identifier,
    ))(input);
    let Ok((rest, (_, _, _, _, table))) = header else {
        return Err(ShimError::InvalidDelete);
    };

    let (rest, filters) = parse_where(input, rest)?;
    let (rest, returning) = parse_returning(input, rest)?;
    finish(input, rest)?;

    let mut stmt = Statement::new(StatementKind::Delete, table);
    stmt.filters = filters;
    stmt.returning = returning;
    Ok(stmt)
}
