use super::*;
use crate::ast::*;
use pretty_assertions::assert_eq;

fn eq(column: &str, value: Value) -> Condition {
    Condition {
        column: column.to_string(),
        op: Operator::Eq,
        value,
    }
}

#[test]
fn test_simple_select() {
    let stmt = parse("SELECT * FROM orders").unwrap();
    assert_eq!(stmt.kind, StatementKind::Select);
    assert_eq!(stmt.table, "orders");
    assert_eq!(stmt.columns, vec![Column::Star]);
    assert!(stmt.filters.is_empty());
}

#[test]
fn test_select_full() {
    let stmt =
        parse("SELECT id, status FROM orders WHERE client_id = $1 ORDER BY created_at DESC LIMIT 5")
            .unwrap();
    assert_eq!(
        stmt.columns,
        vec![
            Column::Named("id".to_string()),
            Column::Named("status".to_string()),
        ]
    );
    assert_eq!(stmt.filters, vec![eq("client_id", Value::Param(1))]);
    assert_eq!(
        stmt.order_by,
        vec![OrderBy {
            column: "created_at".to_string(),
            order: SortOrder::Desc,
        }]
    );
    assert_eq!(stmt.limit, Some(Value::Int(5)));
    assert_eq!(stmt.offset, None);
}

#[test]
fn test_select_is_case_insensitive_and_multiline() {
    let stmt = parse(
        "
        select *
          from inventory
         where category = $1 and quantity <= $2
         order by name
         limit $3 offset $4;
        ",
    )
    .unwrap();
    assert_eq!(stmt.table, "inventory");
    assert_eq!(stmt.filters.len(), 2);
    assert_eq!(stmt.filters[1].op, Operator::Lte);
    assert_eq!(stmt.filters[1].value, Value::Param(2));
    assert_eq!(stmt.order_by[0].order, SortOrder::Asc);
    assert_eq!(stmt.limit, Some(Value::Param(3)));
    assert_eq!(stmt.offset, Some(Value::Param(4)));
}

#[test]
fn test_select_multiple_sort_columns() {
    let stmt = parse("SELECT * FROM tasks ORDER BY priority DESC, due_date ASC").unwrap();
    assert_eq!(stmt.order_by.len(), 2);
    assert_eq!(stmt.order_by[1].column, "due_date");
    assert_eq!(stmt.order_by[1].order, SortOrder::Asc);
}

#[test]
fn test_where_operators() {
    let stmt = parse(
        "SELECT * FROM inventory WHERE quantity > 0 AND name ILIKE $1 AND supplier_id IS NOT NULL AND notes IS NULL AND unit <> 'kg'",
    )
    .unwrap();
    let ops: Vec<Operator> = stmt.filters.iter().map(|c| c.op).collect();
    assert_eq!(
        ops,
        vec![
            Operator::Gt,
            Operator::ILike,
            Operator::IsNotNull,
            Operator::IsNull,
            Operator::Ne,
        ]
    );
    assert_eq!(stmt.filters[0].value, Value::Int(0));
    assert_eq!(stmt.filters[4].value, Value::String("kg".to_string()));
}

#[test]
fn test_where_without_spaces() {
    let stmt = parse("SELECT * FROM users WHERE id=$1").unwrap();
    assert_eq!(stmt.filters, vec![eq("id", Value::Param(1))]);
}

#[test]
fn test_table_name_is_not_keyword_prefix() {
    let stmt = parse("SELECT * FROM orders_archive ORDER BY id").unwrap();
    assert_eq!(stmt.table, "orders_archive");
}

#[test]
fn test_select_without_from_is_rejected() {
    let err = parse("SELECT id").unwrap_err();
    assert!(matches!(err, ShimError::TableNotFound));
    assert_eq!(err.to_string(), "Table non trouvée dans la requête SELECT");
}

#[test]
fn test_select_with_expression_projection() {
    let err = parse("SELECT COUNT(*) as total FROM orders").unwrap_err();
    match err {
        ShimError::Syntax { position, .. } => assert_eq!(position, 7),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_unsupported_statement_kinds() {
    for (sql, token) in [
        ("MERGE INTO orders USING x ON true", "MERGE"),
        ("truncate orders", "TRUNCATE"),
        ("", ""),
    ] {
        match parse(sql).unwrap_err() {
            ShimError::Unsupported(t) => assert_eq!(t, token),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}

#[test]
fn test_unsupported_predicates() {
    let cases = [
        ("SELECT * FROM orders WHERE id IN ($1, $2)", "IN"),
        ("SELECT * FROM orders WHERE total BETWEEN $1 AND $2", "BETWEEN"),
        ("SELECT * FROM orders WHERE status = $1 OR status = $2", "OR"),
        ("SELECT * FROM orders WHERE notes ~* $1", "~*"),
        ("DELETE FROM orders WHERE name NOT LIKE $1", "NOT"),
    ];
    for (sql, op) in cases {
        match parse(sql).unwrap_err() {
            ShimError::UnsupportedPredicate(found) => assert_eq!(found, op, "{sql}"),
            other => panic!("unexpected error for {sql}: {other:?}"),
        }
    }
}

#[test]
fn test_trailing_content_is_rejected() {
    let err = parse("SELECT * FROM orders GROUP BY status").unwrap_err();
    match err {
        ShimError::Syntax { position, message } => {
            assert_eq!(position, 21);
            assert!(message.contains("GROUP BY status"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_error_position_counts_leading_whitespace() {
    let err = parse("   SELECT * FROM orders GROUP BY status").unwrap_err();
    assert!(matches!(err, ShimError::Syntax { position: 24, .. }));

    let err = parse("\n  SELECT COUNT(*) FROM orders").unwrap_err();
    assert!(matches!(err, ShimError::Syntax { position: 10, .. }));
}

#[test]
fn test_negative_limit_is_rejected() {
    let err = parse("SELECT * FROM orders LIMIT -1").unwrap_err();
    assert!(matches!(err, ShimError::InvalidPaging { clause: "LIMIT", .. }));
}

#[test]
fn test_insert_with_values_and_returning() {
    let stmt = parse(
        "INSERT INTO suppliers (
            id, name, category
         ) VALUES ($1, $2, 'raw')
         RETURNING *",
    )
    .unwrap();
    assert_eq!(stmt.kind, StatementKind::Insert);
    assert_eq!(stmt.table, "suppliers");
    assert_eq!(Statement::column_names(&stmt.columns), vec!["id", "name", "category"]);
    assert_eq!(
        stmt.values,
        vec![Value::Param(1), Value::Param(2), Value::String("raw".to_string())]
    );
    assert_eq!(stmt.returning, Some(vec![Column::Star]));
}

#[test]
fn test_insert_without_values() {
    let stmt = parse("INSERT INTO conversations (id, title)").unwrap();
    assert!(stmt.values.is_empty());
    assert_eq!(stmt.columns.len(), 2);
}

#[test]
fn test_insert_errors() {
    assert!(matches!(
        parse("INSERT orders VALUES ($1)").unwrap_err(),
        ShimError::InvalidInsert
    ));
    assert!(matches!(
        parse("INSERT INTO orders (a, b) VALUES ($1)").unwrap_err(),
        ShimError::ValueCount { columns: 2, values: 1 }
    ));
    assert!(matches!(
        parse("INSERT INTO orders (a) VALUES ($1), ($2)").unwrap_err(),
        ShimError::Syntax { .. }
    ));
}

#[test]
fn test_update() {
    let stmt = parse(
        "UPDATE suppliers SET is_active = false, updated_at = CURRENT_TIMESTAMP WHERE id = $1 RETURNING *",
    )
    .unwrap();
    assert_eq!(stmt.kind, StatementKind::Update);
    assert_eq!(
        stmt.assignments,
        vec![
            Assignment {
                column: "is_active".to_string(),
                value: Value::Bool(false),
            },
            Assignment {
                column: "updated_at".to_string(),
                value: Value::Now,
            },
        ]
    );
    assert_eq!(stmt.filters, vec![eq("id", Value::Param(1))]);
    assert_eq!(stmt.returning, Some(vec![Column::Star]));
}

#[test]
fn test_update_errors() {
    assert!(matches!(
        parse("UPDATE orders WHERE id = $1").unwrap_err(),
        ShimError::InvalidUpdate
    ));
    assert!(matches!(
        parse("UPDATE inventory SET quantity = quantity + $1 WHERE id = $2").unwrap_err(),
        ShimError::InvalidUpdate
    ));
    assert!(matches!(
        parse("UPDATE inventory SET a = $1, quantity = quantity + 1").unwrap_err(),
        ShimError::InvalidUpdate
    ));
    assert!(matches!(
        parse("UPDATE inventory SET quantity = $1 + 1 WHERE id = $2").unwrap_err(),
        ShimError::InvalidUpdate
    ));
    assert!(matches!(
        parse("UPDATE notes SET body = 'a' || body").unwrap_err(),
        ShimError::InvalidUpdate
    ));
}

#[test]
fn test_update_list_terminators() {
    assert!(parse("UPDATE tasks SET done = TRUE;").is_ok());
    assert!(parse("UPDATE tasks SET done = TRUE RETURNING id").is_ok());
    assert!(parse("UPDATE tasks SET done = TRUE\n  WHERE id = $1").is_ok());
}

#[test]
fn test_delete() {
    let stmt = parse("DELETE FROM orders WHERE id = $1 RETURNING *").unwrap();
    assert_eq!(stmt.kind, StatementKind::Delete);
    assert_eq!(stmt.filters, vec![eq("id", Value::Param(1))]);
    assert!(stmt.returning.is_some());

    let stmt = parse("DELETE FROM sessions").unwrap();
    assert!(stmt.filters.is_empty());
    assert!(stmt.returning.is_none());

    assert!(matches!(
        parse("DELETE orders WHERE id = $1").unwrap_err(),
        ShimError::InvalidDelete
    ));
}

#[test]
fn test_canonical_rendering() {
    let sql = "select id from orders where status = $1 and total >= 10.5 order by id desc limit 3";
    let stmt = parse(sql).unwrap();
    assert_eq!(
        stmt.to_string(),
        "SELECT id FROM orders WHERE status = $1 AND total >= 10.5 ORDER BY id DESC LIMIT 3"
    );
    assert_eq!(parse(&stmt.to_string()).unwrap(), stmt);
}
