//! greenline: run data-layer statements from the shell
//!
//! # Usage
//!
//! ```bash
//! # Execute a statement
//! greenline "SELECT * FROM orders WHERE status = \$1 LIMIT 5" --bind pending
//!
//! # Dry run (show the translated table query only)
//! greenline "DELETE FROM sessions WHERE id = \$1" --bind 42 --dry-run
//!
//! # Probe the configured backend
//! greenline check
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use greenline::backend::{postgres, rest};
use greenline::prelude::*;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "greenline")]
#[command(author = "GreenLine Pro Contributors")]
#[command(version)]
#[command(about = "SQL statements over the GreenLine table API", long_about = None)]
#[command(after_help = "EXAMPLES:
    greenline 'SELECT * FROM tasks WHERE assigned_to = $1 ORDER BY due_date' --bind 7
    greenline 'UPDATE suppliers SET is_active = false WHERE id = $1' --bind 3 --dry-run
    greenline explain 'INSERT INTO inventory (name, quantity) VALUES ($1, $2)'")]
struct Cli {
    /// The SQL statement to execute
    query: Option<String>,

    /// Don't execute, just show the translated query
    #[arg(short, long)]
    dry_run: bool,

    /// Parameter bindings ($1, $2, etc.)
    #[arg(short, long, value_delimiter = ',')]
    bind: Vec<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    format: OutputFormat,

    /// Parameter binding mode (overrides configuration)
    #[arg(long)]
    binding: Option<ParamBinding>,

    /// Configuration file
    #[arg(long, env = "GREENLINE_CONFIG")]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse and explain a statement
    Explain {
        /// The SQL statement to explain
        query: String,
    },
    /// Probe the configured backend
    Check {
        /// Table to probe (defaults to the configured probe table)
        table: Option<String>,
    },
    /// Show the accepted SQL subset
    Syntax,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let outcome = match &cli.command {
        Some(Commands::Explain { query }) => {
            explain_query(query, &cli);
            Ok(())
        }
        Some(Commands::Check { table }) => check(table.as_deref(), &cli).await,
        Some(Commands::Syntax) => {
            show_syntax();
            Ok(())
        }
        None => match &cli.query {
            Some(query) => execute_query(query, &cli).await,
            None => {
                println!("{}", "GreenLine data layer".cyan().bold());
                println!();
                println!("Usage: greenline <QUERY> [OPTIONS]");
                println!();
                println!("Try: greenline --help");
                Ok(())
            }
        },
    };

    if let Err(e) = outcome {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

/// Logs go to stderr so `--format json` output stays parseable.
fn init_tracing(verbose: bool) {
    let default = if verbose { "greenline=debug" } else { "greenline=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(mode) = cli.binding {
        config.shim.binding = mode;
    }
    Ok(config)
}

/// `42` → number, `true` → bool, `null` → null, anything else → string.
fn parse_bind(raw: &str) -> JsonValue {
    match serde_json::from_str::<JsonValue>(raw) {
        Ok(v @ (JsonValue::Number(_) | JsonValue::Bool(_) | JsonValue::Null)) => v,
        _ => JsonValue::String(raw.to_string()),
    }
}

async fn execute_query(query: &str, cli: &Cli) -> Result<()> {
    if cli.verbose {
        println!("{} {}", "Input:".dimmed(), query.yellow());
    }

    let config = load_config(cli)?;
    let params: Vec<JsonValue> = cli.bind.iter().map(|b| parse_bind(b)).collect();
    let configured = config.backend_kind().is_ok();

    if cli.dry_run || !configured {
        let db = ShimDb::default().with_binding(config.shim.binding);
        let (stmt, table_query) = db.prepare(query, &params)?;

        println!("{}", "Statement:".green().bold());
        println!("{}", stmt.to_string().white());
        println!();
        println!("{}", "Table query:".green().bold());
        println!("{}", serde_json::to_string_pretty(&table_query)?);

        if !params.is_empty() {
            println!();
            println!("{}", "Bindings:".cyan());
            for (i, p) in params.iter().enumerate() {
                println!("  ${} = {}", i + 1, p.to_string().yellow());
            }
        }

        if !configured && !cli.dry_run {
            println!();
            println!(
                "{}",
                "⚠ No backend configured. Set SUPABASE_URL + key or DATABASE_URL".yellow()
            );
        }
        return Ok(());
    }

    let db = ShimDb::from_config(&config).await?;
    if cli.verbose {
        println!("{} {}", "Backend:".dimmed(), db.backend().name());
    }

    let result = db.query(query, &params).await?;
    db.end().await;

    match cli.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        OutputFormat::Table => {
            if let Some(rows) = &result.rows {
                format_rows(rows);
            }
            if let Some(n) = result.row_count {
                println!("{} {} row(s) affected", "✓".green(), n);
            }
        }
    }
    Ok(())
}

async fn check(table: Option<&str>, cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;
    let table = table.unwrap_or(&config.shim.probe_table);
    let db = ShimDb::from_config(&config).await?;

    println!("{} {} ({})", "Probing".dimmed(), table.cyan(), db.backend().name());
    let outcome = db.check_connection(table).await;
    db.end().await;
    outcome?;
    println!("{} Backend reachable", "✓".green());
    Ok(())
}

fn format_rows(rows: &[Row]) {
    if rows.is_empty() {
        println!("{}", "(no results)".dimmed());
        return;
    }

    let mut columns: Vec<&String> = Vec::new();
    for row in rows {
        for key in row.keys() {
            if !columns.contains(&key) {
                columns.push(key);
            }
        }
    }

    let mut widths: HashMap<&String, usize> = columns.iter().map(|c| (*c, c.chars().count())).collect();
    for row in rows {
        for (col, val) in row {
            let len = val_to_string(val).chars().count();
            if let Some(w) = widths.get_mut(col) {
                *w = (*w).max(len);
            }
        }
    }

    let header: Vec<String> = columns
        .iter()
        .map(|c| format!("{:width$}", c, width = widths[*c]))
        .collect();
    println!("{}", header.join(" │ ").white().bold());

    let sep: Vec<String> = columns.iter().map(|c| "─".repeat(widths[*c])).collect();
    println!("{}", sep.join("─┼─").dimmed());

    for row in rows {
        let cells: Vec<String> = columns
            .iter()
            .map(|c| {
                let val = row.get(*c).map(val_to_string).unwrap_or_default();
                format!("{:width$}", val, width = widths[*c])
            })
            .collect();
        println!("{}", cells.join(" │ "));
    }

    println!();
    println!("{} row(s) returned", rows.len().to_string().cyan());
}

fn val_to_string(val: &JsonValue) -> String {
    match val {
        JsonValue::Null => "NULL".to_string(),
        JsonValue::Bool(b) => b.to_string(),
        JsonValue::Number(n) => n.to_string(),
        JsonValue::String(s) => s.clone(),
        _ => val.to_string(),
    }
}

fn explain_query(query: &str, cli: &Cli) {
    println!("{}", "Statement Explanation".cyan().bold());
    println!();
    println!("{} {}", "Query:".dimmed(), query.yellow());
    println!();

    let stmt = match greenline::parse(query) {
        Ok(stmt) => stmt,
        Err(e) => {
            eprintln!("{} {}", "Parse Error:".red().bold(), e);
            return;
        }
    };

    println!("{}", "Parsed Structure:".green().bold());
    println!("  {} {}", "Kind:".dimmed(), stmt.kind.to_string().cyan());
    println!("  {} {}", "Table:".dimmed(), stmt.table.white());

    if !stmt.columns.is_empty() {
        println!("  {}", "Columns:".dimmed());
        for col in &stmt.columns {
            println!("    • {}", col.to_string().white());
        }
    }
    if !stmt.values.is_empty() {
        println!("  {}", "Values:".dimmed());
        for value in &stmt.values {
            println!("    • {}", value.to_string().yellow());
        }
    }
    if !stmt.assignments.is_empty() {
        println!("  {}", "Set:".dimmed());
        for a in &stmt.assignments {
            println!("    {} = {}", a.column.white(), a.value.to_string().yellow());
        }
    }
    if !stmt.filters.is_empty() {
        println!("  {}", "Filters:".dimmed());
        for cond in &stmt.filters {
            println!("    {}", cond.to_string().white());
        }
    }
    if !stmt.order_by.is_empty() {
        println!("  {}", "Order:".dimmed());
        for term in &stmt.order_by {
            let arrow = match term.order {
                SortOrder::Asc => "↑",
                SortOrder::Desc => "↓",
            };
            println!("    {} {}", arrow.cyan(), term.column.white());
        }
    }
    if let Some(limit) = &stmt.limit {
        println!("  {} {}", "Limit:".dimmed(), limit.to_string().cyan());
    }
    if let Some(offset) = &stmt.offset {
        println!("  {} {}", "Offset:".dimmed(), offset.to_string().cyan());
    }
    if let Some(returning) = &stmt.returning {
        let cols: Vec<String> = returning.iter().map(|c| c.to_string()).collect();
        println!("  {} {}", "Returning:".dimmed(), cols.join(", ").cyan());
    }

    let params: Vec<JsonValue> = if cli.bind.is_empty() {
        explain_params(&stmt)
    } else {
        cli.bind.iter().map(|b| parse_bind(b)).collect()
    };
    let mode = cli.binding.unwrap_or_default();
    let (_, table_query) = match ShimDb::default().with_binding(mode).prepare(query, &params) {
        Ok(plan) => plan,
        Err(e) => {
            eprintln!("{} {}", "Translation Error:".red().bold(), e);
            return;
        }
    };

    println!();
    println!("{}", "Table API request:".green().bold());
    let pairs: Vec<String> = rest::query_pairs(&table_query)
        .into_iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect();
    println!("  {} /rest/v1/{}?{}", http_method(&table_query).cyan(), table_query.table, pairs.join("&"));

    println!();
    println!("{}", "PostgreSQL:".green().bold());
    let plan = postgres::build_sql(&table_query);
    println!("  {}", plan.sql.white());
    for (i, bind) in plan.binds.iter().enumerate() {
        println!("  ${} = {}", i + 1, bind.to_string().yellow());
    }
}

/// Stand-in parameters for `explain` without `--bind`: `"$n"` so the plan
/// shows where each one lands, and 0 for LIMIT/OFFSET placeholders, which
/// must be integers.
fn explain_params(stmt: &Statement) -> Vec<JsonValue> {
    let paging: Vec<usize> = [&stmt.limit, &stmt.offset]
        .into_iter()
        .filter_map(|v| match v {
            Some(Value::Param(n)) => Some(*n),
            _ => None,
        })
        .collect();
    (1..=stmt.max_placeholder())
        .map(|n| {
            if paging.contains(&n) {
                JsonValue::from(0)
            } else {
                JsonValue::String(format!("${}", n))
            }
        })
        .collect()
}

fn http_method(query: &TableQuery) -> &'static str {
    use greenline::backend::Operation;
    match query.operation {
        Operation::Select => "GET",
        Operation::Insert(_) => "POST",
        Operation::Update(_) => "PATCH",
        Operation::Delete => "DELETE",
    }
}

fn show_syntax() {
    println!("{}", "Accepted SQL Subset".cyan().bold());
    println!();

    let forms = [
        ("SELECT", "SELECT * | cols FROM t [WHERE ..] [ORDER BY c [ASC|DESC], ..] [LIMIT n] [OFFSET n]"),
        ("INSERT", "INSERT INTO t (cols) [VALUES (operands)] [RETURNING * | cols]"),
        ("UPDATE", "UPDATE t SET c = operand, .. [WHERE ..] [RETURNING * | cols]"),
        ("DELETE", "DELETE FROM t [WHERE ..] [RETURNING * | cols]"),
    ];
    for (kind, form) in forms {
        println!("{:8} {}", kind.cyan().bold(), form.white());
    }

    println!();
    let predicates = [
        ("=", "eq"),
        ("<> !=", "neq"),
        ("> >=", "gt / gte"),
        ("< <=", "lt / lte"),
        ("LIKE", "like (% → *)"),
        ("ILIKE", "ilike (% → *)"),
        ("IS NULL", "is.null"),
        ("IS NOT NULL", "not.is.null"),
    ];
    println!(
        "{:14} {}",
        "Predicate".white().bold(),
        "Table API filter".white().bold()
    );
    println!("{}", "─".repeat(40).dimmed());
    for (op, filter) in predicates {
        println!("{:14} {}", op.cyan(), filter.dimmed());
    }

    println!();
    println!(
        "{} $n, integers, decimals, 'text', TRUE, FALSE, NULL, CURRENT_TIMESTAMP, NOW()",
        "Operands:".white().bold()
    );
    println!(
        "{} conditions joined with AND only",
        "WHERE:".white().bold()
    );
}
