use anyhow::{anyhow, Result};
use clap::Args;
use iam_store::database::{find_entity, Adapter, DriverKind, Row, SessionBuilder, TableMapper};
use iam_store::StoreConfig;
use serde::Serialize;
use tabled::builder::Builder;

use super::{print_json, styled, OutputFormat};

/// Arguments for the Query command
#[derive(Args)]
pub struct QueryArgs {
    /// Entity to query, e.g. User or verification_record
    #[clap(value_name = "ENTITY")]
    pub entity: String,

    /// Only rows owned by this organization
    #[clap(short, long, default_value = "")]
    pub owner: String,

    /// Rows to skip; -1 disables pagination
    #[clap(long, default_value_t = -1, allow_hyphen_values = true)]
    pub offset: i64,

    /// Maximum rows to return; -1 disables pagination
    #[clap(short, long, default_value_t = -1, allow_hyphen_values = true)]
    pub limit: i64,

    /// Field to filter on (substring match), e.g. displayName
    #[clap(short, long, default_value = "")]
    pub field: String,

    /// Value the filter field must contain
    #[clap(short, long, default_value = "")]
    pub value: String,

    /// Field to sort on; defaults to createdTime
    #[clap(long, default_value = "")]
    pub sort_field: String,

    /// "ascend" sorts ascending, anything else descending
    #[clap(long, default_value = "")]
    pub sort_order: String,

    /// Print the count of matching rows instead of the rows
    #[clap(long)]
    pub count: bool,

    /// Print the SQL and its parameters without running it
    #[clap(long)]
    pub dry_run: bool,
}

#[derive(Serialize)]
struct CountResult {
    entity: String,
    count: u64,
}

pub fn run(config: &StoreConfig, args: QueryArgs, output_format: OutputFormat) -> Result<()> {
    let entity = find_entity(&args.entity).ok_or_else(|| anyhow!("Unknown entity '{}'", args.entity))?;

    let session = SessionBuilder::new()
        .with_owner(&args.owner)
        .with_page(args.offset, args.limit)
        .with_filter(&args.field, &args.value)
        .with_sort(&args.sort_field, &args.sort_order)
        .build()
        .for_entity(entity);

    if args.dry_run {
        let driver: DriverKind = config.driver_name.parse()?;
        let table = TableMapper::new(&config.table_name_prefix)?.table_name(entity.name);
        let query = if args.count {
            session.render_count(driver, &table)
        } else {
            session.render(driver, &table)
        };

        if output_format.is_json() {
            return print_json(&query, output_format);
        }
        println!("{}", query.sql);
        for (i, param) in query.params.iter().enumerate() {
            println!("  [{}] {}", i + 1, param);
        }
        return Ok(());
    }

    let adapter = Adapter::open(config)?;

    if args.count {
        let result = adapter.count(entity.name, &session);
        adapter.shutdown()?;
        let count = CountResult {
            entity: entity.name.to_string(),
            count: result?,
        };
        if output_format.is_json() {
            return print_json(&count, output_format);
        }
        println!("{}", count.count);
        return Ok(());
    }

    let result = adapter.find(entity.name, &session);
    adapter.shutdown()?;
    let rows = result?;

    if output_format.is_json() {
        return print_json(&rows, output_format);
    }
    if rows.is_empty() {
        println!("No {} rows found", entity.name);
        return Ok(());
    }
    println!("{}", format_rows(entity, &rows, output_format));
    Ok(())
}

/// Render rows as a table with the entity's columns in catalog order
fn format_rows(
    entity: &iam_store::database::EntityDescriptor,
    rows: &[Row],
    output_format: OutputFormat,
) -> String {
    let columns: Vec<String> = entity.columns.iter().map(|c| c.column_name()).collect();

    let mut builder = Builder::default();
    builder.push_record(columns.iter().cloned());
    for row in rows {
        let record: Vec<String> = columns
            .iter()
            .map(|c| match row.get(c) {
                None | Some(serde_json::Value::Null) => String::new(),
                Some(serde_json::Value::String(s)) => s.clone(),
                Some(v) => v.to_string(),
            })
            .collect();
        builder.push_record(record);
    }

    styled(builder.build(), output_format)
}
