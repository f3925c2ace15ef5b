use anyhow::Result;
use iam_store::StoreConfig;
use serde::Serialize;
use std::path::Path;

use super::{print_json, OutputFormat};

#[derive(Debug, Serialize)]
struct ConfigInfo {
    config_file: String,
    config_file_exists: bool,
    data_dir: String,
    driver_name: String,
    data_source_name: String,
    db_name: String,
    table_name_prefix: String,
    show_sql: bool,
}

pub fn run(config: &StoreConfig, config_path: &Option<String>, output_format: OutputFormat) -> Result<()> {
    let config_file = config_path
        .clone()
        .unwrap_or_else(StoreConfig::config_file_path);

    let info = ConfigInfo {
        config_file_exists: Path::new(&config_file).exists(),
        config_file,
        data_dir: config.data_dir.clone(),
        driver_name: config.driver_name.clone(),
        data_source_name: config.masked_data_source(),
        db_name: config.db_name.clone(),
        table_name_prefix: config.table_name_prefix.clone(),
        show_sql: config.show_sql,
    };

    if output_format.is_json() {
        return print_json(&info, output_format);
    }

    println!("Configuration File: {}", info.config_file);
    println!();
    println!("{}", config.summary());
    Ok(())
}
