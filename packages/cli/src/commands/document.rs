use crate::config::Config;
use anyhow::{anyhow, Context, Result};
use clap::Args;
use colored::Colorize;
use composer_jsonc::{JsonPath, JsoncDocument};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub struct GetArgs {
    /// JSON or JSONC file
    pub file: PathBuf,

    /// Path such as `objects[0].transform`; the whole document when omitted
    pub path: Option<String>,
}

#[derive(Args, Debug)]
pub struct SetArgs {
    /// JSON or JSONC file
    pub file: PathBuf,

    /// Path to write
    pub path: String,

    /// JSON value
    pub value: String,

    /// Insert into the parent array at the path's index instead of replacing
    #[arg(long)]
    pub insert: bool,
}

#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// JSON or JSONC file
    pub file: PathBuf,

    /// Path to remove
    pub path: String,
}

fn open(file: &Path, config: &Config) -> Result<JsoncDocument> {
    let text = fs::read_to_string(file).with_context(|| format!("Cannot read {}", file.display()))?;
    let mut document = JsoncDocument::parse(text).with_context(|| format!("Cannot parse {}", file.display()))?;
    if let Some(indent) = &config.indent {
        document.set_indent_unit(indent.clone());
    }
    Ok(document)
}

fn parse_path(text: &str) -> Result<JsonPath> {
    text.parse().with_context(|| format!("Invalid path '{}'", text))
}

fn save(file: &Path, document: &JsoncDocument) -> Result<()> {
    fs::write(file, document.as_str()).with_context(|| format!("Cannot write {}", file.display()))
}

pub fn value_at(file: &Path, path: Option<&str>, config: &Config) -> Result<Value> {
    let document = open(file, config)?;
    let path = parse_path(path.unwrap_or_default())?;
    document
        .value_at(&path)
        .ok_or_else(|| anyhow!("No value at '{}' in {}", path, file.display()))
}

pub fn get(args: GetArgs, config: &Config) -> Result<()> {
    let value = value_at(&args.file, args.path.as_deref(), config)?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

pub fn set(args: SetArgs, config: &Config) -> Result<()> {
    let mut document = open(&args.file, config)?;
    let path = parse_path(&args.path)?;
    let value: Value =
        serde_json::from_str(&args.value).with_context(|| format!("Value is not valid JSON: {}", args.value))?;

    if args.insert {
        document.insert(&path, &value)?;
    } else {
        document.set(&path, &value)?;
    }
    save(&args.file, &document)?;

    println!(
        "{} {} {} in {}",
        "✓".green(),
        if args.insert { "Inserted" } else { "Set" },
        path.to_string().bright_white(),
        args.file.display()
    );
    Ok(())
}

pub fn delete(args: DeleteArgs, config: &Config) -> Result<()> {
    let mut document = open(&args.file, config)?;
    let path = parse_path(&args.path)?;
    document.delete(&path)?;
    save(&args.file, &document)?;

    println!(
        "{} Deleted {} from {}",
        "✓".green(),
        path.to_string().bright_white(),
        args.file.display()
    );
    Ok(())
}
