use clap::Parser;
use colored::*;
use directories::ProjectDirs;
use gsheets_mcp::api::{ApiSettings, CmdMessage, MessageLevel, SheetsApi};
use gsheets_mcp::backend::http::HttpBackend;
use gsheets_mcp::config::SheetsConfig;
use gsheets_mcp::error::{Result, SheetsError};
use gsheets_mcp::response::{normalize, ResponseEnvelope};
use gsheets_mcp::tools::{self, Tool};
use serde_json::{json, Map, Value};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

mod args;
use args::{Cli, Commands, FormatFlags};

const ENV_ACCESS_TOKEN: &str = "GOOGLE_ACCESS_TOKEN";

fn main() {
    match run() {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

struct AppContext {
    api: SheetsApi<HttpBackend>,
    verbose: bool,
}

/// Returns whether the tool reported success.
fn run() -> Result<bool> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let invocation = match cli.command {
        Commands::Create {
            title,
            data,
            formulas,
            share_with,
            format,
        } => create_args(title, data, formulas, share_with, &format)
            .map(|args| (Tool::CreateGoogleSheet, args)),
        Commands::Update {
            id,
            data,
            formulas,
            worksheet,
            clear,
            format,
        } => update_args(id, data, formulas, worksheet, clear, &format)
            .map(|args| (Tool::UpdateGoogleSheet, args)),
        Commands::Get { id, worksheet } => Ok((
            Tool::GetGoogleSheet,
            json!({ "spreadsheet_id": id, "worksheet_name": worksheet }),
        )),
        Commands::List {
            title_contains,
            folder_id,
            page_token,
            page_size,
        } => Ok((
            Tool::ListGoogleSheets,
            json!({
                "title_contains": title_contains,
                "folder_id": folder_id,
                "page_token": page_token,
                "page_size": page_size,
            }),
        )),
        Commands::Call { tool, args } => call_args(&tool, args),
        Commands::Tools => {
            print_json(&serde_json::to_value(tools::definitions())?)?;
            return Ok(true);
        }
    };

    let envelope = match invocation {
        Ok((tool, args)) => {
            let mut ctx = init_context(cli.config_dir.as_deref(), cli.verbose)?;
            handle_tool(&mut ctx, tool, &args)
        }
        Err(err) => ResponseEnvelope::failure(&err),
    };
    print_json(&envelope.to_value())?;
    Ok(envelope.is_success())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn init_context(config_dir: Option<&Path>, verbose: bool) -> Result<AppContext> {
    let config_dir = resolve_config_dir(config_dir);
    let config = SheetsConfig::load(&config_dir)?
        .with_env_overrides(|key| std::env::var(key).ok())?;
    tracing::debug!(config_dir = %config_dir.display(), "loaded config");

    let token = access_token(&config);
    if token.is_none() {
        tracing::debug!("no access token available; remote calls will fail authentication");
    }
    let backend = HttpBackend::new(token)?;

    Ok(AppContext {
        api: SheetsApi::new(backend, ApiSettings::from(&config)),
        verbose,
    })
}

fn resolve_config_dir(explicit: Option<&Path>) -> PathBuf {
    if let Some(dir) = explicit {
        return dir.to_path_buf();
    }
    ProjectDirs::from("com", "gsheets", "gsheets")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Token from the environment, else the `access_token` field of the credentials file.
fn access_token(config: &SheetsConfig) -> Option<String> {
    if let Ok(token) = std::env::var(ENV_ACCESS_TOKEN) {
        if !token.trim().is_empty() {
            return Some(token.trim().to_string());
        }
    }

    let content = std::fs::read_to_string(&config.credentials_file).ok()?;
    let creds: Value = serde_json::from_str(&content).ok()?;
    creds
        .get("access_token")
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn handle_tool(ctx: &mut AppContext, tool: Tool, args: &Value) -> ResponseEnvelope {
    let outcome = ctx.api.invoke(tool.name(), args);
    if ctx.verbose {
        if let Ok(result) = &outcome {
            print_messages(&result.messages);
        }
    }
    normalize(outcome)
}

fn create_args(
    title: Option<String>,
    data: Option<String>,
    formulas: Option<String>,
    share_with: Option<String>,
    format: &FormatFlags,
) -> Result<Value> {
    let mut args = Map::new();
    args.insert("title".into(), json!(title));
    args.insert("data".into(), parse_json_flag("data", data)?);
    args.insert("formulas".into(), parse_json_flag("formulas", formulas)?);
    args.insert("share_with".into(), json!(share_with));
    args.insert("format_options".into(), format_options(format));
    Ok(Value::Object(args))
}

fn update_args(
    id: String,
    data: Option<String>,
    formulas: Option<String>,
    worksheet: Option<String>,
    clear: bool,
    format: &FormatFlags,
) -> Result<Value> {
    let mut args = Map::new();
    args.insert("spreadsheet_id".into(), json!(id));
    args.insert("data".into(), parse_json_flag("data", data)?);
    args.insert("formulas".into(), parse_json_flag("formulas", formulas)?);
    args.insert("worksheet_name".into(), json!(worksheet));
    args.insert("clear_existing".into(), json!(clear));
    args.insert("format_options".into(), format_options(format));
    Ok(Value::Object(args))
}

fn call_args(tool: &str, raw: Option<String>) -> Result<(Tool, Value)> {
    let tool: Tool = tool
        .parse()
        .map_err(|reason: String| SheetsError::invalid("tool", reason))?;
    let raw = match raw {
        Some(raw) => raw,
        None => {
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };
    if raw.trim().is_empty() {
        return Ok((tool, json!({})));
    }
    let args = serde_json::from_str(&raw)
        .map_err(|e| SheetsError::invalid("arguments", format!("not valid JSON: {}", e)))?;
    Ok((tool, args))
}

fn parse_json_flag(field: &str, raw: Option<String>) -> Result<Value> {
    match raw {
        Some(raw) => serde_json::from_str(&raw)
            .map_err(|e| SheetsError::invalid(field, format!("not valid JSON: {}", e))),
        None => Ok(Value::Null),
    }
}

fn format_options(flags: &FormatFlags) -> Value {
    let names: Vec<&str> = [
        (flags.bold_header, "bold_header"),
        (flags.freeze_header, "freeze_header_row"),
        (flags.basic_filter, "basic_filter"),
    ]
    .into_iter()
    .filter_map(|(on, name)| on.then_some(name))
    .collect();
    json!(names)
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_messages(messages: &[CmdMessage]) {
    for message in messages {
        match message.level {
            MessageLevel::Info => eprintln!("{}", message.content.dimmed()),
            MessageLevel::Success => eprintln!("{}", message.content.green()),
            MessageLevel::Warning => eprintln!("{}", message.content.yellow()),
            MessageLevel::Error => eprintln!("{}", message.content.red()),
        }
    }
}
