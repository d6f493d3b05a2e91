//! PromptConsole - prompt template management CLI
//!
//! Every command runs through a `TemplateSession` against the remote store.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use colored::*;
use eyre::{Context, Result, eyre};
use tracing::{debug, info};

use promptconsole::cli::{BodyArgs, Cli, Command, ConfigCommand, OutputFormat};
use promptconsole::config::Config;
use promptconsole::{TemplateSession, classifier};
use templatestore::{GlobalConfig, HttpTemplateStore, PromptTemplate, TemplateId, TemplateType};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("promptconsole")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Priority: CLI --log-level > config file > INFO
    let level = match cli_log_level.or(config_log_level).map(|s| s.to_uppercase()) {
        Some(s) => match s.as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::File::create(log_dir.join("promptconsole.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_log_level = Config::load_log_level(cli.config.as_ref());
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    info!(base_url = %config.store.base_url, "promptconsole starting");

    let store = HttpTemplateStore::from_config(&config.store).context("Failed to create template store client")?;
    let session = TemplateSession::new(Arc::new(store));
    let format = cli.format;

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::List { template_type } => cmd_list(&session, template_type, format).await,
        Command::Show { template_type, id } => cmd_show(&session, template_type, id.into(), format).await,
        Command::Create {
            template_type,
            name,
            description,
            body,
            word_count,
        } => cmd_create(&session, template_type, name, description, body, word_count, format).await,
        Command::Edit {
            template_type,
            id,
            name,
            description,
            body,
            word_count,
        } => {
            let edits = Edits {
                name,
                description,
                template: read_body(body)?,
                word_count,
            };
            cmd_edit(&session, template_type, id.into(), edits, format).await
        }
        Command::Copy { template_type, id } => cmd_copy(&session, template_type, id.into(), format).await,
        Command::Delete { template_type, id, yes } => cmd_delete(&session, template_type, id.into(), yes).await,
        Command::Config { command } => cmd_config(&session, command, format).await,
    }
}

struct Edits {
    name: Option<String>,
    description: Option<String>,
    template: Option<String>,
    word_count: Option<u32>,
}

fn read_body(body: BodyArgs) -> Result<Option<String>> {
    match (body.template, body.template_file) {
        (Some(text), _) => Ok(Some(text)),
        (None, Some(path)) => {
            let text = fs::read_to_string(&path).context(format!("Failed to read template file {}", path.display()))?;
            Ok(Some(text))
        }
        (None, None) => Ok(None),
    }
}

/// Load the list for `template_type` and pick `id` out of it
async fn find_template(session: &TemplateSession, template_type: TemplateType, id: &TemplateId) -> Result<PromptTemplate> {
    session
        .list(template_type)
        .await
        .context(format!("Failed to list {} templates", template_type))?;
    session
        .find(template_type, id)
        .await
        .ok_or_else(|| eyre!("Template {} not found among {} templates", id, template_type))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn owner_label(template: &PromptTemplate) -> ColoredString {
    if template.is_system {
        "system".yellow()
    } else {
        "user".green()
    }
}

fn print_row(template: &PromptTemplate) {
    let inactive = if template.is_active { "" } else { " (inactive)" };
    println!(
        "  {} [{}] {}{} {}",
        template.id.to_string().cyan(),
        owner_label(template),
        template.name,
        inactive.dimmed(),
        template.created_at.format("%Y-%m-%d %H:%M").to_string().dimmed()
    );
}

fn print_template(template: &PromptTemplate) {
    println!("{} {}", "Name:".bold(), template.name);
    println!("{} {}", "ID:".bold(), template.id.to_string().cyan());
    println!("{} {}", "Type:".bold(), template.template_type);
    println!("{} {}", "Owner:".bold(), owner_label(template));
    println!("{} {}", "Active:".bold(), template.is_active);
    println!("{} {}", "Created:".bold(), template.created_at.to_rfc3339());
    if !template.description.is_empty() {
        println!("{} {}", "Description:".bold(), template.description);
    }
    let actions: Vec<String> = classifier::allowed_actions(template)
        .iter()
        .map(|a| a.to_string())
        .collect();
    println!("{} {}", "Actions:".bold(), actions.join(", "));
    println!();
    println!("{}", template.template);
}

async fn cmd_list(session: &TemplateSession, template_type: Option<TemplateType>, format: OutputFormat) -> Result<()> {
    let types: Vec<TemplateType> = match template_type {
        Some(ty) => vec![ty],
        None => TemplateType::ALL.to_vec(),
    };

    let results = futures::future::join_all(types.iter().map(|ty| session.list(*ty))).await;

    let mut listed = BTreeMap::new();
    let mut failures = 0;
    for (ty, result) in types.iter().zip(results) {
        match result {
            Ok(_) => {
                listed.insert(ty.as_str(), session.templates(*ty).await);
            }
            Err(e) => {
                failures += 1;
                eprintln!("{} Failed to list {} templates: {}", "✗".red(), ty, e);
            }
        }
    }

    if failures == types.len() {
        return Err(eyre!("Template store unavailable"));
    }

    match format {
        OutputFormat::Json => print_json(&listed)?,
        OutputFormat::Text => {
            for ty in &types {
                let Some(templates) = listed.get(ty.as_str()) else {
                    continue;
                };
                println!("{} ({})", ty.to_string().bold(), templates.len());
                if templates.is_empty() {
                    println!("  {}", "no templates".dimmed());
                }
                for template in templates {
                    print_row(template);
                }
            }
        }
    }
    Ok(())
}

async fn cmd_show(session: &TemplateSession, template_type: TemplateType, id: TemplateId, format: OutputFormat) -> Result<()> {
    let template = find_template(session, template_type, &id).await?;
    session.open_viewer(template).await;

    if let Some(viewing) = session.viewing().await {
        match format {
            OutputFormat::Json => print_json(&viewing)?,
            OutputFormat::Text => print_template(&viewing),
        }
    }

    session.close_viewer().await;
    Ok(())
}

async fn cmd_create(
    session: &TemplateSession,
    template_type: TemplateType,
    name: String,
    description: Option<String>,
    body: BodyArgs,
    word_count: Option<u32>,
    format: OutputFormat,
) -> Result<()> {
    let template = read_body(body)?;
    session.open_editor(template_type, None).await?;
    session
        .edit_draft(|draft| {
            draft.name = name;
            if let Some(description) = description {
                draft.description = description;
            }
            if let Some(template) = template {
                draft.template = template;
            }
            if let Some(word_count) = word_count {
                draft.word_count = word_count;
            }
        })
        .await?;

    let created = session.save().await.context("Failed to create template")?;
    match format {
        OutputFormat::Json => print_json(&created)?,
        OutputFormat::Text => println!("{} Created template: {}", "✓".green(), created.id.to_string().cyan()),
    }
    Ok(())
}

async fn cmd_edit(
    session: &TemplateSession,
    template_type: TemplateType,
    id: TemplateId,
    edits: Edits,
    format: OutputFormat,
) -> Result<()> {
    let existing = find_template(session, template_type, &id).await?;
    if existing.is_system {
        return Err(eyre!(
            "Template {} is a system template and cannot be edited; copy it first with `pc copy {} {}`",
            id,
            template_type,
            id
        ));
    }

    let draft = session.open_editor(template_type, Some(existing)).await?;
    debug!(word_count = draft.word_count, "cmd_edit: draft opened");
    session
        .edit_draft(|draft| {
            if let Some(name) = edits.name {
                draft.name = name;
            }
            if let Some(description) = edits.description {
                draft.description = description;
            }
            if let Some(template) = edits.template {
                draft.template = template;
            }
            if let Some(word_count) = edits.word_count {
                draft.word_count = word_count;
            }
        })
        .await?;

    let saved = session.save().await.context("Failed to save template")?;
    match format {
        OutputFormat::Json => print_json(&saved)?,
        OutputFormat::Text => println!("{} Saved template: {}", "✓".green(), saved.id.to_string().cyan()),
    }
    Ok(())
}

async fn cmd_copy(session: &TemplateSession, template_type: TemplateType, id: TemplateId, format: OutputFormat) -> Result<()> {
    let source = find_template(session, template_type, &id).await?;
    let copy = session.copy(&source).await.context("Failed to copy template")?;
    match format {
        OutputFormat::Json => print_json(&copy)?,
        OutputFormat::Text => println!(
            "{} Copied {} to user template: {}",
            "✓".green(),
            id.to_string().cyan(),
            copy.id.to_string().cyan()
        ),
    }
    Ok(())
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

async fn cmd_delete(session: &TemplateSession, template_type: TemplateType, id: TemplateId, yes: bool) -> Result<()> {
    let target = find_template(session, template_type, &id).await?;
    session.request_delete(&target).await?;

    if !yes && !confirm(&format!("Delete template '{}' ({})? This cannot be undone.", target.name, id))? {
        session.cancel_delete().await;
        println!("Cancelled");
        return Ok(());
    }

    let deleted = session.confirm_delete().await.context("Failed to delete template")?;
    println!("{} Deleted template: {}", "✓".green(), deleted.id.to_string().cyan());
    Ok(())
}

async fn cmd_config(session: &TemplateSession, command: ConfigCommand, format: OutputFormat) -> Result<()> {
    let config = match command {
        ConfigCommand::Get => session
            .store()
            .get_global_config()
            .await
            .context("Failed to read global config")?,
        ConfigCommand::Set {
            parse_characters_prompt,
        } => session
            .store()
            .set_global_config(GlobalConfig {
                parse_characters_prompt: Some(parse_characters_prompt),
            })
            .await
            .context("Failed to update global config")?,
    };

    match format {
        OutputFormat::Json => print_json(&config)?,
        OutputFormat::Text => {
            let prompt = config.parse_characters_prompt.as_deref().unwrap_or("(not set)");
            println!("{} {}", "parseCharactersPrompt:".bold(), prompt);
        }
    }
    Ok(())
}
