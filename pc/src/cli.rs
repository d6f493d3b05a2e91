//! CLI command definitions and subcommands

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use templatestore::TemplateType;

use crate::rewriter::{MAX_WORD_COUNT, MIN_WORD_COUNT};

/// Prompt console - manage the storyboard pipeline's prompt templates
#[derive(Parser, Debug)]
#[command(name = "pc")]
#[command(author, version, about = "Manage prompt templates for the novel-to-storyboard pipeline", long_about = None)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(short = 'l', long = "log-level", global = true)]
    pub log_level: Option<String>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

fn parse_type(s: &str) -> Result<TemplateType, String> {
    s.parse()
}

/// Template body given inline or read from a file
#[derive(clap::Args, Debug, Default)]
#[group(multiple = false)]
pub struct BodyArgs {
    /// Template body text
    #[arg(short, long)]
    pub template: Option<String>,

    /// Read the template body from a file
    #[arg(long, value_name = "PATH")]
    pub template_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List templates of one type, or of every type
    List {
        /// Template type (style, character_parse, scene_parse, character, scene, chapter_split)
        #[arg(short = 't', long = "type", value_parser = parse_type)]
        template_type: Option<TemplateType>,
    },

    /// Show a template read-only
    Show {
        #[arg(value_parser = parse_type)]
        template_type: TemplateType,

        id: String,
    },

    /// Create a user template
    Create {
        #[arg(value_parser = parse_type)]
        template_type: TemplateType,

        /// Display name
        #[arg(short, long)]
        name: String,

        /// Free-text description
        #[arg(short, long)]
        description: Option<String>,

        #[command(flatten)]
        body: BodyArgs,

        /// Words per shot (chapter_split only)
        #[arg(short = 'w', long, value_parser = clap::value_parser!(u32).range(MIN_WORD_COUNT as i64..=MAX_WORD_COUNT as i64))]
        word_count: Option<u32>,
    },

    /// Edit a user template
    Edit {
        #[arg(value_parser = parse_type)]
        template_type: TemplateType,

        id: String,

        #[arg(short, long)]
        name: Option<String>,

        #[arg(short, long)]
        description: Option<String>,

        #[command(flatten)]
        body: BodyArgs,

        /// Words per shot (chapter_split only)
        #[arg(short = 'w', long, value_parser = clap::value_parser!(u32).range(MIN_WORD_COUNT as i64..=MAX_WORD_COUNT as i64))]
        word_count: Option<u32>,
    },

    /// Copy a system template into an editable user template
    Copy {
        #[arg(value_parser = parse_type)]
        template_type: TemplateType,

        id: String,
    },

    /// Delete a user template (irreversible)
    Delete {
        #[arg(value_parser = parse_type)]
        template_type: TemplateType,

        id: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Read or change the global prompt settings
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the global prompt settings
    Get,

    /// Change the global prompt settings
    Set {
        /// Prompt used when parsing characters out of a novel
        #[arg(long)]
        parse_characters_prompt: String,
    },
}
