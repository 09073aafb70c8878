//! CLI command definitions

use clap::{Args, Parser, Subcommand, ValueEnum};
use roundtable_domain::OrgContext;
use std::path::PathBuf;

/// Output format for session inspection
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable overview
    Text,
    /// The full session record as JSON
    Json,
}

/// CLI arguments for roundtable
#[derive(Parser, Debug)]
#[command(name = "roundtable")]
#[command(author, version, about = "Multi-persona LLM discussions about organizational problems")]
#[command(long_about = r#"
Roundtable convenes a panel of LLM personas to discuss an organizational
problem over several rounds, then extracts structured issues and solutions.

Each round has five phases:
1. Initial statements from every participant
2. Two interactive passes over what has been said
3. Consensus and summary written by the moderator

After each round a judge scores how complete the picture is. Another round
runs, possibly with extra personas, until the score reaches the threshold
or the round cap is hit.

Configuration files are loaded from (in priority order):
1. ROUNDTABLE_* environment variables
2. --config <path>            Explicit config file
3. ./roundtable.toml          Project-level config
4. ~/.config/roundtable/config.toml   Global config

Example:
  roundtable start "Our releases keep slipping" --company-size 80 --industry fintech
  roundtable start "Onboarding takes too long" -p tech_lead -p scrum_master --max-rounds 2
  roundtable report 3f0c... -o report.md
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long, global = true)]
    pub no_config: bool,

    /// Also write diagnostic logs to daily files in this directory
    #[arg(long, value_name = "DIR", global = true)]
    pub log_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a new discussion
    Start(StartArgs),

    /// Continue an interrupted session from its last saved status
    Resume {
        /// Session id
        id: String,
    },

    /// Show the state of a stored session
    Status {
        /// Session id
        id: String,

        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Render the Markdown report of a stored session
    Report {
        /// Session id
        id: String,

        /// Write to this file instead of stdout
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },

    /// List stored sessions, newest first
    List,

    /// Delete a stored session
    Delete {
        /// Session id
        id: String,
    },

    /// List the persona catalog
    Personas,

    /// Check provider reachability and the session storage directory
    Health,

    /// Show configuration file locations and the effective configuration
    ShowConfig,
}

#[derive(Args, Debug)]
pub struct StartArgs {
    /// The problem to discuss
    pub topic: String,

    /// Number of employees
    #[arg(long, value_name = "N")]
    pub company_size: Option<u32>,

    #[arg(long)]
    pub industry: Option<String>,

    /// Development stage, e.g. "seed" or "growth"
    #[arg(long)]
    pub stage: Option<String>,

    /// Known challenges, comma separated
    #[arg(long, value_delimiter = ',', value_name = "A,B")]
    pub challenges: Vec<String>,

    #[arg(long)]
    pub team_structure: Option<String>,

    /// Override discussion.max_rounds
    #[arg(long, value_name = "N")]
    pub max_rounds: Option<u32>,

    /// Persona to include in the first round (can be specified multiple times)
    #[arg(short, long = "participant", value_name = "ID")]
    pub participants: Vec<String>,
}

impl StartArgs {
    /// Organization context from the flags that were given
    pub fn org_context(&self) -> OrgContext {
        let mut context = OrgContext::new();
        if let Some(size) = self.company_size {
            context.insert("company_size", size);
        }
        if let Some(industry) = &self.industry {
            context.insert("industry", industry.as_str());
        }
        if let Some(stage) = &self.stage {
            context.insert("development_stage", stage.as_str());
        }
        let challenges: Vec<&str> = self
            .challenges
            .iter()
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
            .collect();
        if !challenges.is_empty() {
            context.insert("current_challenges", challenges);
        }
        if let Some(team) = &self.team_structure {
            context.insert("team_structure", team.as_str());
        }
        context
    }
}
