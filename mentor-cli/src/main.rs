//! MentorAI CLI - your coaching journey in the terminal

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod output;

use commands::{account, assess, auth, dashboard, learning_path, logs, open, results, status, upgrade};

/// MentorAI - professional development coaching
#[derive(Parser)]
#[command(name = "mentor", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the signed-in user and journey progress
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Create an account and sign in
    Signup {
        /// Full name
        #[arg(long)]
        name: Option<String>,
        /// Email address
        #[arg(long)]
        email: Option<String>,
        /// Password (prompted when omitted)
        #[arg(long, env = "MENTOR_PASSWORD", hide_env_values = true)]
        password: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Sign in with email and password
    Login {
        /// Email address
        #[arg(long)]
        email: Option<String>,
        /// Password (prompted when omitted)
        #[arg(long, env = "MENTOR_PASSWORD", hide_env_values = true)]
        password: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Sign in with Google, Facebook or GitHub
    Oauth {
        /// Login provider (google, facebook, github)
        provider: String,
        /// URL the provider redirected back to
        #[arg(long)]
        callback: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Sign out
    Logout {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Navigate to a route, e.g. /dashboard
    Open {
        /// Route path
        route: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the journey dashboard
    Dashboard {
        /// Open a phase card by number
        #[arg(long)]
        select: Option<u32>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Take the skills self-assessment
    Assess {
        /// Skill to assess (e.g. leadership, problem-solving)
        #[arg(long)]
        skill: Option<String>,
        /// Your answer to the situational question
        #[arg(long)]
        response: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show assessment results
    Results {
        /// Move on to the learning path
        #[arg(long = "continue")]
        continue_on: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the personalized learning path
    LearningPath {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show profile and subscription
    Account {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Upgrade to Premium
    Upgrade {
        /// Skip confirmation prompt
        #[arg(long, short)]
        yes: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// View and manage the event log
    Logs {
        #[command(subcommand)]
        command: logs::LogsCommands,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            output::error(&format!("Failed to start runtime: {}", e));
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.is::<output::Reported>() => ExitCode::FAILURE,
        Err(e) => {
            output::error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Status { json } => status::run(json).await,
        Commands::Signup { name, email, password, json } => {
            auth::signup(name, email, password, json).await
        }
        Commands::Login { email, password, json } => auth::login(email, password, json).await,
        Commands::Oauth { provider, callback, json } => {
            auth::oauth(&provider, callback, json).await
        }
        Commands::Logout { json } => auth::logout(json).await,
        Commands::Open { route, json } => open::run(&route, json).await,
        Commands::Dashboard { select, json } => dashboard::run(select, json).await,
        Commands::Assess { skill, response, json } => assess::run(skill, response, json).await,
        Commands::Results { continue_on, json } => results::run(continue_on, json).await,
        Commands::LearningPath { json } => learning_path::run(json).await,
        Commands::Account { json } => account::run(json).await,
        Commands::Upgrade { yes, json } => upgrade::run(yes, json).await,
        Commands::Logs { command } => logs::run(command),
    }
}
