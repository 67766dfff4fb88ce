use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use discord_token::cli::{auth, output, CommandStatus, OutputMode};
use discord_token::{load_settings, Overrides};

#[derive(Parser)]
#[command(
    name = "discord-token",
    version,
    about = "Obtain, cache and refresh a Discord OAuth2 user access token",
    after_help = "Credentials are read from DISCORD_CLIENT_ID and DISCORD_CLIENT_SECRET \
(environment or .env), or from clientId/clientSecret in the config file. \
The older client-id/client-secret .env keys are not read; a warning names the replacement."
)]
struct Cli {
    /// Config file (JSON, comments allowed)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Where the token is stored
    #[arg(long, global = true)]
    token_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    print: PrintArgs,
}

#[derive(Args, Clone, Copy, Default)]
struct PrintArgs {
    /// Print `Bearer <token>` instead of the bare token
    #[arg(long, global = true, conflicts_with = "json")]
    bearer: bool,

    /// Print the whole token record as JSON
    #[arg(long, global = true)]
    json: bool,
}

impl PrintArgs {
    fn mode(self) -> OutputMode {
        if self.json {
            OutputMode::Json
        } else if self.bearer {
            OutputMode::Bearer
        } else {
            OutputMode::Raw
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Print a usable access token, authorizing or refreshing as needed
    Token {
        /// Open the authorization URL in a browser if authorization is needed
        #[arg(long)]
        open: bool,
    },

    /// Print the authorization URL
    Url {
        /// Also open it in a browser
        #[arg(long)]
        open: bool,
    },

    /// Exchange a new authorization code, replacing any stored token
    Login {
        /// Authorization code; prompted for when omitted
        #[arg(long)]
        code: Option<String>,

        /// Open the authorization URL in a browser
        #[arg(long)]
        open: bool,
    },

    /// Refresh the stored token now, even if it has not expired
    Refresh,

    /// Show the stored token and whether it has expired
    Show,

    /// Delete the stored token
    Clear,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("DISCORD_TOKEN_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let json_mode = cli.print.json;

    match run(cli).await {
        Ok(CommandStatus::Done) => {}
        Ok(CommandStatus::AuthorizationRequired) => std::process::exit(2),
        Err(e) => {
            output::print_error(&e, json_mode);
            std::process::exit(1);
        }
    }
}

async fn run(cli: Cli) -> Result<CommandStatus, discord_token::DiscordTokenError> {
    let overrides = Overrides {
        config: cli.config,
        token_path: cli.token_path,
    };
    let settings = load_settings(&overrides)?;
    let mode = cli.print.mode();

    match cli.command.unwrap_or(Commands::Token { open: false }) {
        Commands::Token { open } => auth::run_token(&settings, mode, open).await,
        Commands::Url { open } => auth::run_url(&settings, open),
        Commands::Login { code, open } => {
            auth::run_login(&settings, code.as_deref(), mode, open).await
        }
        Commands::Refresh => auth::run_refresh(&settings, mode).await,
        Commands::Show => auth::run_show(&settings, cli.print.json),
        Commands::Clear => auth::run_clear(&settings),
    }
}
