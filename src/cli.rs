use std::ffi::OsString;
use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;

use anyhow::Result;
use clap::error::{ContextKind, ContextValue, ErrorKind};
use clap::{ArgAction, CommandFactory, Parser, Subcommand};

use crate::client::{LogfireClient, QueryExecutor};
use crate::config::{Config, Overrides};
use crate::credentials::EnvFileCredentials;
use crate::display::Renderer;
use crate::sql::{self, DEFAULT_LIMIT, DEFAULT_PROJECT};

const EXAMPLES: &str = "\
Examples:
  logfire-query list-projects
  logfire-query query vibemachine 10
  logfire-query sql \"SELECT * FROM records LIMIT 5\"";

#[derive(Parser, Debug)]
#[command(name = "logfire-query", version)]
#[command(about = "Logfire Query Tool: run SQL against your Logfire records", long_about = None)]
#[command(after_help = EXAMPLES, disable_help_subcommand = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// API base URL (overrides config)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// File holding LOGFIRE_READ_TOKEN (default: .env_DIS)
    #[arg(long, global = true)]
    pub env_file: Option<PathBuf>,

    /// Request timeout in seconds (default: 30)
    #[arg(long, global = true, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Never colour output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// More log output on stderr (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// List all Logfire projects
    ListProjects,

    /// Query logs from a project
    Query {
        /// Service name to filter on
        #[arg(default_value = DEFAULT_PROJECT)]
        project: String,

        /// Number of records to return
        #[arg(default_value_t = DEFAULT_LIMIT)]
        limit: u32,

        #[arg(trailing_var_arg = true, hide = true)]
        ignored: Vec<String>,
    },

    /// Run custom SQL query
    Sql {
        /// SQL statement, passed through as-is
        sql: Option<String>,

        #[arg(trailing_var_arg = true, hide = true)]
        ignored: Vec<String>,
    },

    #[command(external_subcommand)]
    Unknown(Vec<String>),
}

impl Cli {
    /// Parse `args`, turning a stray leading option such as `--bogus` into an
    /// unknown command instead of a usage error.
    pub fn try_parse_args<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let args: Vec<OsString> = args.into_iter().map(Into::into).collect();

        match Self::try_parse_from(args.clone()) {
            Err(err) if err.kind() == ErrorKind::UnknownArgument => {
                match stray_leading_option(&err, &args) {
                    Some(rest) => Ok(Self::unknown(rest)),
                    None => Err(err),
                }
            }
            parsed => parsed,
        }
    }

    fn unknown(args: Vec<String>) -> Self {
        Self {
            command: Some(Commands::Unknown(args)),
            api_url: None,
            env_file: None,
            timeout: None,
            no_color: false,
            verbose: 0,
        }
    }

    pub async fn run(self) -> Result<()> {
        let mut out = io::stdout();

        let Some(command) = self.command else {
            return print_usage(&mut out);
        };

        let renderer = Renderer::new(!self.no_color && out.is_terminal());
        if handle_locally(&command, renderer, &mut out)? {
            return Ok(());
        }

        let config = Config::load()?;
        let settings = config.resolve(Overrides {
            api_url: self.api_url,
            env_file: self.env_file,
            timeout_secs: self.timeout,
        });
        log::debug!("resolved settings: {:?}", settings);

        let credentials = EnvFileCredentials::new(settings.env_file, settings.token_key);
        let client = LogfireClient::new(
            &settings.api_url,
            settings.timeout,
            Box::new(credentials),
            renderer,
        )?;

        dispatch(command, &client, renderer, &mut out).await
    }
}

/// The rejected option and everything after it, when no subcommand came first.
fn stray_leading_option(err: &clap::Error, args: &[OsString]) -> Option<Vec<String>> {
    let token = match err.get(ContextKind::InvalidArg) {
        Some(ContextValue::String(token)) => token,
        _ => return None,
    };
    let position = args.iter().skip(1).position(|arg| arg.to_str() == Some(token.as_str()))? + 1;

    let command = Cli::command();
    let after_subcommand = args[1..position].iter().any(|arg| {
        command
            .get_subcommands()
            .any(|sub| arg.to_str() == Some(sub.get_name()))
    });
    if after_subcommand {
        return None;
    }

    Some(
        args[position..]
            .iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect(),
    )
}

pub fn print_usage(out: &mut dyn Write) -> Result<()> {
    writeln!(out, "{}", Cli::command().render_long_help())?;
    Ok(())
}

/// Print the reply for commands that never reach the API. Returns whether
/// `command` was one of them.
pub fn handle_locally(command: &Commands, renderer: Renderer, out: &mut dyn Write) -> Result<bool> {
    match command {
        Commands::Sql { sql: None, .. } => {
            renderer.error("SQL query required", out)?;
            writeln!(
                out,
                "Example: logfire-query sql \"SELECT * FROM records LIMIT 5\""
            )?;
            Ok(true)
        }
        Commands::Unknown(args) => {
            let name = args.first().map(String::as_str).unwrap_or_default();
            writeln!(out, "Unknown command: {}", name)?;
            writeln!(out, "Run without arguments to see usage")?;
            Ok(true)
        }
        _ => Ok(false),
    }
}

/// Run one command against `executor`, writing everything to `out`.
pub async fn dispatch<E>(
    command: Commands,
    executor: &E,
    renderer: Renderer,
    out: &mut (dyn Write + Send),
) -> Result<()>
where
    E: QueryExecutor + ?Sized,
{
    if handle_locally(&command, renderer, out)? {
        return Ok(());
    }

    match command {
        Commands::ListProjects => {
            renderer.banner("Listing all Logfire projects", out)?;
            executor.execute(&sql::list_projects(), false, out).await?;
        }
        Commands::Query { project, limit, .. } => {
            renderer.banner(&format!("Last {} logs from '{}'", limit, project), out)?;
            executor
                .execute(&sql::recent_records(&project, limit), false, out)
                .await?;
        }
        Commands::Sql { sql: Some(sql), .. } => {
            renderer.banner("Custom Query", out)?;
            executor.execute(&sql, true, out).await?;
        }
        Commands::Sql { sql: None, .. } | Commands::Unknown(_) => {}
    }

    Ok(())
}
