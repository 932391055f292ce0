//! `ori`: command-line client for the ORI admin backend.
//!
//! Keeps the session in a file between invocations, so `ori login` followed
//! by `ori users list` behaves like the browser app.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde::Serialize;

use ori_auth::{Claims, decode_token, encode_unsigned, resolve_identity};
use ori_client::api::{ExpiryQuery, Period};
use ori_client::{
    ApiClient, ClientConfig, FileStorage, HttpAuthBackend, LoginForm, LoginOutcome, Page, SessionStore, admin_routes,
    logout_and_redirect,
};
use ori_core::SystemClock;
use ori_observability::LogFormat;

/// ORI admin client.
#[derive(Parser, Debug)]
#[command(name = "ori", about = "ORI admin backend client")]
struct Cli {
    /// Override the API base URL (default: $ORI_API_URL).
    #[arg(long = "api-url", global = true)]
    api_url: Option<String>,

    /// Human-readable logs instead of JSON.
    #[arg(long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Sign in and persist the session.
    Login {
        #[arg(long, short = 'u')]
        user: String,
        #[arg(long, short = 'p')]
        password: String,
    },

    /// Sign out and clear the persisted session.
    Logout,

    /// Print the signed-in identity.
    Whoami,

    /// Resolve a path through the route table with the current session.
    Navigate { path: String },

    /// Decode a token, or build an unsigned one from claims JSON.
    Inspect {
        token: Option<String>,
        /// Claims object to wrap in an unsigned token.
        #[arg(long = "unsigned", conflicts_with = "token")]
        unsigned: Option<String>,
    },

    /// User accounts.
    Users {
        #[command(subcommand)]
        action: ListAction,
    },

    /// Partner institutions.
    Institutions {
        #[command(subcommand)]
        action: ListAction,
    },

    /// Agreements.
    Agreements {
        #[command(subcommand)]
        action: ListAction,
    },

    /// Upload a mobility workbook for ingestion.
    Upload { path: PathBuf },

    /// Download a SNIES report, e.g. "Movilidad entrante 2024-1".
    Report {
        name: String,
        /// Where to write it (default: the name the backend suggests).
        #[arg(long, short = 'o')]
        out: Option<PathBuf>,
    },

    /// Agreements about to expire.
    Notices {
        #[arg(long = "max-days", default_value_t = 90)]
        max_days: u32,
        #[arg(long = "min-days", default_value_t = 1)]
        min_days: u32,
        /// Include inactive agreements.
        #[arg(long)]
        all: bool,
    },

    /// Mobility totals for one academic period.
    Period {
        year: i32,
        #[arg(value_parser = clap::value_parser!(u8).range(1..=2))]
        semester: u8,
    },
}

#[derive(Subcommand, Debug)]
enum ListAction {
    /// List one page.
    List {
        #[arg(long, default_value_t = 0)]
        skip: u32,
        #[arg(long, default_value_t = ori_client::api::DEFAULT_PAGE_LIMIT)]
        limit: u32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    ori_observability::tracing::init(if cli.pretty { LogFormat::Pretty } else { LogFormat::Json });

    let mut config = ClientConfig::from_env().context("loading configuration")?;
    if let Some(api_url) = cli.api_url {
        config = config.with_api_url(api_url).context("--api-url")?;
    }
    tracing::debug!(api_url = %config.api_url, session_file = %config.session_file.display(), "configured");

    let session = Arc::new(SessionStore::new(
        Arc::new(FileStorage::new(config.session_file.clone())),
        Arc::new(HttpAuthBackend::new(config.api_url.clone())),
        Arc::new(SystemClock),
    ));
    session.initialize();

    match cli.command {
        Commands::Login { user, password } => match LoginForm::new(user, password).submit(&session).await {
            LoginOutcome::Navigate(path) => {
                let identity = session.current_identity().context("session lost right after login")?;
                println!("signed in as {} ({}); next: {path}", identity.id, identity.role);
            }
            LoginOutcome::Rejected(message) => bail!(message),
        },
        Commands::Logout => {
            let next = logout_and_redirect(&session).await;
            println!("signed out; next: {next}");
        }
        Commands::Whoami => match session.current_identity() {
            Some(identity) if session.is_authenticated() => print_json(identity.as_ref())?,
            _ => println!("not authenticated"),
        },
        Commands::Navigate { path } => {
            let navigation = admin_routes(Arc::clone(&session)).navigate(&path)?;
            print_json(&navigation)?;
        }
        Commands::Inspect { token, unsigned } => match (token, unsigned) {
            (Some(token), _) => {
                let claims = decode_token(token.trim()).context("token is malformed")?;
                print_json(&resolve_identity(claims))?;
            }
            (None, Some(claims)) => {
                let value: serde_json::Value = serde_json::from_str(&claims).context("claims are not JSON")?;
                let claims = Claims::try_from(value).map_err(|_| anyhow::anyhow!("claims must be a JSON object"))?;
                println!("{}", encode_unsigned(&claims));
            }
            (None, None) => bail!("pass a token or --unsigned <claims>"),
        },
        Commands::Users { action } => {
            let ListAction::List { skip, limit } = action;
            let api = api(&config, &session)?;
            print_json(&api.users().list(Page::new(skip, limit)).await?)?;
        }
        Commands::Institutions { action } => {
            let ListAction::List { skip, limit } = action;
            let api = api(&config, &session)?;
            print_json(&api.institutions().list(Page::new(skip, limit)).await?)?;
        }
        Commands::Agreements { action } => {
            let ListAction::List { skip, limit } = action;
            let api = api(&config, &session)?;
            print_json(&api.agreements().list(Page::new(skip, limit)).await?)?;
        }
        Commands::Upload { path } => {
            let bytes = tokio::fs::read(&path)
                .await
                .with_context(|| format!("reading {}", path.display()))?;
            let file_name = path
                .file_name()
                .and_then(|n| n.to_str())
                .context("upload path has no file name")?
                .to_string();
            let api = api(&config, &session)?;
            print_json(&api.uploads().upload_excel(&file_name, bytes).await?)?;
        }
        Commands::Report { name, out } => {
            let api = api(&config, &session)?;
            let download = api.snies().download(&name).await?;
            let suggested = download.file_name.clone().unwrap_or_else(|| format!("{name}.xlsx"));
            // Never let the backend pick a directory.
            let out = out.unwrap_or_else(|| PathBuf::from(Path::new(&suggested).file_name().unwrap_or_default()));
            tokio::fs::write(&out, &download.bytes)
                .await
                .with_context(|| format!("writing {}", out.display()))?;
            println!("saved {} ({} bytes)", out.display(), download.bytes.len());
        }
        Commands::Notices { max_days, min_days, all } => {
            let query = ExpiryQuery {
                max_days,
                min_days,
                solo_activos: !all,
                ..ExpiryQuery::default()
            };
            let api = api(&config, &session)?;
            print_json(&api.notifications().expiring_agreements(&query).await?)?;
        }
        Commands::Period { year, semester } => {
            let api = api(&config, &session)?;
            let dashboard = api.dashboard();
            let period = Period::new(year, semester);
            let summary = serde_json::json!({
                "total": dashboard.period_total(period).await?,
                "entrantes": dashboard.period_incoming(period).await?,
                "salientes": dashboard.period_outgoing(period).await?,
                "top_pais": dashboard.period_top_country(period).await?,
            });
            print_json(&summary)?;
        }
    }

    Ok(())
}

fn api(config: &ClientConfig, session: &Arc<SessionStore>) -> Result<ApiClient> {
    if !session.is_authenticated() {
        bail!("not authenticated; run `ori login` first");
    }
    Ok(ApiClient::new(&config.api_url)?.with_session(Arc::clone(session)))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
