//! OS-Admin: command-line front end for the service-order backend.
//!
//! Every subcommand maps to one store action. Configuration comes from the
//! `OS_*` environment variables; the bearer token is kept in the token
//! file between runs (`os-admin login --token ...`).

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::debug;

use os_client::adapters::{FileTokenStorage, RecordingNavigator, ReqwestTransport};
use os_client::telemetry::init_tracing;
use os_client::{
    ApiClient, AppConfig, AuthSession, EntityId, ListParams, NewServiceOrder,
    OrderFilters, OrderUpdate, OsService, OsStatus, OsStore, ReportFormat, ServiceOrder,
};

/// OS-Admin: manage municipal service orders from the terminal
#[derive(Parser, Debug)]
#[command(name = "os-admin")]
#[command(about = "Manage service orders (Ordem de Serviço) through the REST API")]
struct Cli {
    /// Print raw JSON instead of a table
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Store the bearer token (and optional refresh token)
    Login {
        #[arg(long)]
        token: String,
        #[arg(long)]
        refresh: Option<String>,
    },
    /// Forget stored tokens
    Logout,
    /// List a municipality's orders
    List(ListArgs),
    /// Show one order
    Get { id: String },
    /// Open a new order
    Create(CreateArgs),
    /// Edit title, description, location or priority
    Update(UpdateArgs),
    /// Change an order's status
    Status {
        id: String,
        status: OsStatus,
        #[arg(long, default_value = "")]
        reason: String,
        #[arg(long)]
        user: String,
    },
    /// Assign an order to a user
    Assign {
        id: String,
        owner: String,
        #[arg(long)]
        user: String,
    },
    /// Add or remove tags
    Tag {
        #[command(subcommand)]
        action: TagAction,
    },
    /// Move an order to another municipality
    Transfer {
        id: String,
        to: String,
        #[arg(long, default_value = "")]
        reason: String,
        #[arg(long)]
        user: String,
    },
    /// Show an order's event history
    History { id: String },
    /// Aggregate counters for a municipality
    Stats {
        #[arg(long)]
        prefeitura: String,
    },
    /// Download a report
    Export {
        #[arg(long)]
        prefeitura: String,
        #[arg(long, value_enum, default_value_t = FormatArg::Pdf)]
        format: FormatArg,
        /// Output file (default: relatorio.<ext>)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Delete an order
    Delete { id: String },
    /// Inspect resolved configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Args, Debug)]
struct ListArgs {
    #[arg(long)]
    prefeitura: String,
    #[arg(long)]
    status: Option<OsStatus>,
    #[arg(long)]
    priority: Option<i32>,
    #[arg(long)]
    owner: Option<String>,
    #[arg(long)]
    limit: Option<u32>,
    #[arg(long)]
    offset: Option<u32>,
}

#[derive(Args, Debug)]
struct CreateArgs {
    #[arg(long)]
    prefeitura: String,
    #[arg(long)]
    title: String,
    #[arg(long, default_value = "")]
    description: String,
    #[arg(long, default_value = "")]
    location: String,
    #[arg(long)]
    priority: Option<i32>,
    #[arg(long)]
    requester: Option<String>,
    #[arg(long = "tag")]
    tags: Vec<String>,
}

#[derive(Args, Debug)]
struct UpdateArgs {
    id: String,
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    location: Option<String>,
    #[arg(long)]
    priority: Option<i32>,
}

#[derive(Subcommand, Debug)]
enum TagAction {
    Add { id: String, tag: String },
    Remove { id: String, tag: String },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print a dotted path, e.g. `api.full_url`, or everything
    Get { path: Option<String> },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Pdf,
    Csv,
    Xlsx,
}

impl From<FormatArg> for ReportFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Pdf => ReportFormat::Pdf,
            FormatArg::Csv => ReportFormat::Csv,
            FormatArg::Xlsx => ReportFormat::Xlsx,
        }
    }
}

/// Everything a command may need, wired once.
struct App {
    config: AppConfig,
    session: AuthSession,
    navigator: Arc<RecordingNavigator>,
    store: OsStore,
}

fn build(config: AppConfig) -> Result<App> {
    config.validate().context("invalid configuration")?;

    let transport = Arc::new(
        ReqwestTransport::new(config.api.timeout()).context("failed to build HTTP transport")?,
    );
    let tokens = Arc::new(
        FileTokenStorage::open(&config.storage.path).with_context(|| {
            format!("failed to open token store {}", config.storage.path.display())
        })?,
    );
    let navigator = Arc::new(RecordingNavigator::new());

    let client = ApiClient::new(&config, transport, tokens.clone(), navigator.clone())?;
    let session = AuthSession::new(&config.auth, tokens);
    let store = OsStore::new(OsService::new(Arc::new(client)));

    Ok(App {
        config,
        session,
        navigator,
        store,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::from_env();
    if let Err(e) = init_tracing(&config.logging) {
        eprintln!("Warning: logging disabled: {e}");
    }

    let mut app = build(config)?;
    let result = run(&mut app, cli.command, cli.json).await;

    if let Some(login) = app.navigator.last() {
        eprintln!("Session expired. Log in again at {login}");
    }
    result
}

async fn run(ctx: &mut App, command: Command, json: bool) -> Result<()> {
    debug!(?command, "running command");
    let store = &mut ctx.store;

    match command {
        Command::Login { token, refresh } => {
            ctx.session.login(&token, refresh.as_deref())?;
            println!("Token stored in {}", ctx.config.storage.path.display());
        }
        Command::Logout => {
            ctx.session.logout()?;
            println!("Logged out");
        }
        Command::List(args) => {
            store.set_filters(OrderFilters {
                status: args.status,
                priority: args.priority,
                owner: args.owner.map(EntityId::from),
                municipality: None,
            });
            let mut params: ListParams = store.filters().to_list_params();
            if let Some(limit) = args.limit {
                params = params.limit(limit);
            }
            if let Some(offset) = args.offset {
                params = params.offset(offset);
            }
            store
                .fetch_orders(&EntityId::from(args.prefeitura), &params)
                .await;
            if let Some(message) = store.error() {
                bail!("{message}");
            }
            print_orders(store.orders().iter(), json)?;
        }
        Command::Get { id } => {
            let order = store.fetch_by_id(&EntityId::from(id)).await?;
            print_order(&order, json)?;
        }
        Command::Create(args) => {
            let data = NewServiceOrder {
                title: args.title,
                description: args.description,
                location: args.location,
                priority: args.priority,
                municipality_id: Some(EntityId::from(args.prefeitura)),
                requester_id: args.requester.map(EntityId::from),
                tags: args.tags,
            };
            let order = store.create(&data).await?;
            print_order(&order, json)?;
        }
        Command::Update(args) => {
            let data = OrderUpdate {
                title: args.title,
                description: args.description,
                location: args.location,
                priority: args.priority,
                tags: None,
            };
            if data == OrderUpdate::default() {
                bail!("nothing to update");
            }
            let order = store.update(&EntityId::from(args.id), &data).await?;
            print_order(&order, json)?;
        }
        Command::Status {
            id,
            status,
            reason,
            user,
        } => {
            let order = store
                .change_status(&EntityId::from(id), status, &reason, &EntityId::from(user))
                .await?;
            print_order(&order, json)?;
        }
        Command::Assign { id, owner, user } => {
            let order = store
                .assign_owner(
                    &EntityId::from(id),
                    &EntityId::from(owner),
                    &EntityId::from(user),
                )
                .await?;
            print_optional(order, json)?;
        }
        Command::Tag { action } => {
            let order = match action {
                TagAction::Add { id, tag } => store.add_tag(&EntityId::from(id), &tag).await?,
                TagAction::Remove { id, tag } => {
                    store.remove_tag(&EntityId::from(id), &tag).await?
                }
            };
            print_optional(order, json)?;
        }
        Command::Transfer {
            id,
            to,
            reason,
            user,
        } => {
            let order = store
                .transfer(
                    &EntityId::from(id),
                    &EntityId::from(to),
                    &reason,
                    &EntityId::from(user),
                )
                .await?;
            print_optional(order, json)?;
        }
        Command::History { id } => {
            let history = store.fetch_history(&EntityId::from(id)).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&history)?);
            } else {
                for event in history {
                    let when = event
                        .created_at
                        .map(|t| t.to_rfc3339())
                        .unwrap_or_default();
                    println!("{when:<26} {:<20} {}", event.kind, event.description);
                }
            }
        }
        Command::Stats { prefeitura } => {
            let stats = store.fetch_statistics(&EntityId::from(prefeitura)).await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Command::Export {
            prefeitura,
            format,
            out,
        } => {
            let format = ReportFormat::from(format);
            let bytes = store
                .export_report(&EntityId::from(prefeitura), format, Default::default())
                .await?;
            let out =
                out.unwrap_or_else(|| PathBuf::from(format!("relatorio.{}", format.extension())));
            tokio::fs::write(&out, &bytes)
                .await
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Wrote {} bytes to {}", bytes.len(), out.display());
        }
        Command::Delete { id } => {
            let id = EntityId::from(id);
            store.delete(&id).await?;
            println!("Deleted {id}");
        }
        Command::Config { action } => {
            let ConfigAction::Get { path } = action;
            let value = match path {
                Some(path) => ctx
                    .config
                    .get(&path)
                    .with_context(|| format!("no configuration value at {path}"))?,
                None => serde_json::to_value(&ctx.config)?,
            };
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
    }

    Ok(())
}

fn print_orders<'a>(orders: impl Iterator<Item = &'a ServiceOrder>, json: bool) -> Result<()> {
    let orders: Vec<&ServiceOrder> = orders.collect();
    if json {
        println!("{}", serde_json::to_string_pretty(&orders)?);
        return Ok(());
    }
    println!("{:<8} {:<14} {:>4}  {}", "ID", "STATUS", "PRIO", "TITLE");
    for order in orders {
        println!(
            "{:<8} {:<14} {:>4}  {}",
            order.id.as_str(),
            order.status.as_str(),
            order.priority,
            order.title
        );
    }
    Ok(())
}

fn print_order(order: &ServiceOrder, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(order)?);
        return Ok(());
    }
    println!("#{} [{}] {}", order.id, order.status, order.title);
    if !order.description.is_empty() {
        println!("  {}", order.description);
    }
    if let Some(owner) = &order.owner_id {
        println!("  owner: {owner}");
    }
    if !order.tags.is_empty() {
        println!("  tags: {}", order.tags.join(", "));
    }
    Ok(())
}

fn print_optional(order: Option<ServiceOrder>, json: bool) -> Result<()> {
    match order {
        Some(order) => print_order(&order, json),
        None => {
            println!("Done");
            Ok(())
        }
    }
}
