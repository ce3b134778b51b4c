//! CMMS CLI
//!
//! Command-line frontend over the CMMS data layer:
//! - Log in and out, show the current user
//! - Manage tickets, work orders, locations and site maps
//! - Show the dashboard
//! - Resolve application routes

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;

use cmms::client::{ApiClient, ClientError};
use cmms::config::{generate_default_config, Config};
use cmms::dashboard::{DashboardService, FixtureDashboard};
use cmms::models::{Credentials, Page, TicketStatus, WorkOrderStatus};
use cmms::router::{document_title, Router};
use cmms::services::locations::NewLocation;
use cmms::services::maps::{MapImage, NewSiteMap};
use cmms::services::tickets::{NewTicket, TicketUpdate};
use cmms::services::work_orders::{NewWorkOrder, WorkOrderUpdate};
use cmms::services::{
    AuthService, ListParams, LocationService, MapService, TicketService, WorkOrderService,
};
use cmms::session::{SessionEvent, SessionStore};

#[derive(Parser)]
#[command(name = "cmms")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Command-line client for the CMMS maintenance backend")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: ~/.config/cmms/config.toml or ./config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// API root, overrides the config file
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Output format (table, json)
    #[arg(short, long, default_value = "table", global = true)]
    pub format: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Log in and store the session
    Login {
        email: String,
        /// Password (default: $CMMS_PASSWORD, then one line of stdin)
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Forget the session
    Logout {
        /// Skip invalidating the refresh token on the backend
        #[arg(long)]
        local: bool,
    },

    /// Show the logged-in user
    Whoami {
        /// Fetch the profile again instead of using the cached copy
        #[arg(long)]
        refresh: bool,
    },

    /// Manage tickets
    #[command(subcommand)]
    Tickets(TicketCommand),

    /// Manage work orders
    #[command(subcommand)]
    WorkOrders(WorkOrderCommand),

    /// Manage locations
    #[command(subcommand)]
    Locations(LocationCommand),

    /// Manage site maps
    #[command(subcommand)]
    Maps(MapCommand),

    /// Show KPIs, critical work orders and recent tickets
    Dashboard,

    /// Resolve an application path to its view and title
    Route { path: String },

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args)]
pub struct ListArgs {
    #[arg(long)]
    page: Option<u32>,
    #[arg(long)]
    page_size: Option<u32>,
    /// Free-text search
    #[arg(short, long)]
    search: Option<String>,
    /// Order by field, `-field` for descending
    #[arg(short, long)]
    ordering: Option<String>,
    /// Backend filters in key=value format
    #[arg(short = 'F', long)]
    filter: Vec<String>,
}

impl ListArgs {
    fn params(&self) -> ListParams {
        let mut params = ListParams::new();
        if let Some(page) = self.page {
            params = params.page(page);
        }
        if let Some(size) = self.page_size {
            params = params.page_size(size);
        }
        if let Some(search) = &self.search {
            params = params.search(search);
        }
        if let Some(ordering) = &self.ordering {
            params = params.ordering(ordering);
        }
        for filter in &self.filter {
            if let Some((k, v)) = filter.split_once('=') {
                params = params.filter(k, v);
            }
        }
        params
    }
}

#[derive(Subcommand)]
pub enum TicketCommand {
    List(ListArgs),
    Get {
        id: String,
    },
    Create {
        #[arg(short, long)]
        title: String,
        #[arg(short, long)]
        description: String,
        #[arg(short, long)]
        priority: Option<i64>,
        #[arg(long)]
        asset_id: Option<String>,
    },
    Update {
        id: String,
        #[arg(short, long)]
        title: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
        /// open, pending, resolved or closed
        #[arg(short, long)]
        status: Option<String>,
        #[arg(short, long)]
        priority: Option<i64>,
        #[arg(long)]
        asset_id: Option<String>,
    },
    Delete {
        id: String,
    },
}

#[derive(Subcommand)]
pub enum WorkOrderCommand {
    List(ListArgs),
    Get {
        id: String,
    },
    Create {
        #[arg(short, long)]
        title: String,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(short, long)]
        priority: Option<i64>,
        #[arg(long)]
        asset_id: Option<String>,
        #[arg(long)]
        assigned_to_id: Option<String>,
        /// RFC 3339 instant
        #[arg(long)]
        scheduled_start: Option<String>,
    },
    Update {
        id: String,
        #[arg(short, long)]
        title: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
        /// awaiting_approval, open, in_progress, on_hold, completed or closed
        #[arg(short, long)]
        status: Option<String>,
        #[arg(short, long)]
        priority: Option<i64>,
        #[arg(long)]
        assigned_to_id: Option<String>,
        /// RFC 3339 instant
        #[arg(long)]
        scheduled_start: Option<String>,
        /// RFC 3339 instant, or "now"
        #[arg(long)]
        completed_at: Option<String>,
    },
    Delete {
        id: String,
    },
}

#[derive(Subcommand)]
pub enum LocationCommand {
    List(ListArgs),
    Create {
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        description: Option<String>,
        /// Site map to pin the location on
        #[arg(long)]
        map_id: Option<String>,
        #[arg(short)]
        x: Option<i64>,
        #[arg(short)]
        y: Option<i64>,
    },
}

#[derive(Subcommand)]
pub enum MapCommand {
    List(ListArgs),
    Upload {
        #[arg(short, long)]
        name: String,
        /// Image file
        image: PathBuf,
    },
}

/// Everything a command may need
struct AppContext {
    config: Config,
    session: Arc<SessionStore>,
    api: ApiClient,
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };
    if let Some(url) = &cli.api_url {
        config.api.base_url = url.clone();
    }
    config.logging.init();

    if let Commands::Config { output } = &cli.command {
        return write_config(output.as_deref());
    }
    if let Commands::Route { path } = &cli.command {
        return show_route(path, cli.format == "json");
    }

    let session_file = PathBuf::from(&config.session.file);
    if let Some(parent) = session_file.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating session directory {:?}", parent))?;
    }
    let session = Arc::new(
        SessionStore::open_file(&session_file)
            .with_context(|| format!("opening session file {:?}", session_file))?,
    );
    let api = ApiClient::new(&config.api, session.clone())?;
    let mut events = session.subscribe();

    let ctx = AppContext {
        config,
        session,
        api,
        json: cli.format == "json",
    };

    let result = run(cli.command, &ctx).await;
    let reported = report_session_events(&mut events);

    if let Err(e) = &result {
        if let Some(ClientError::SessionExpired) = e.downcast_ref::<ClientError>() {
            if !reported {
                eprintln!("Session expired, run `cmms login`");
            }
            std::process::exit(2);
        }
    }
    result
}

async fn run(command: Commands, ctx: &AppContext) -> Result<()> {
    match command {
        Commands::Login { email, password } => {
            let password = match password {
                Some(p) => p,
                None => read_password()?,
            };
            let auth = AuthService::new(ctx.api.clone(), ctx.session.clone());
            let tokens = auth.login(&Credentials::new(email, password)).await?;
            if tokens.access.is_none() {
                bail!("Backend answered without an access token");
            }
            let profile = auth.fetch_user_profile().await?;
            println!("Logged in as {} ({})", profile.full_name, profile.role);
        }

        Commands::Logout { local } => {
            let auth = AuthService::new(ctx.api.clone(), ctx.session.clone());
            if local {
                auth.logout();
            } else {
                auth.logout_remote().await;
            }
            println!("Logged out");
        }

        Commands::Whoami { refresh } => {
            let auth = AuthService::new(ctx.api.clone(), ctx.session.clone());
            if ctx.session.load().is_none() {
                println!("Not logged in");
                return Ok(());
            }
            let profile = match auth.current_user() {
                Some(profile) if !refresh => profile,
                _ => auth.fetch_user_profile().await?,
            };
            if ctx.json {
                print_json(&profile)?;
            } else {
                println!("{} <{}>", profile.full_name, profile.email);
                println!("Role: {}", profile.role);
                println!("Id:   {}", profile.id);
            }
        }

        Commands::Tickets(cmd) => tickets(cmd, ctx).await?,
        Commands::WorkOrders(cmd) => work_orders(cmd, ctx).await?,
        Commands::Locations(cmd) => locations(cmd, ctx).await?,
        Commands::Maps(cmd) => maps(cmd, ctx).await?,

        Commands::Dashboard => {
            let dashboard =
                DashboardService::new(FixtureDashboard::from_config(&ctx.config.dashboard));
            let cards = dashboard.summary().await?;
            let orders = dashboard.critical_work_orders().await?;
            let tickets = dashboard.recent_tickets().await?;

            if ctx.json {
                print_json(&serde_json::json!({
                    "kpis": cards,
                    "critical_work_orders": orders,
                    "recent_tickets": tickets,
                }))?;
                return Ok(());
            }

            for card in &cards {
                println!("{:<32} {:>4}", card.title, card.value);
            }
            println!();
            println!("Critical work orders:");
            for order in &orders {
                println!(
                    "  {:<8} {:<40} {:<18} {}",
                    order.id,
                    order.title.as_deref().unwrap_or("-"),
                    order.status.as_deref().unwrap_or("-"),
                    order
                        .created_date
                        .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
                        .unwrap_or_else(|| "-".to_string())
                );
            }
            println!();
            println!("Recent tickets:");
            for ticket in &tickets {
                println!(
                    "  {:<40} {:<20} {}",
                    ticket.title.as_deref().unwrap_or("-"),
                    ticket.requester.as_deref().unwrap_or("-"),
                    ticket.time_since_creation.as_deref().unwrap_or("-")
                );
            }
        }

        Commands::Route { .. } | Commands::Config { .. } => {}
    }

    Ok(())
}

async fn tickets(cmd: TicketCommand, ctx: &AppContext) -> Result<()> {
    let service = TicketService::new(ctx.api.clone());
    match cmd {
        TicketCommand::List(args) => {
            let page = service.list(&args.params()).await?;
            if ctx.json {
                return print_json(&page);
            }
            print_page_header(&page, "tickets");
            for t in &page.results {
                println!("{:<38} {:<10} {}", t.id, t.status.as_str(), t.title);
            }
        }
        TicketCommand::Get { id } => print_json(&service.get_by_id(&id).await?)?,
        TicketCommand::Create {
            title,
            description,
            priority,
            asset_id,
        } => {
            let ticket = service
                .create(&NewTicket {
                    title,
                    description,
                    priority,
                    asset_id,
                })
                .await?;
            println!("Created ticket {}", ticket.id);
        }
        TicketCommand::Update {
            id,
            title,
            description,
            status,
            priority,
            asset_id,
        } => {
            let update = TicketUpdate {
                title,
                description,
                status: status.as_deref().map(TicketStatus::parse_loose),
                priority,
                asset_id,
            };
            let ticket = service.update(&id, &update).await?;
            println!("Updated ticket {} ({})", ticket.id, ticket.status);
        }
        TicketCommand::Delete { id } => {
            service.delete(&id).await?;
            println!("Deleted ticket {}", id);
        }
    }
    Ok(())
}

async fn work_orders(cmd: WorkOrderCommand, ctx: &AppContext) -> Result<()> {
    let service = WorkOrderService::new(ctx.api.clone());
    match cmd {
        WorkOrderCommand::List(args) => {
            let page = service.list(&args.params()).await?;
            if ctx.json {
                return print_json(&page);
            }
            print_page_header(&page, "work orders");
            for wo in &page.results {
                println!(
                    "{:<38} {:<18} {:<40} {}",
                    wo.id,
                    wo.status.as_str(),
                    wo.title,
                    wo.assigned_to
                        .as_ref()
                        .map(|u| u.full_name.as_str())
                        .unwrap_or("-")
                );
            }
        }
        WorkOrderCommand::Get { id } => print_json(&service.get_by_id(&id).await?)?,
        WorkOrderCommand::Create {
            title,
            description,
            priority,
            asset_id,
            assigned_to_id,
            scheduled_start,
        } => {
            let order = NewWorkOrder {
                title,
                description,
                priority,
                asset_id,
                assigned_to_id,
                scheduled_start: scheduled_start.as_deref().map(parse_instant).transpose()?,
            };
            let created = service.create(&order).await?;
            println!("Created work order {}", created.id);
        }
        WorkOrderCommand::Update {
            id,
            title,
            description,
            status,
            priority,
            assigned_to_id,
            scheduled_start,
            completed_at,
        } => {
            let update = WorkOrderUpdate {
                title,
                description,
                status: status.as_deref().map(WorkOrderStatus::parse_loose),
                priority,
                assigned_to_id,
                scheduled_start: scheduled_start.as_deref().map(parse_instant).transpose()?,
                completed_at: completed_at.as_deref().map(parse_instant).transpose()?,
            };
            let updated = service.update(&id, &update).await?;
            println!("Updated work order {} ({})", updated.id, updated.status);
        }
        WorkOrderCommand::Delete { id } => {
            service.delete(&id).await?;
            println!("Deleted work order {}", id);
        }
    }
    Ok(())
}

async fn locations(cmd: LocationCommand, ctx: &AppContext) -> Result<()> {
    let service = LocationService::new(ctx.api.clone());
    match cmd {
        LocationCommand::List(args) => {
            let page = service.list(&args.params()).await?;
            if ctx.json {
                return print_json(&page);
            }
            print_page_header(&page, "locations");
            for loc in &page.results {
                let pin = match (&loc.map, loc.x_coordinate, loc.y_coordinate) {
                    (Some(map), Some(x), Some(y)) => format!("{} @ ({}, {})", map, x, y),
                    _ => "-".to_string(),
                };
                println!("{:<38} {:<30} {}", loc.id, loc.name, pin);
            }
        }
        LocationCommand::Create {
            name,
            description,
            map_id,
            x,
            y,
        } => {
            let location = service
                .create(&NewLocation {
                    name,
                    description,
                    map_id,
                    x_coordinate: x,
                    y_coordinate: y,
                })
                .await?;
            println!("Created location {}", location.id);
        }
    }
    Ok(())
}

async fn maps(cmd: MapCommand, ctx: &AppContext) -> Result<()> {
    let service = MapService::new(ctx.api.clone());
    match cmd {
        MapCommand::List(args) => {
            let page = service.list(&args.params()).await?;
            if ctx.json {
                return print_json(&page);
            }
            print_page_header(&page, "maps");
            for map in &page.results {
                println!(
                    "{:<38} {:<30} {}",
                    map.id,
                    map.name,
                    map.image_url.as_deref().unwrap_or("-")
                );
            }
        }
        MapCommand::Upload { name, image } => {
            let image = MapImage::from_path(&image)
                .with_context(|| format!("reading image {:?}", image))?;
            let map = service.create(NewSiteMap { name, image }).await?;
            println!("Uploaded map {}", map.id);
        }
    }
    Ok(())
}

fn show_route(path: &str, json: bool) -> Result<()> {
    let mut router = Router::default();
    let navigation = router.navigate(path)?.clone();

    if json {
        return print_json(&serde_json::json!({
            "path": navigation.path,
            "view": navigation.view.name(),
            "params": navigation.params,
            "title": router.document().title,
        }));
    }

    println!("View:   {}", navigation.view);
    println!("Path:   {}", navigation.path);
    println!("Title:  {}", document_title(navigation.title));
    for (name, value) in &navigation.params {
        println!("Param:  {} = {}", name, value);
    }
    Ok(())
}

fn write_config(output: Option<&std::path::Path>) -> Result<()> {
    let config = generate_default_config();

    match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, &config)?;
            println!("Config written to {:?}", path);
        }
        None => print!("{}", config),
    }
    Ok(())
}

fn read_password() -> Result<String> {
    if let Ok(password) = std::env::var("CMMS_PASSWORD") {
        return Ok(password);
    }
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("reading password from stdin")?;
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        bail!("No password given (use --password, CMMS_PASSWORD or stdin)");
    }
    Ok(password)
}

fn parse_instant(raw: &str) -> Result<DateTime<Utc>> {
    if raw.eq_ignore_ascii_case("now") {
        return Ok(Utc::now());
    }
    let parsed = DateTime::parse_from_rfc3339(raw)
        .with_context(|| format!("invalid timestamp {:?}, expected RFC 3339", raw))?;
    Ok(parsed.with_timezone(&Utc))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_page_header<T>(page: &Page<T>, what: &str) {
    if page.is_empty() {
        println!("No {} found.", what);
        return;
    }
    println!("{} {} (showing {})", page.count, what, page.len());
    if page.has_next() {
        println!("More available, use --page");
    }
    println!("{}", "-".repeat(80));
}

/// Print invalidations seen while the command ran
fn report_session_events(events: &mut broadcast::Receiver<SessionEvent>) -> bool {
    let mut reported = false;
    while let Ok(event) = events.try_recv() {
        if event == SessionEvent::Invalidated && !reported {
            eprintln!("Session expired, run `cmms login`");
            reported = true;
        }
    }
    reported
}
