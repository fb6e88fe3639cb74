//! Application builder
//!
//! Wires configuration, logging, the database and the HTTP server together
//! behind a small CLI.
//!
//! # Example
//!
//! ```rust,ignore
//! use kit::Application;
//!
//! #[tokio::main]
//! async fn main() -> std::process::ExitCode {
//!     Application::new()
//!         .routes(routes::register)
//!         .schema(models::sync)
//!         .ready(bootstrap::ready)
//!         .run()
//!         .await
//! }
//! ```

use crate::config::{AppConfig, Config, Settings};
use crate::database::DbConnection;
use crate::error::FrameworkError;
use crate::server::ctrl_c;
use crate::{logging, Router, Server};
use clap::{Parser, Subcommand};
use futures::future::BoxFuture;
use std::future::Future;
use std::net::SocketAddr;
use std::path::Path;
use std::process::ExitCode;

type StartupError = Box<dyn std::error::Error + Send + Sync>;

/// CLI of a storefront application binary
#[derive(Parser, Debug)]
#[command(name = "storefront")]
#[command(about = "Storefront API server and maintenance commands")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Commands {
    /// Run the web server (default command)
    Serve {
        /// Skip creating missing tables on startup
        #[arg(long)]
        no_sync: bool,
    },
    /// Create missing tables and exit
    #[command(name = "schema:sync")]
    SchemaSync,
    /// Create the default administrator account if absent and exit
    #[command(name = "seed:admin")]
    SeedAdmin,
}

/// What the ready hook gets once the listener is bound
#[derive(Clone)]
pub struct ReadyContext {
    pub db: DbConnection,
    pub settings: Settings,
    /// Bound listener address; `None` when no server runs (`seed:admin`)
    pub local_addr: Option<SocketAddr>,
}

type RoutesFn = Box<dyn FnOnce(&Settings) -> Router + Send>;
type SchemaFn = Box<dyn Fn(DbConnection) -> BoxFuture<'static, Result<(), FrameworkError>> + Send + Sync>;
type ReadyFn = Box<dyn FnOnce(ReadyContext) -> BoxFuture<'static, Result<(), FrameworkError>> + Send>;

#[derive(Default)]
pub struct Application {
    routes_fn: Option<RoutesFn>,
    schema_fn: Option<SchemaFn>,
    ready_fn: Option<ReadyFn>,
}

impl Application {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the route table from the loaded settings
    pub fn routes<F>(mut self, f: F) -> Self
    where
        F: FnOnce(&Settings) -> Router + Send + 'static,
    {
        self.routes_fn = Some(Box::new(f));
        self
    }

    /// Create missing tables; runs before serving unless `--no-sync`
    pub fn schema<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(DbConnection) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), FrameworkError>> + Send + 'static,
    {
        self.schema_fn = Some(Box::new(move |db| Box::pin(f(db))));
        self
    }

    /// One-time startup work, run after the listener is bound and before
    /// the first connection is accepted. Also what `seed:admin` runs.
    pub fn ready<F, Fut>(mut self, f: F) -> Self
    where
        F: FnOnce(ReadyContext) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), FrameworkError>> + Send + 'static,
    {
        self.ready_fn = Some(Box::new(move |ctx| Box::pin(f(ctx))));
        self
    }

    /// Parse the CLI and run the selected command
    ///
    /// Any startup failure is logged and turned into exit code 1.
    pub async fn run(self) -> ExitCode {
        let cli = Cli::parse();
        Config::init(Path::new("."));
        logging::init(&AppConfig::from_env());

        exit_code(self.execute(cli.command).await)
    }

    async fn execute(self, command: Option<Commands>) -> Result<(), StartupError> {
        let settings = Settings::from_env()?;
        let Application {
            routes_fn,
            schema_fn,
            ready_fn,
        } = self;

        let db = DbConnection::connect(&settings.database).await?;

        match command.unwrap_or(Commands::Serve { no_sync: false }) {
            Commands::Serve { no_sync } => {
                if !no_sync {
                    sync_schema(schema_fn.as_ref(), &db).await?;
                }
                let router = routes_fn.map(|f| f(&settings)).unwrap_or_default();
                let server = Server::from_settings(router, &settings, db.clone());
                launch(server, ready_fn, db, settings, ctrl_c()).await?;
            }
            Commands::SchemaSync => {
                sync_schema(schema_fn.as_ref(), &db).await?;
            }
            Commands::SeedAdmin => {
                sync_schema(schema_fn.as_ref(), &db).await?;
                match ready_fn {
                    Some(ready) => {
                        ready(ReadyContext {
                            db,
                            settings,
                            local_addr: None,
                        })
                        .await?
                    }
                    None => tracing::warn!("no ready hook registered, nothing to seed"),
                }
            }
        }

        Ok(())
    }
}

/// Bind, run the ready hook, then serve until `shutdown` resolves
///
/// Nothing is served when binding or the hook fails.
async fn launch<F>(
    server: Server,
    ready: Option<ReadyFn>,
    db: DbConnection,
    settings: Settings,
    shutdown: F,
) -> Result<(), FrameworkError>
where
    F: Future<Output = ()>,
{
    let bound = server.bind().await?;
    if let Some(ready) = ready {
        ready(ReadyContext {
            db,
            settings,
            local_addr: Some(bound.local_addr()),
        })
        .await?;
    }
    bound.serve_with_shutdown(shutdown).await
}

fn exit_code(result: Result<(), StartupError>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "startup failed");
            ExitCode::FAILURE
        }
    }
}

async fn sync_schema(schema_fn: Option<&SchemaFn>, db: &DbConnection) -> Result<(), FrameworkError> {
    if let Some(sync) = schema_fn {
        sync(db.clone()).await?;
        tracing::info!("schema synchronised");
    }
    Ok(())
}
