//! `vglobal`: operator CLI for the VerifyGlobal client.
//!
//! Drives the same request layer the dashboard uses. Flags (demo mode, route,
//! client credentials, selected customer) persist in a JSON file between runs.

use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use verifyglobal::{
    client::{
        CredentialStore, JsonFileStore, StatusMonitor, TransportRoute, VerifyGlobalService,
    },
    config::ConfigLoader,
    models::mask_credential,
    telemetry,
};

#[derive(Parser)]
#[command(
    name = "vglobal",
    version,
    about = "VerifyGlobal client: Salt Edge over the internal proxy or a public relay",
    long_about = "\
vglobal drives the resilient VerifyGlobal client from a terminal.\n\
\n\
Routes:\n\
  internal  : the verifyglobal proxy; credentials stay on the server\n\
  relay_a   : public relay (codetabs); sends the stored App ID and Secret\n\
  relay_b   : public relay (corsproxy); sends the stored App ID and Secret\n\
\n\
Demo mode answers every call with synthesized data and never touches the network.\n\
A failed `check` shows as status `error` in `status` and `watch` until it passes.\n\
\n\
Examples:\n\
  vglobal route internal\n\
  vglobal customers create jane@example.com\n\
  vglobal customers select <id>\n\
  vglobal accounts\n\
  vglobal check"
)]
struct Cli {
    /// Session file (default: VERIFYGLOBAL_CLIENT_STORE_PATH or .verifyglobal/session.json)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Show the derived connection status and stored flags
    Status {
        /// Also fetch the credential status from the active route
        #[arg(long, default_value_t = false)]
        remote: bool,
    },

    /// Turn demo mode on or off
    Demo {
        #[arg(value_parser = ["on", "off"])]
        state: String,
    },

    /// Select the transport route (internal, relay_a, relay_b)
    Route { key: String },

    /// Client-side credentials used by the relay routes
    #[command(subcommand)]
    Credentials(CredentialsCmd),

    /// Forget every stored flag
    Reset,

    /// Customer operations
    #[command(subcommand)]
    Customers(CustomersCmd),

    /// Start a bank-linking session
    Connect {
        customer_id: Option<String>,
        #[arg(long = "return-to")]
        return_to: Option<String>,
    },

    /// List accounts
    Accounts {
        #[arg(long = "customer-id")]
        customer_id: Option<String>,
    },

    /// List bank connections
    Connections {
        #[arg(long = "customer-id")]
        customer_id: Option<String>,
    },

    /// List transactions
    Transactions {
        #[arg(long = "connection-id")]
        connection_id: Option<String>,
    },

    /// Deep connectivity test over the active route; a failure shows as
    /// `error` status until a later check passes or the route changes
    Check,

    /// Print status changes until the time runs out or Ctrl-C
    Watch {
        #[arg(long, default_value_t = 30)]
        seconds: u64,
    },
}

#[derive(Subcommand)]
enum CredentialsCmd {
    Set {
        #[arg(long = "app-id")]
        app_id: String,
        #[arg(long)]
        secret: String,
    },
    Clear,
}

#[derive(Subcommand)]
enum CustomersCmd {
    List,
    Create { identifier: String },
    /// Remember a customer from the current listing as the active one
    Select { id: String },
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("rendering output")?
    );
    Ok(())
}

fn local_status(service: &VerifyGlobalService) -> Value {
    let store = service.store();
    let app_id = store.app_id();
    json!({
        "status": service.connection_status(),
        "route": store.active_route(),
        "demo_mode": store.demo_mode(),
        "app_id": (!app_id.is_empty()).then(|| mask_credential(&app_id)),
        "secret": !store.secret().is_empty(),
        "active_customer": store.active_customer(),
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = ConfigLoader::new().load().context("loading configuration")?;
    telemetry::init_tracing(&config).context("initializing tracing")?;

    let store_path = cli.store.unwrap_or_else(|| config.client.store_path.clone());
    let store = CredentialStore::new(Arc::new(JsonFileStore::new(store_path)));
    let service =
        VerifyGlobalService::from_config(&config, store.clone()).context("building client")?;

    let selected_customer =
        |explicit: Option<String>| explicit.or_else(|| store.active_customer().map(|c| c.id));

    match cli.command {
        Cmd::Status { remote } => {
            print_json(&local_status(&service))?;
            if remote {
                print_json(&service.get_status().await?)?;
            }
        }

        Cmd::Demo { state } => {
            store.set_demo_mode(state == "on");
            print_json(&local_status(&service))?;
        }

        Cmd::Route { key } => {
            let route = TransportRoute::from_key(&key);
            if route.as_str() != key.trim().to_ascii_lowercase() {
                eprintln!("Using route {}", route);
            }
            store.set_active_route(route);
            print_json(&local_status(&service))?;
        }

        Cmd::Credentials(CredentialsCmd::Set { app_id, secret }) => {
            store.set_credentials(app_id.trim(), secret.trim());
            print_json(&local_status(&service))?;
        }

        Cmd::Credentials(CredentialsCmd::Clear) => {
            store.clear_credentials();
            print_json(&local_status(&service))?;
        }

        Cmd::Reset => {
            store.clear();
            print_json(&local_status(&service))?;
        }

        Cmd::Customers(CustomersCmd::List) => print_json(&service.get_customers().await?)?,

        Cmd::Customers(CustomersCmd::Create { identifier }) => {
            print_json(&service.create_customer(&identifier).await?)?
        }

        Cmd::Customers(CustomersCmd::Select { id }) => {
            match service.select_customer(&id).await? {
                Some(customer) => print_json(&customer)?,
                None => anyhow::bail!("customer {} is not in the current listing", id),
            }
        }

        Cmd::Connect {
            customer_id,
            return_to,
        } => {
            let customer_id = selected_customer(customer_id)
                .context("no customer id given and no customer selected")?;
            print_json(
                &service
                    .create_connect_session(&customer_id, return_to.as_deref())
                    .await?,
            )?;
        }

        Cmd::Accounts { customer_id } => {
            let customer_id = selected_customer(customer_id);
            print_json(&service.get_accounts(customer_id.as_deref()).await?)?;
        }

        Cmd::Connections { customer_id } => {
            let customer_id = selected_customer(customer_id);
            print_json(&service.get_connections(customer_id.as_deref()).await?)?;
        }

        Cmd::Transactions { connection_id } => {
            print_json(&service.get_transactions(connection_id.as_deref()).await?)?;
        }

        Cmd::Check => {
            let report = service.test_connection().await;
            print_json(&report)?;
            if !report.is_verified() {
                std::process::exit(2);
            }
        }

        Cmd::Watch { seconds } => {
            let monitor = Arc::new(StatusMonitor::new(
                store.clone(),
                Duration::from_millis(config.client.status_poll_interval_ms),
            ));
            let mut changes = monitor.subscribe();
            let shutdown = CancellationToken::new();

            let runner = tokio::spawn({
                let monitor = monitor.clone();
                let shutdown = shutdown.clone();
                async move { monitor.run(shutdown).await }
            });

            println!("{}", monitor.current());
            let deadline = tokio::time::sleep(Duration::from_secs(seconds));
            tokio::pin!(deadline);

            loop {
                tokio::select! {
                    _ = &mut deadline => break,
                    _ = tokio::signal::ctrl_c() => break,
                    changed = changes.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let status = *changes.borrow_and_update();
                        println!("{}", status);
                    }
                }
            }

            shutdown.cancel();
            runner.await.context("status monitor task failed")?;
        }
    }

    Ok(())
}
