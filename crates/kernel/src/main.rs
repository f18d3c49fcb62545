//! Menudesk operator CLI
//!
//! Works against the JSON data file and TOML permission registry named in
//! the environment (see [`Config`]).

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use menudesk_kernel::models::{CreateOrUpdateMenu, MenuFilter, MenuType};
use menudesk_kernel::permissions::GrantedPolicies;
use menudesk_kernel::{Config, MemoryStore, MenuService, PermissionRegistry};

#[derive(Parser, Debug)]
#[command(author, version, about = "Menu tree and permission binding tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the menu forest as JSON.
    Tree {
        /// Only menus of this type (menu or page).
        #[arg(long)]
        menu_type: Option<MenuType>,

        /// Only menus whose display name contains this text (case-sensitive).
        #[arg(long)]
        name: Option<String>,
    },

    /// Print the permission policies available for binding.
    Policies {
        /// Tenant in scope; defaults to MENUDESK_TENANT_ID, host side when unset.
        #[arg(long)]
        tenant: Option<Uuid>,
    },

    /// Check whether a permission key may be bound.
    CheckBinding {
        #[arg(long)]
        key: String,

        /// Menu being edited, which may keep its own key.
        #[arg(long)]
        menu: Option<Uuid>,
    },

    /// Change a menu's permission key and migrate its grants.
    Rebind {
        #[arg(long)]
        menu: Uuid,

        /// New permission key; omit to unbind.
        #[arg(long)]
        key: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    init_tracing();

    let cli = Cli::parse();
    let config = Config::from_env().context("failed to load configuration")?;

    let registry = PermissionRegistry::load(&config.permissions_path)
        .await
        .context("failed to load permission registry")?;
    let store = MemoryStore::load(&config.data_path)
        .await
        .context("failed to load data file")?;

    info!(
        permissions = registry.len(),
        data = %config.data_path.display(),
        "configuration loaded"
    );

    let service = MenuService::new(
        Arc::new(registry),
        Arc::new(GrantedPolicies::allow_all()),
        Arc::new(store.clone()),
    );

    match cli.command {
        Command::Tree { menu_type, name } => {
            let filter = MenuFilter { menu_type, name };
            print_json(&service.list(&filter).await?)?;
        }
        Command::Policies { tenant } => {
            print_json(&service.auth_policies(tenant.or(config.tenant_id)))?;
        }
        Command::CheckBinding { key, menu } => {
            service.validate_binding(Some(&key), menu).await?;
            println!("'{key}' can be bound");
        }
        Command::Rebind { menu, key } => {
            let mut input = CreateOrUpdateMenu::from(service.get(menu).await?);
            input.permission_key = key;
            let update = service.update(menu, input).await?;
            store
                .save(&config.data_path)
                .await
                .context("failed to write data file")?;
            print_json(&update.transfers)?;
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("failed to serialize output")?;
    println!("{json}");
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
