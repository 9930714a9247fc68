use clap::Parser;
use miette::{IntoDiagnostic, Result};
use restopos::application::auth::AuthService;
use restopos::application::menu::MenuService;
use restopos::config::{Cli, Command, Config};
use restopos::domain::ports::Stores;
use restopos::infrastructure::in_memory::in_memory_stores;
use restopos::infrastructure::mailer::LogMailer;
use restopos::infrastructure::midtrans::{MidtransGateway, mask_key};
use restopos::interfaces::csv::menu_reader::MenuReader;
use restopos::interfaces::http;
use restopos::interfaces::http::state::AppState;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let Cli { command, config } = Cli::parse();
    init_tracing(config.log_json);

    let stores = open_stores(config.db_path.as_deref())?;

    match command.unwrap_or(Command::Serve) {
        Command::Serve => serve(&config, stores).await,
        Command::SeedOwner {
            name,
            email,
            password,
        } => {
            let auth = auth_service(&config, &stores)?;
            match auth.seed_owner(&name, &email, &password).await.into_diagnostic()? {
                Some(owner) => println!("Owner account created for {}", owner.email),
                None => println!("An owner account already exists; nothing to do"),
            }
            Ok(())
        }
        Command::ResetPassword { email, password } => {
            let auth = auth_service(&config, &stores)?;
            let user = auth.set_password(&email, &password).await.into_diagnostic()?;
            println!("Password updated for {}", user.email);
            Ok(())
        }
        Command::ImportMenu { file } => import_menu(&stores, file).await,
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[cfg(feature = "storage-rocksdb")]
fn open_stores(db_path: Option<&Path>) -> Result<Stores> {
    use restopos::infrastructure::rocksdb::RocksDbStore;

    match db_path {
        Some(path) => {
            info!(path = %path.display(), "using RocksDB storage");
            Ok(RocksDbStore::open(path).into_diagnostic()?.into_stores())
        }
        None => Ok(in_memory_stores()),
    }
}

#[cfg(not(feature = "storage-rocksdb"))]
fn open_stores(db_path: Option<&Path>) -> Result<Stores> {
    if db_path.is_some() {
        eprintln!(
            "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
        );
    }
    Ok(in_memory_stores())
}

fn auth_service(config: &Config, stores: &Stores) -> Result<AuthService> {
    Ok(AuthService::new(
        stores.users.clone(),
        Arc::new(LogMailer::new(config.app_name.clone())),
        config.auth_settings().into_diagnostic()?,
    ))
}

async fn serve(config: &Config, stores: Stores) -> Result<()> {
    config.require_jwt_secret().into_diagnostic()?;

    let gateway = MidtransGateway::new(config.midtrans_server_key.clone(), config.midtrans_production)
        .into_diagnostic()?;
    info!(
        server_key = %mask_key(config.midtrans_server_key.as_deref()),
        production = config.midtrans_production,
        "Midtrans configured"
    );

    let state = AppState::new(
        stores,
        Arc::new(gateway),
        Arc::new(LogMailer::new(config.app_name.clone())),
        config.auth_settings().into_diagnostic()?,
        config.http_settings(),
    );
    let created = state.menu.ensure_default_categories().await.into_diagnostic()?;
    if created > 0 {
        info!(created, "default categories created");
    }

    let address = format!("0.0.0.0:{}", config.port);
    info!("Binding to {address}");
    let listener = TcpListener::bind(&address).await.into_diagnostic()?;
    http::serve(listener, state).await.into_diagnostic()
}

async fn import_menu(stores: &Stores, file: PathBuf) -> Result<()> {
    let menu = MenuService::new(stores.categories.clone(), stores.menu.clone());
    menu.ensure_default_categories().await.into_diagnostic()?;

    let reader = MenuReader::new(File::open(&file).into_diagnostic()?);
    let (mut imported, mut skipped) = (0usize, 0usize);
    for (index, row) in reader.items().enumerate() {
        // Header is line 1.
        let line = index + 2;
        let result = match row {
            Ok(item) => menu.create_item(item).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(item) => {
                imported += 1;
                info!(id = item.id, name = %item.name, "menu item imported");
            }
            Err(e) => {
                skipped += 1;
                eprintln!("Line {line}: {e}");
            }
        }
    }

    println!("Imported {imported} menu items, skipped {skipped}");
    Ok(())
}
