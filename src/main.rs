use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use log::{info, warn};

mod balance;
mod config;
mod dto;
mod error;
mod ledger;
mod money;
mod routes;
mod schemas;
mod settlement;
mod split;
mod store;

use crate::config::Config;
use crate::ledger::Ledger;
use crate::store::{GroupStore, MemoryStore, MongoStore};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    init_log();

    let config = Config::from_env()?;
    match &config.mongodb_uri {
        Some(uri) => {
            info!("Using the following URI: {}", uri);
            let store = MongoStore::connect(uri, &config.database_name).await?;
            serve(store, &config).await?;
        }
        None => {
            warn!("MONGODB_URI is not set, groups will only be kept in memory");
            serve(MemoryStore::new(), &config).await?;
        }
    }
    Ok(())
}

fn init_log() {
    let filters = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    pretty_env_logger::formatted_builder()
        .parse_filters(&filters)
        .init();
}

async fn serve<S>(store: S, config: &Config) -> std::io::Result<()>
where
    S: GroupStore + Send + Sync + 'static,
{
    let ledger = web::Data::new(Ledger::new(store));
    let cors_origin = config.cors_origin.clone();

    info!("Listening on {}:{}", config.bind_address, config.port);
    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&cors_origin)
            .allow_any_method()
            .allow_any_header()
            .supports_credentials();
        App::new()
            .wrap(cors)
            .wrap(Logger::default())
            .app_data(ledger.clone())
            .configure(routes::configure::<S>)
    })
    .bind((config.bind_address.as_str(), config.port))?
    .run()
    .await
}
