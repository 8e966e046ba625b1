use actix_web::{middleware::Logger, App, HttpServer};
use log::{error, info};

use bus_book::{
    config::Config,
    db::MongoDB,
    security::middleware::{cors, security_headers},
    AppState,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = Config::from_env().map_err(|e| {
        error!("Configuration error: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
    })?;

    info!("Connecting to MongoDB database {}", config.database_name);
    let db = MongoDB::new(&config.mongodb_uri, &config.database_name)
        .await
        .map_err(|e| {
            error!("Failed to create MongoDB client: {}", e);
            std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
        })?;

    if let Err(e) = db.ensure_indexes().await {
        error!("Failed to create indexes: {}", e);
    }
    if let Err(e) = db.seed_data(&config).await {
        error!("Failed to seed data: {}", e);
    }

    let address = config.bind_address();
    let state = AppState::new(config, db);

    info!("Server running on {}", address);
    HttpServer::new(move || {
        let state = state.clone();
        App::new()
            .wrap(cors(&state.config))
            .wrap(security_headers())
            .wrap(Logger::default())
            .configure(|cfg| state.configure(cfg))
    })
    .bind(&address)?
    .run()
    .await
}
