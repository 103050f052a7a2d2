//! Survey Data Service — HTTP API over a SQLite store of demographic survey entries.
//!
//! Default: http://0.0.0.0:5000/

mod config;
mod db;
mod error;
mod gateway;
mod routes;
mod seed;

use config::Config;
use db::Db;
use gateway::Gateway;
use routes::AppState;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    env_logger::init();

    let config = Config::from_env();

    log::info!("Opening database at: {}", config.database_path);
    let database = Arc::new(Db::open(&config.database_path).expect("Failed to open database"));

    let gateway = Gateway::new(database);
    // A failed startup seed is logged and the service keeps serving.
    if let Err(e) = gateway.ensure_seeded() {
        log::error!("Error seeding initial data: {}", e);
    }

    let app = routes::router(Arc::new(AppState { gateway }));

    let addr = config.listen_addr();
    log::info!("Survey Data Service listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind");

    axum::serve(listener, app).await.expect("Server error");
}
