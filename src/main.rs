use std::net::SocketAddr;

use clap::Parser;
use geogate::cli::{
    Args, build_config, init_logging, load_token_secret, open_database, validate_country_api_url,
};
use geogate::create_app;
use geogate::ingest::{self, CountryApiClient};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    init_logging(&args.log_format);

    let Some(token_secret) = load_token_secret(args.token_secret_file.as_deref()) else {
        std::process::exit(1);
    };

    let Some(db) = open_database(&args.database).await else {
        std::process::exit(1);
    };

    if let Some(raw) = args.country_api_url.as_deref() {
        let Some(base_url) = validate_country_api_url(raw) else {
            std::process::exit(1);
        };
        ingest::spawn_update_scheduler(db.clone(), CountryApiClient::new(base_url));
    }

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            error!(address = %addr, error = %e, "Failed to bind");
            std::process::exit(1);
        });

    let local_addr = listener.local_addr().unwrap();

    let config = build_config(db, token_secret);
    let app = create_app(&config);

    info!(address = %local_addr, "Listening");

    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    if let Err(e) = axum::serve(listener, make_service).await {
        error!(error = %e, "Server error");
        std::process::exit(1);
    }
}
