use salesgrid::datasource::{
    CsvFileSheet, GoogleSheetsSource, MercadoPagoTaxSource, SheetSource,
};
use salesgrid::{api, config::Config, MarketplaceSource, MeliDataSource, OrdersPipeline};
use std::net::SocketAddr;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let port = config.port;

    let marketplace: Arc<dyn MarketplaceSource> =
        match MeliDataSource::new(config.meli_api_url.clone(), config.http_timeout) {
            Ok(source) => Arc::new(source),
            Err(e) => {
                eprintln!("Failed to create marketplace client: {}", e);
                std::process::exit(1);
            }
        };
    let sheet: Option<Arc<dyn SheetSource>> = match &config.sheet {
        Some(s) => {
            match GoogleSheetsSource::new(s.sheet_id.clone(), s.api_key.clone(), config.http_timeout) {
                Ok(source) => Some(Arc::new(source)),
                Err(e) => {
                    eprintln!("Failed to create sheets client: {}", e);
                    std::process::exit(1);
                }
            }
        }
        None => None,
    };

    let mut pipeline = OrdersPipeline::new(marketplace, config.clone());
    if let Some(sheet) = &sheet {
        pipeline = pipeline.with_token_sheet(sheet.clone());
    }
    match (&config.costs_csv_path, &sheet) {
        (Some(path), _) => {
            tracing::info!("Reading unit costs from {}", path);
            pipeline = pipeline.with_cost_sheet(Arc::new(CsvFileSheet::new(path)));
        }
        (None, Some(sheet)) => pipeline = pipeline.with_cost_sheet(sheet.clone()),
        (None, None) => tracing::warn!("No cost source configured; COSTO will be 0"),
    }
    if let Some(token) = &config.mp_access_token {
        match MercadoPagoTaxSource::new(config.mp_api_url.clone(), token.clone(), config.http_timeout) {
            Ok(taxes) => pipeline = pipeline.with_tax_source(Arc::new(taxes)),
            Err(e) => {
                eprintln!("Failed to create payments client: {}", e);
                std::process::exit(1);
            }
        }
    }
    if !pipeline.has_token_source() {
        tracing::warn!("No marketplace token source configured; /orders will fail");
    }

    tracing::info!(
        "Shipping rules: threshold={} inclusive={} split={} pivot={}",
        config.shipping.free_threshold,
        config.shipping.inclusive,
        config.shipping.split,
        config.date_pivot
    );

    let app = api::create_router(api::AppState::new(Arc::new(pipeline)));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("Failed to bind to {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    tracing::info!("Server listening on {}", addr);

    if let Err(e) = axum::serve(listener, app).await {
        eprintln!("Server error: {}", e);
        std::process::exit(1);
    }
}
