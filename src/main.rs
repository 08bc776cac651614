use position_engine::api::routes::{AppState, app_router};
use position_engine::config::Config;
use position_engine::logging;
use position_engine::persistence::{
    InMemoryPositionRepository, PgPositionRepository, PositionRepository, create_pool_and_migrate,
};
use position_engine::positions::PositionService;
use position_engine::valuation::{SimpleGreeksModel, StaticPriceSource};
use std::error::Error;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = Config::from_env()?;
    logging::init(&config.log_level, config.log_format);

    let repo: Arc<dyn PositionRepository> = match &config.database_url {
        Some(url) => {
            let pool = create_pool_and_migrate(url, config.database_max_connections).await?;
            info!("using PostgreSQL position store");
            Arc::new(PgPositionRepository::new(pool))
        }
        None => {
            info!("DATABASE_URL not set, positions are kept in memory");
            Arc::new(InMemoryPositionRepository::new())
        }
    };

    let marks = StaticPriceSource::with_prices(config.mark_prices.clone());
    let positions = PositionService::new(repo, Arc::new(marks.clone()), Arc::new(SimpleGreeksModel));
    let app = app_router(AppState { positions, marks });

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %config.bind_addr, "position engine listening");
    axum::serve(listener, app).await?;
    Ok(())
}
