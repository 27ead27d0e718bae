use anyhow::Result;

use lilyseo_backend::services::{
    CrawlerClient, EmailClient, OpenAiClient, PayPalClient, RedisCache,
};
use lilyseo_backend::{app, auth, config, db, logging};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let settings = config::Settings::from_env()?;

    // Initialize logging
    logging::init_logging(&settings.env);

    tracing::info!(
        env = ?settings.env,
        server_addr = %settings.server_addr,
        "Starting LilySEO backend"
    );

    // Create database pool
    let pool = db::create_pool(&settings).await?;

    // Create Redis cache (connects lazily on first use)
    let cache = RedisCache::new(&settings.redis_url, settings.redis_cache_ttl_seconds)?;

    // Create external service clients
    let crawler = CrawlerClient::new(
        &settings.crawler_service_url,
        &settings.crawler_api_key,
        settings.crawler_timeout_seconds,
    )?;
    let openai = OpenAiClient::new(
        &settings.azure_openai_endpoint,
        &settings.azure_openai_api_key,
        &settings.azure_openai_deployment,
        &settings.azure_openai_api_version,
    )?;
    let paypal = PayPalClient::new(
        settings.paypal_environment,
        &settings.paypal_client_id,
        &settings.paypal_client_secret,
    )?;
    let email = EmailClient::new(&settings.resend_api_key, &settings.email_from_address)?;

    // Optionally check crawler service health (non-blocking)
    tokio::spawn({
        let crawler = crawler.clone();
        async move {
            match crawler.health_check().await {
                Ok(()) => tracing::info!("Crawler service is healthy"),
                Err(e) => tracing::warn!(error = %e, "Crawler service health check failed - will retry on first request"),
            }
        }
    });

    // Create JWKS cache for JWT verification
    let jwks_cache = auth::JwksCache::new(
        settings.supabase_jwt_jwks_url.clone(),
        settings.supabase_jwt_issuer.clone(),
        settings.supabase_jwt_audience.clone(),
        settings.jwks_cache_ttl_seconds,
    );

    // Optionally warm the JWKS cache
    if let Err(e) = jwks_cache.warm_cache().await {
        tracing::warn!(error = %e, "Failed to warm JWKS cache - will fetch on first request");
    }

    // Create application state
    let state = app::AppState::new(
        pool,
        settings.clone(),
        jwks_cache,
        cache,
        crawler,
        openai,
        paypal,
        email,
    );

    // Build application
    let app = app::create_app(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&settings.server_addr).await?;
    tracing::info!("Listening on {}", settings.server_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
