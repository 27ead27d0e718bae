use anyhow::{Context, Result};
use std::env;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Dev,
    Staging,
    Prod,
}

impl Environment {
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "prod" | "production" => Self::Prod,
            "staging" => Self::Staging,
            _ => Self::Dev,
        }
    }

    pub fn is_dev(&self) -> bool {
        matches!(self, Self::Dev)
    }

    pub fn is_prod(&self) -> bool {
        matches!(self, Self::Prod)
    }
}

/// PayPal environment selector (maps to the REST API base URL)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayPalEnvironment {
    Sandbox,
    Live,
}

impl PayPalEnvironment {
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "live" | "production" => Self::Live,
            _ => Self::Sandbox,
        }
    }

    pub fn base_url(&self) -> &'static str {
        match self {
            Self::Sandbox => "https://api-m.sandbox.paypal.com",
            Self::Live => "https://api-m.paypal.com",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub env: Environment,
    pub server_addr: String,

    // Database
    pub database_url: String,
    pub database_max_connections: u32,

    // Redis
    pub redis_url: String,
    pub redis_cache_ttl_seconds: u64,

    // CORS
    pub cors_allow_origins: Vec<String>,

    // Supabase Auth
    pub supabase_jwt_jwks_url: String,
    pub supabase_jwt_issuer: String,
    pub supabase_jwt_audience: String,
    pub jwks_cache_ttl_seconds: u64,

    // Crawler service
    pub crawler_service_url: String,
    pub crawler_api_key: String,
    pub crawler_timeout_seconds: u64,

    // Azure OpenAI
    pub azure_openai_endpoint: String,
    pub azure_openai_api_key: String,
    pub azure_openai_deployment: String,
    pub azure_openai_api_version: String,

    // PayPal
    pub paypal_client_id: String,
    pub paypal_client_secret: String,
    pub paypal_environment: PayPalEnvironment,

    // Resend (transactional email)
    pub resend_api_key: String,
    pub email_from_address: String,

    // Scheduled jobs
    pub cron_secret: String,

    // Frontend base URL (invitation links, PayPal return URLs)
    pub app_base_url: String,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        let env = Environment::from_str(&env::var("ENV").unwrap_or_else(|_| "dev".to_string()));
        let server_addr = env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        // Database
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let database_max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(10);

        // Redis
        let redis_url =
            env::var("REDIS_URL").unwrap_or_else(|_| "redis://redis:6379/0".to_string());
        let redis_cache_ttl_seconds = env::var("REDIS_CACHE_TTL_SECONDS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3600); // 1 hour default

        // CORS
        let cors_allow_origins = env::var("CORS_ALLOW_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        // Supabase Auth
        let supabase_jwt_jwks_url =
            env::var("SUPABASE_JWT_JWKS_URL").context("SUPABASE_JWT_JWKS_URL must be set")?;
        let supabase_jwt_issuer =
            env::var("SUPABASE_JWT_ISSUER").context("SUPABASE_JWT_ISSUER must be set")?;
        let supabase_jwt_audience =
            env::var("SUPABASE_JWT_AUDIENCE").unwrap_or_else(|_| "authenticated".to_string());
        let jwks_cache_ttl_seconds = env::var("JWKS_CACHE_TTL_SECONDS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(1800); // 30 minutes default

        // Crawler service
        let crawler_service_url = env::var("CRAWLER_SERVICE_URL")
            .unwrap_or_else(|_| "http://crawler-service:8000".to_string());
        let crawler_api_key =
            env::var("CRAWLER_API_KEY").context("CRAWLER_API_KEY must be set")?;
        let crawler_timeout_seconds = env::var("CRAWLER_TIMEOUT_SECONDS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(120); // analysis kick-offs can be slow

        // Azure OpenAI
        let azure_openai_endpoint =
            env::var("AZURE_OPENAI_ENDPOINT").context("AZURE_OPENAI_ENDPOINT must be set")?;
        let azure_openai_api_key =
            env::var("AZURE_OPENAI_API_KEY").context("AZURE_OPENAI_API_KEY must be set")?;
        let azure_openai_deployment =
            env::var("AZURE_OPENAI_DEPLOYMENT").unwrap_or_else(|_| "gpt-4o-mini".to_string());
        let azure_openai_api_version =
            env::var("AZURE_OPENAI_API_VERSION").unwrap_or_else(|_| "2024-02-01".to_string());

        // PayPal
        let paypal_client_id =
            env::var("PAYPAL_CLIENT_ID").context("PAYPAL_CLIENT_ID must be set")?;
        let paypal_client_secret =
            env::var("PAYPAL_CLIENT_SECRET").context("PAYPAL_CLIENT_SECRET must be set")?;
        let paypal_environment = PayPalEnvironment::from_str(
            &env::var("PAYPAL_ENVIRONMENT").unwrap_or_else(|_| "sandbox".to_string()),
        );

        // Resend
        let resend_api_key = env::var("RESEND_API_KEY").context("RESEND_API_KEY must be set")?;
        let email_from_address = env::var("EMAIL_FROM_ADDRESS")
            .unwrap_or_else(|_| "LilySEO <noreply@lilyseo.com>".to_string());

        // Scheduled jobs
        let cron_secret = env::var("CRON_SECRET").context("CRON_SECRET must be set")?;

        // Frontend
        let app_base_url =
            env::var("APP_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());

        Ok(Settings {
            env,
            server_addr,
            database_url,
            database_max_connections,
            redis_url,
            redis_cache_ttl_seconds,
            cors_allow_origins,
            supabase_jwt_jwks_url,
            supabase_jwt_issuer,
            supabase_jwt_audience,
            jwks_cache_ttl_seconds,
            crawler_service_url,
            crawler_api_key,
            crawler_timeout_seconds,
            azure_openai_endpoint,
            azure_openai_api_key,
            azure_openai_deployment,
            azure_openai_api_version,
            paypal_client_id,
            paypal_client_secret,
            paypal_environment,
            resend_api_key,
            email_from_address,
            cron_secret,
            app_base_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_parsing_defaults_to_dev() {
        assert_eq!(Environment::from_str("production"), Environment::Prod);
        assert_eq!(Environment::from_str("staging"), Environment::Staging);
        assert_eq!(Environment::from_str("anything-else"), Environment::Dev);
    }

    #[test]
    fn paypal_environment_selects_base_url() {
        assert_eq!(
            PayPalEnvironment::from_str("live").base_url(),
            "https://api-m.paypal.com"
        );
        assert_eq!(
            PayPalEnvironment::from_str("sandbox").base_url(),
            "https://api-m.sandbox.paypal.com"
        );
        // Unknown values fall back to sandbox
        assert_eq!(
            PayPalEnvironment::from_str(""),
            PayPalEnvironment::Sandbox
        );
    }
}
