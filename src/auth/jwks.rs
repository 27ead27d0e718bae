//! Supabase JWT verification against the project's JWKS endpoint.
//!
//! Keys are fetched over HTTP and held in memory for a TTL. A token whose
//! `kid` is not cached triggers one refresh; refreshes are rate limited so a
//! flood of bad tokens cannot hammer the endpoint.

use anyhow::{Context, Result};
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use parking_lot::RwLock;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::Claims;

const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(1);
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct KeySet {
    keys: Vec<KeySetEntry>,
}

#[derive(Debug, Deserialize)]
struct KeySetEntry {
    kid: String,
    kty: String,
    n: String,
    e: String,
}

struct CachedKey {
    key: DecodingKey,
    cached_at: Instant,
}

#[derive(Default)]
struct KeyStore {
    keys: HashMap<String, CachedKey>,
    last_fetch: Option<Instant>,
}

/// Verifies Supabase RS256 tokens using cached JWKS keys.
#[derive(Clone)]
pub struct JwksCache {
    store: Arc<RwLock<KeyStore>>,
    http: reqwest::Client,
    jwks_url: String,
    validation: Arc<Validation>,
    ttl: Duration,
}

impl JwksCache {
    pub fn new(jwks_url: String, issuer: String, audience: String, ttl_seconds: u64) -> Self {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[&issuer]);
        validation.set_audience(&[&audience]);
        validation.validate_exp = true;
        validation.validate_nbf = true;

        let http = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            store: Arc::new(RwLock::new(KeyStore::default())),
            http,
            jwks_url,
            validation: Arc::new(validation),
            ttl: Duration::from_secs(ttl_seconds),
        }
    }

    /// Verify a JWT and return its claims.
    pub async fn verify_token(&self, token: &str) -> Result<Claims> {
        let header = decode_header(token).context("Invalid JWT header")?;
        let kid = header.kid.context("JWT missing kid header")?;

        let key = self.key_for(&kid).await?;
        let data = decode::<Claims>(token, &key, &self.validation)
            .context("JWT validation failed")?;

        Ok(data.claims)
    }

    /// Fetch keys ahead of the first request.
    pub async fn warm_cache(&self) -> Result<()> {
        self.refresh().await
    }

    async fn key_for(&self, kid: &str) -> Result<DecodingKey> {
        if let Some(key) = self.cached_key(kid) {
            return Ok(key);
        }

        self.refresh().await?;

        self.cached_key(kid)
            .with_context(|| format!("Key {} not present in JWKS", kid))
    }

    fn cached_key(&self, kid: &str) -> Option<DecodingKey> {
        let store = self.store.read();
        store
            .keys
            .get(kid)
            .filter(|cached| cached.cached_at.elapsed() < self.ttl)
            .map(|cached| cached.key.clone())
    }

    async fn refresh(&self) -> Result<()> {
        {
            let store = self.store.read();
            if let Some(last) = store.last_fetch {
                if last.elapsed() < MIN_REFRESH_INTERVAL {
                    return Ok(());
                }
            }
        }

        tracing::debug!(url = %self.jwks_url, "Fetching JWKS");

        let response = self
            .http
            .get(&self.jwks_url)
            .send()
            .await
            .context("Failed to fetch JWKS")?;

        if !response.status().is_success() {
            anyhow::bail!("JWKS fetch failed with status {}", response.status());
        }

        let key_set: KeySet = response.json().await.context("Failed to parse JWKS")?;

        let now = Instant::now();
        let mut store = self.store.write();
        store.last_fetch = Some(now);

        let mut loaded = 0usize;
        for entry in key_set.keys {
            if entry.kty != "RSA" {
                continue;
            }
            match DecodingKey::from_rsa_components(&entry.n, &entry.e) {
                Ok(key) => {
                    store.keys.insert(
                        entry.kid,
                        CachedKey {
                            key,
                            cached_at: now,
                        },
                    );
                    loaded += 1;
                }
                Err(e) => {
                    tracing::warn!(kid = %entry.kid, error = %e, "Skipping unparsable JWK");
                }
            }
        }

        tracing::info!(keys = loaded, "JWKS cache refreshed");
        Ok(())
    }
}
