//! Service layer modules for external integrations.
//!
//! Clients for the crawler microservice, Azure OpenAI, PayPal, Resend and
//! Redis, plus shared database helpers (profiles, tier limits,
//! notifications).

pub mod cache;
pub mod crawler_client;
pub mod email;
pub mod limits;
pub mod notifications;
pub mod openai_client;
pub mod paypal_client;
pub mod profiles;

pub use cache::RedisCache;
pub use crawler_client::CrawlerClient;
pub use email::EmailClient;
pub use openai_client::OpenAiClient;
pub use paypal_client::PayPalClient;
