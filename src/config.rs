use std::env;

const DEV_SECRET_KEY: &str = "ruralmarknet-insecure-change-me";

#[derive(Debug, Clone, Default)]
pub struct PaymentConfig {
    pub stripe_api_key: Option<String>,
    pub stripe_webhook_secret: Option<String>,
    pub paypal_client_id: Option<String>,
    pub paypal_client_secret: Option<String>,
}

impl PaymentConfig {
    pub fn paypal_configured(&self) -> bool {
        self.paypal_client_id.is_some() && self.paypal_client_secret.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub secret_key: String,
    pub debug: bool,
    pub payments: PaymentConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let secret_key = non_empty("DJANGO_SECRET_KEY").unwrap_or_else(|| {
            tracing::warn!("DJANGO_SECRET_KEY is not set, using the development key");
            DEV_SECRET_KEY.to_string()
        });
        let debug = env::var("DJANGO_DEBUG").map(|v| v == "1").unwrap_or(true);
        let payments = PaymentConfig {
            stripe_api_key: non_empty("STRIPE_API_KEY"),
            stripe_webhook_secret: non_empty("STRIPE_WEBHOOK_SECRET"),
            paypal_client_id: non_empty("PAYPAL_CLIENT_ID"),
            paypal_client_secret: non_empty("PAYPAL_CLIENT_SECRET"),
        };
        Ok(Self {
            port,
            database_url,
            host,
            secret_key,
            debug,
            payments,
        })
    }

    /// Configuration for tests and tooling that never reads the environment.
    pub fn for_database(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            host: "127.0.0.1".to_string(),
            port: 0,
            secret_key: DEV_SECRET_KEY.to_string(),
            debug: true,
            payments: PaymentConfig::default(),
        }
    }
}

// Empty values count as unset.
fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}
