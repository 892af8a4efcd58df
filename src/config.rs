use std::env;
use std::str::FromStr;

use crate::error::{AppError, Result};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: Option<DatabaseConfig>,
    pub site: SiteConfig,
    pub payment: PaymentConfig,
    pub supabase: SupabaseConfig,
    pub admin: AdminConfig,
    pub cors: CorsConfig,
    pub nats_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_body_size: usize,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct SiteConfig {
    /// Fallback base for payment return URLs when the request carries no Origin.
    pub site_url: String,
}

#[derive(Debug, Clone)]
pub struct PaymentConfig {
    pub access_token: Option<String>,
    pub public_key: Option<String>,
    pub api_url: String,
    pub currency: String,
    pub public_api_url: Option<String>,
}

impl PaymentConfig {
    pub fn notification_url(&self) -> Option<String> {
        self.public_api_url
            .as_deref()
            .map(|base| format!("{}/api/v1/webhooks/payment", base.trim_end_matches('/')))
    }

    pub fn is_configured(&self) -> bool { self.access_token.as_deref().is_some_and(|t| !t.is_empty()) }
}

#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    pub url: Option<String>,
    pub anon_key: Option<String>,
    pub service_role_key: Option<String>,
    pub jwt_secret: Option<String>,
    pub storage_bucket: String,
}

#[derive(Debug, Clone, Default)]
pub struct AdminConfig {
    /// Empty means any authenticated session may use the back office.
    pub allowed_emails: Vec<String>,
}

impl AdminConfig {
    pub fn allows(&self, email: &str) -> bool {
        self.allowed_emails.is_empty() || self.allowed_emails.iter().any(|e| e.eq_ignore_ascii_case(email))
    }
}

#[derive(Debug, Clone, Default)]
pub struct CorsConfig {
    /// Empty means any origin.
    pub allowed_origins: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| get(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        Ok(Self {
            server: ServerConfig {
                host: get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: parse_or(get("PORT"), "PORT", 8083)?,
                max_body_size: parse_or(get("MAX_BODY_SIZE"), "MAX_BODY_SIZE", 6 * 1024 * 1024)?,
            },
            database: match get("DATABASE_URL") {
                Some(url) => Some(DatabaseConfig {
                    url,
                    max_connections: parse_or(get("DB_MAX_CONNECTIONS"), "DB_MAX_CONNECTIONS", 10)?,
                }),
                None => None,
            },
            site: SiteConfig {
                site_url: get("SITE_URL").unwrap_or_else(|| "http://localhost:8080".to_string()),
            },
            payment: PaymentConfig {
                access_token: get("MERCADOPAGO_ACCESS_TOKEN"),
                public_key: get("MERCADOPAGO_PUBLIC_KEY"),
                api_url: get("MERCADOPAGO_API_URL").unwrap_or_else(|| "https://api.mercadopago.com".to_string()),
                currency: get("CURRENCY").unwrap_or_else(|| "ARS".to_string()),
                public_api_url: get("PUBLIC_API_URL"),
            },
            supabase: SupabaseConfig {
                url: get("SUPABASE_URL").map(|u| u.trim_end_matches('/').to_string()),
                anon_key: get("SUPABASE_ANON_KEY"),
                service_role_key: get("SUPABASE_SERVICE_ROLE_KEY"),
                jwt_secret: get("SUPABASE_JWT_SECRET"),
                storage_bucket: get("STORAGE_BUCKET").unwrap_or_else(|| "product_images".to_string()),
            },
            admin: AdminConfig { allowed_emails: split_list(get("ADMIN_EMAILS")) },
            cors: CorsConfig { allowed_origins: split_list(get("CORS_ALLOWED_ORIGINS")) },
            nats_url: get("NATS_URL"),
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn parse_or<T: FromStr>(raw: Option<String>, key: &str, default: T) -> Result<T> {
    match raw {
        Some(v) => v.parse().map_err(|_| AppError::Config(format!("Invalid {key} value"))),
        None => Ok(default),
    }
}

fn split_list(raw: Option<String>) -> Vec<String> {
    raw.map(|v| v.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        AppConfig::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn test_defaults() {
        let c = config(&[]).unwrap();
        assert_eq!(c.server_address(), "0.0.0.0:8083");
        assert!(c.database.is_none());
        assert_eq!(c.payment.currency, "ARS");
        assert_eq!(c.supabase.storage_bucket, "product_images");
        assert!(!c.payment.is_configured());
        assert!(c.payment.notification_url().is_none());
        assert!(c.admin.allows("anyone@example.com"));
    }

    #[test]
    fn test_overrides_and_lists() {
        let c = config(&[
            ("PORT", "9000"),
            ("DATABASE_URL", "postgres://localhost/shop"),
            ("ADMIN_EMAILS", "Owner@Shop.com, ops@shop.com"),
            ("PUBLIC_API_URL", "https://api.shop.com/"),
            ("MERCADOPAGO_ACCESS_TOKEN", "TEST-123"),
        ])
        .unwrap();
        assert_eq!(c.server.port, 9000);
        assert_eq!(c.database.as_ref().map(|d| d.max_connections), Some(10));
        assert!(c.admin.allows("owner@shop.com"));
        assert!(!c.admin.allows("intruder@shop.com"));
        assert_eq!(c.payment.notification_url().as_deref(), Some("https://api.shop.com/api/v1/webhooks/payment"));
        assert!(c.payment.is_configured());
    }

    #[test]
    fn test_invalid_numbers_are_config_errors() {
        assert!(matches!(config(&[("PORT", "eighty")]), Err(AppError::Config(_))));
    }
}
