use std::env;

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub jwt_ttl_hours: i64,
    pub cookie_secure: bool,
    pub public_url: String,
    pub client_origin: Option<String>,
    pub smtp: Option<SmtpConfig>,
    pub mail_from: String,
    pub admin_email: Option<String>,
    pub report_block_threshold: i32,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET is not set"))?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let jwt_ttl_hours = env::var("JWT_TTL_HOURS")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(24);
        let cookie_secure = env::var("COOKIE_SECURE")
            .map(|v| matches!(v.as_str(), "1" | "true" | "TRUE" | "yes"))
            .unwrap_or(false);
        let public_url = env::var("PUBLIC_URL")
            .unwrap_or_else(|_| format!("http://localhost:{port}"))
            .trim_end_matches('/')
            .to_string();

        let smtp = match env::var("SMTP_HOST").ok().filter(|h| !h.is_empty()) {
            Some(smtp_host) => Some(SmtpConfig {
                host: smtp_host,
                port: env::var("SMTP_PORT")
                    .ok()
                    .and_then(|p| p.parse::<u16>().ok())
                    .unwrap_or(587),
                username: env::var("SMTP_USERNAME").ok(),
                password: env::var("SMTP_PASSWORD").ok(),
            }),
            None => None,
        };

        let report_block_threshold = env::var("REPORT_BLOCK_THRESHOLD")
            .ok()
            .and_then(|v| v.parse::<i32>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(3);

        Ok(Self {
            port,
            database_url,
            host,
            jwt_secret,
            jwt_ttl_hours,
            cookie_secure,
            public_url,
            client_origin: env::var("CLIENT_ORIGIN").ok().filter(|o| !o.is_empty()),
            smtp,
            mail_from: env::var("MAIL_FROM")
                .unwrap_or_else(|_| "Book Donation <no-reply@localhost>".to_string()),
            admin_email: env::var("ADMIN_EMAIL").ok().filter(|e| !e.is_empty()),
            report_block_threshold,
        })
    }

    /// Config for tests and tools that never touch the environment.
    pub fn for_database(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            host: "127.0.0.1".to_string(),
            port: 3000,
            jwt_secret: "test-secret".to_string(),
            jwt_ttl_hours: 24,
            cookie_secure: false,
            public_url: "http://localhost:3000".to_string(),
            client_origin: None,
            smtp: None,
            mail_from: "Book Donation <no-reply@localhost>".to_string(),
            admin_email: Some("admin@localhost".to_string()),
            report_block_threshold: 3,
        }
    }
}
