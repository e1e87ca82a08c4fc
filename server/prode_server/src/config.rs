use serde::{Deserialize, Serialize};
use std::env;

use crate::accounts::DepositAccount;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 3000 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/prode".to_string(),
            max_connections: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MailConfig {
    /// HTTP mail API endpoint messages are POSTed to.
    pub api_url: String,
    pub api_key: Option<String>,
    pub from: String,
    /// Where new payment proofs are forwarded.
    pub admin_email: String,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8025/api/send".to_string(),
            api_key: None,
            from: "prode@example.com".to_string(),
            admin_email: "admin@example.com".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UploadConfig {
    pub dir: String,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            dir: "uploads".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RulesConfig {
    /// Hours before a round's start time at which it closes, when no
    /// explicit closing override is set. Has been 2 and 1 in past seasons.
    pub closing_offset_hours: i64,
    /// Processed proofs per deposit account before rotating to the next.
    pub account_batch_size: i64,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            closing_offset_hours: 2,
            account_batch_size: 300,
        }
    }
}

impl RulesConfig {
    pub fn closing_offset(&self) -> chrono::Duration {
        chrono::Duration::hours(self.closing_offset_hours)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub mail: MailConfig,
    pub upload: UploadConfig,
    pub rules: RulesConfig,
    pub deposit_accounts: Vec<DepositAccount>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            mail: MailConfig::default(),
            upload: UploadConfig::default(),
            rules: RulesConfig::default(),
            deposit_accounts: DepositAccount::defaults(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(port) = env::var("PRODE_PORT").map_or(Ok(None), |p| p.parse::<u16>().map(Some)) {
            if let Some(port) = port {
                config.server.port = port;
            }
        }
        if let Ok(url) = env::var("DATABASE_URL") {
            config.database.url = url;
        }
        if let Ok(max) =
            env::var("DATABASE_MAX_CONNECTIONS").map_or(Ok(None), |m| m.parse::<u32>().map(Some))
        {
            if let Some(max) = max {
                config.database.max_connections = max;
            }
        }
        if let Ok(api_url) = env::var("PRODE_MAIL_API_URL") {
            config.mail.api_url = api_url;
        }
        if let Ok(api_key) = env::var("PRODE_MAIL_API_KEY") {
            config.mail.api_key = Some(api_key);
        }
        if let Ok(from) = env::var("PRODE_MAIL_FROM") {
            config.mail.from = from;
        }
        if let Ok(admin) = env::var("PRODE_ADMIN_EMAIL") {
            config.mail.admin_email = admin;
        }
        if let Ok(dir) = env::var("PRODE_UPLOAD_DIR") {
            config.upload.dir = dir;
        }
        if let Ok(hours) = env::var("PRODE_CLOSING_OFFSET_HOURS")
            .map_or(Ok(None), |h| h.parse::<i64>().map(Some))
        {
            if let Some(hours) = hours {
                config.rules.closing_offset_hours = hours;
            }
        }
        if let Ok(batch) =
            env::var("PRODE_ACCOUNT_BATCH_SIZE").map_or(Ok(None), |b| b.parse::<i64>().map(Some))
        {
            if let Some(batch) = batch {
                config.rules.account_batch_size = batch;
            }
        }
        if let Ok(accounts) = env::var("PRODE_ACCOUNTS") {
            match serde_json::from_str::<Vec<DepositAccount>>(&accounts) {
                Ok(parsed) if !parsed.is_empty() => config.deposit_accounts = parsed,
                Ok(_) => {}
                Err(e) => tracing::warn!("Ignoring unparseable PRODE_ACCOUNTS: {}", e),
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.rules.closing_offset_hours, 2);
        assert_eq!(config.rules.account_batch_size, 300);
        assert!(!config.deposit_accounts.is_empty());
    }

    #[test]
    fn test_closing_offset_duration() {
        let rules = RulesConfig {
            closing_offset_hours: 1,
            account_batch_size: 3,
        };
        assert_eq!(rules.closing_offset(), chrono::Duration::hours(1));
    }
}
