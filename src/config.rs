use anyhow::{anyhow, Context, Result};
use jsonwebtoken::Algorithm;

const MAX_ACCESS_TOKEN_MINUTES: i64 = 7 * 24 * 60;
const MAX_REFRESH_TOKEN_DAYS: i64 = 365;

/// Runtime configuration, read once at start-up.
///
/// | Variable                      | Default                 |
/// |-------------------------------|-------------------------|
/// | `DATABASE_URL`                | required                |
/// | `JWT_SECRET_KEY`              | required                |
/// | `JWT_ALGORITHM`               | `HS256`                 |
/// | `ACCESS_TOKEN_EXPIRE_MINUTES` | `30`                    |
/// | `REFRESH_TOKEN_EXPIRE_DAYS`   | `7`                     |
/// | `BIND_ADDR`                   | `0.0.0.0:3000`          |
/// | `DATABASE_MAX_CONNECTIONS`    | `20`                    |
/// | `APP_BASE_URL`                | `http://localhost:3000` |
/// | `SMTP_*`                      | unset (mail disabled)   |
#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub bind_addr: String,
    pub app_base_url: String,
    pub jwt: JwtConfig,
    pub smtp: Option<SmtpConfig>,
}

#[derive(Clone, Debug)]
pub struct JwtConfig {
    pub secret: String,
    pub algorithm: Algorithm,
    pub access_token_minutes: i64,
    pub refresh_token_days: i64,
}

#[derive(Clone, Debug)]
pub struct SmtpConfig {
    pub server: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // A missing .env file is fine; real deployments set the variables directly.
        let _ = dotenvy::dotenv();
        Self::from_vars(|key| std::env::var(key).ok())
    }

    pub fn from_vars<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let database_url = get("DATABASE_URL").context("DATABASE_URL must be set")?;
        let secret = get("JWT_SECRET_KEY").context("JWT_SECRET_KEY must be set")?;

        let algorithm = match get("JWT_ALGORITHM").as_deref() {
            None | Some("HS256") => Algorithm::HS256,
            Some("HS384") => Algorithm::HS384,
            Some("HS512") => Algorithm::HS512,
            Some(other) => return Err(anyhow!("Unsupported JWT_ALGORITHM: {}", other)),
        };

        let access_token_minutes = parse_or(&get, "ACCESS_TOKEN_EXPIRE_MINUTES", 30)?;
        let refresh_token_days = parse_or(&get, "REFRESH_TOKEN_EXPIRE_DAYS", 7)?;
        if !(1..=MAX_ACCESS_TOKEN_MINUTES).contains(&access_token_minutes) {
            return Err(anyhow!(
                "ACCESS_TOKEN_EXPIRE_MINUTES must be between 1 and {}",
                MAX_ACCESS_TOKEN_MINUTES
            ));
        }
        if !(1..=MAX_REFRESH_TOKEN_DAYS).contains(&refresh_token_days) {
            return Err(anyhow!(
                "REFRESH_TOKEN_EXPIRE_DAYS must be between 1 and {}",
                MAX_REFRESH_TOKEN_DAYS
            ));
        }

        let smtp = match get("SMTP_SERVER") {
            None => None,
            Some(server) => Some(SmtpConfig {
                server,
                port: get("SMTP_PORT")
                    .context("Missing SMTP_PORT env var")?
                    .parse()
                    .context("SMTP_PORT must be a valid u16 integer")?,
                username: get("SMTP_USERNAME").context("Missing SMTP_USERNAME env var")?,
                password: get("SMTP_PASSWORD").context("Missing SMTP_PASSWORD env var")?,
                from: get("SMTP_FROM").context("Missing SMTP_FROM env var")?,
            }),
        };

        Ok(Self {
            database_url,
            database_max_connections: parse_or(&get, "DATABASE_MAX_CONNECTIONS", 20)?,
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".into()),
            app_base_url: get("APP_BASE_URL")
                .unwrap_or_else(|| "http://localhost:3000".into())
                .trim_end_matches('/')
                .to_string(),
            jwt: JwtConfig {
                secret,
                algorithm,
                access_token_minutes,
                refresh_token_days,
            },
            smtp,
        })
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} must be a number", key)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_required_vars_are_set() {
        let config = Config::from_vars(vars(&[
            ("DATABASE_URL", "postgres://localhost/notes"),
            ("JWT_SECRET_KEY", "secret"),
        ]))
        .unwrap();

        assert_eq!(config.jwt.algorithm, Algorithm::HS256);
        assert_eq!(config.jwt.access_token_minutes, 30);
        assert_eq!(config.jwt.refresh_token_days, 7);
        assert_eq!(config.bind_addr, "0.0.0.0:3000");
        assert_eq!(config.database_max_connections, 20);
        assert!(config.smtp.is_none());
    }

    #[test]
    fn missing_secret_is_an_error() {
        let err = Config::from_vars(vars(&[("DATABASE_URL", "postgres://localhost/notes")]))
            .unwrap_err();
        assert!(err.to_string().contains("JWT_SECRET_KEY"));

        let blank = Config::from_vars(vars(&[
            ("DATABASE_URL", "postgres://localhost/notes"),
            ("JWT_SECRET_KEY", "  "),
        ]));
        assert!(blank.is_err());
    }

    #[test]
    fn unsupported_algorithm_is_rejected() {
        let result = Config::from_vars(vars(&[
            ("DATABASE_URL", "postgres://localhost/notes"),
            ("JWT_SECRET_KEY", "secret"),
            ("JWT_ALGORITHM", "RS256"),
        ]));
        assert!(result.is_err());
    }

    #[test]
    fn lifetimes_and_base_url_are_parsed() {
        let config = Config::from_vars(vars(&[
            ("DATABASE_URL", "postgres://localhost/notes"),
            ("JWT_SECRET_KEY", "secret"),
            ("JWT_ALGORITHM", "HS512"),
            ("ACCESS_TOKEN_EXPIRE_MINUTES", "5"),
            ("REFRESH_TOKEN_EXPIRE_DAYS", "14"),
            ("APP_BASE_URL", "https://notes.example.com/"),
        ]))
        .unwrap();

        assert_eq!(config.jwt.algorithm, Algorithm::HS512);
        assert_eq!(config.jwt.access_token_minutes, 5);
        assert_eq!(config.jwt.refresh_token_days, 14);
        assert_eq!(config.app_base_url, "https://notes.example.com");
    }

    #[test]
    fn out_of_range_lifetimes_are_rejected() {
        let with = |key: &'static str, value: &'static str| {
            Config::from_vars(vars(&[
                ("DATABASE_URL", "postgres://localhost/notes"),
                ("JWT_SECRET_KEY", "secret"),
                (key, value),
            ]))
        };

        assert!(with("ACCESS_TOKEN_EXPIRE_MINUTES", "0").is_err());
        assert!(with("ACCESS_TOKEN_EXPIRE_MINUTES", "99999999999999").is_err());
        assert!(with("REFRESH_TOKEN_EXPIRE_DAYS", "-1").is_err());
        let err = with("REFRESH_TOKEN_EXPIRE_DAYS", "100000000").unwrap_err();
        assert!(err.to_string().contains("REFRESH_TOKEN_EXPIRE_DAYS"));

        assert!(with("ACCESS_TOKEN_EXPIRE_MINUTES", "10080").is_ok());
        assert!(with("REFRESH_TOKEN_EXPIRE_DAYS", "365").is_ok());
    }

    #[test]
    fn partial_smtp_settings_are_rejected() {
        let result = Config::from_vars(vars(&[
            ("DATABASE_URL", "postgres://localhost/notes"),
            ("JWT_SECRET_KEY", "secret"),
            ("SMTP_SERVER", "smtp.example.com"),
        ]));
        assert!(result.is_err());
    }
}
