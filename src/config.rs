use std::str::FromStr;

use serde::Deserialize;

/// Wire layout of the session token before base64 encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenFormat {
    /// `email|millis`, split on the last delimiter.
    Delimited,
    /// `email` immediately followed by `millis`, split on the current time.
    Legacy,
}

impl FromStr for TokenFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "delimited" => Ok(Self::Delimited),
            "legacy" => Ok(Self::Legacy),
            other => anyhow::bail!("unknown TOKEN_FORMAT {other:?}, expected delimited or legacy"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenConfig {
    pub format: TokenFormat,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub token: TokenConfig,
}

/// Longest TTL whose millisecond value fits in an `i64`.
pub const MAX_TTL_MINUTES: i64 = i64::MAX / (60 * 1000);

/// Parse an optional environment value, failing on anything unparsable.
fn parse_var<T>(name: &str, raw: Option<String>, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        Some(v) => v
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid {name} {v:?}: {e}")),
        None => Ok(default),
    }
}

fn parse_ttl_minutes(raw: Option<String>) -> anyhow::Result<i64> {
    let ttl = parse_var("TOKEN_TTL_MINUTES", raw, 60i64)?;
    if !(0..=MAX_TTL_MINUTES).contains(&ttl) {
        anyhow::bail!("TOKEN_TTL_MINUTES must be between 0 and {MAX_TTL_MINUTES}, got {ttl}");
    }
    Ok(ttl)
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let host = std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port = parse_var(
            "APP_PORT",
            std::env::var("APP_PORT").or_else(|_| std::env::var("PORT")).ok(),
            3000u16,
        )?;
        let token = TokenConfig {
            format: parse_var(
                "TOKEN_FORMAT",
                std::env::var("TOKEN_FORMAT").ok(),
                TokenFormat::Delimited,
            )?,
            ttl_minutes: parse_ttl_minutes(std::env::var("TOKEN_TTL_MINUTES").ok())?,
        };
        Ok(Self { host, port, token })
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 3000,
            token: TokenConfig {
                format: TokenFormat::Delimited,
                ttl_minutes: 60,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_format_parses_case_insensitively() {
        assert_eq!("Legacy".parse::<TokenFormat>().unwrap(), TokenFormat::Legacy);
        assert_eq!(" delimited ".parse::<TokenFormat>().unwrap(), TokenFormat::Delimited);
    }

    #[test]
    fn token_format_rejects_unknown_value() {
        let err = "jwt".parse::<TokenFormat>().unwrap_err();
        assert!(err.to_string().contains("TOKEN_FORMAT"));
    }

    #[test]
    fn ttl_defaults_and_accepts_bounds() {
        assert_eq!(parse_ttl_minutes(None).unwrap(), 60);
        assert_eq!(parse_ttl_minutes(Some("0".into())).unwrap(), 0);
        assert_eq!(
            parse_ttl_minutes(Some(MAX_TTL_MINUTES.to_string())).unwrap(),
            MAX_TTL_MINUTES
        );
    }

    #[test]
    fn ttl_rejects_garbage_negative_and_overflowing_values() {
        let too_big = (MAX_TTL_MINUTES + 1).to_string();
        for raw in ["soon", "-1", too_big.as_str()] {
            let err = parse_ttl_minutes(Some(raw.to_string())).unwrap_err();
            assert!(err.to_string().contains("TOKEN_TTL_MINUTES"), "{raw}: {err}");
        }
    }

    #[test]
    fn invalid_port_is_an_error() {
        assert!(parse_var("APP_PORT", Some("http".into()), 3000u16).is_err());
        assert_eq!(parse_var("APP_PORT", None, 3000u16).unwrap(), 3000);
    }
}
