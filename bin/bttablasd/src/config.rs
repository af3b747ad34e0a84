//! Server configuration loaded from a TOML file.

use std::path::{Path, PathBuf};

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub jwt: JwtConfig,
    pub storage: StorageConfig,

    /// Optional bootstrap admin account, created on first start.
    #[serde(default)]
    pub admin: Option<AdminConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    /// Signing secret for both token kinds.
    pub secret: String,

    /// Access token lifetime as a duration string, e.g. "15m".
    #[serde(default = "default_access_expires")]
    pub access_expires: String,

    /// Refresh token lifetime, e.g. "7d". Should exceed the access
    /// lifetime or refreshing is pointless.
    #[serde(default = "default_refresh_expires")]
    pub refresh_expires: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the SQLite database.
    pub data_dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdminConfig {
    pub email: String,
    pub password: String,
}

fn default_access_expires() -> String {
    "15m".to_string()
}

fn default_refresh_expires() -> String {
    "7d".to_string()
}

impl ServerConfig {
    /// Resolve a context name to `/etc/bttablas/<name>.toml`; anything
    /// containing `/` or `.` is treated as a direct path.
    pub fn resolve_path(name_or_path: &str) -> PathBuf {
        if name_or_path.contains('/') || name_or_path.contains('.') {
            PathBuf::from(name_or_path)
        } else {
            PathBuf::from(format!("/etc/bttablas/{name_or_path}.toml"))
        }
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("cannot read {}: {e}", path.display()))?;
        let config: Self = toml::from_str(&raw)
            .map_err(|e| anyhow::anyhow!("cannot parse {}: {e}", path.display()))?;
        Ok(config)
    }
}

/// Parse a duration string like "900", "15m", "12h" or "7d" into seconds.
pub fn parse_duration(s: &str) -> anyhow::Result<i64> {
    let s = s.trim();
    if s.is_empty() {
        anyhow::bail!("empty duration");
    }

    let (value, unit) = match s.chars().last() {
        Some(c) if c.is_ascii_digit() => (s, 1),
        Some('s') => (&s[..s.len() - 1], 1),
        Some('m') => (&s[..s.len() - 1], 60),
        Some('h') => (&s[..s.len() - 1], 3600),
        Some('d') => (&s[..s.len() - 1], 86_400),
        _ => anyhow::bail!("invalid duration {s:?} (expected s/m/h/d suffix)"),
    };

    let value: i64 = value
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid duration {s:?}"))?;
    if value <= 0 {
        anyhow::bail!("duration {s:?} must be positive");
    }
    Ok(value * unit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("900").unwrap(), 900);
        assert_eq!(parse_duration("30s").unwrap(), 30);
        assert_eq!(parse_duration("15m").unwrap(), 900);
        assert_eq!(parse_duration("12h").unwrap(), 43_200);
        assert_eq!(parse_duration("7d").unwrap(), 604_800);

        assert!(parse_duration("").is_err());
        assert!(parse_duration("-5m").is_err());
        assert!(parse_duration("soon").is_err());
    }

    #[test]
    fn test_resolve_path() {
        assert_eq!(
            ServerConfig::resolve_path("prod"),
            PathBuf::from("/etc/bttablas/prod.toml")
        );
        assert_eq!(
            ServerConfig::resolve_path("./local.toml"),
            PathBuf::from("./local.toml")
        );
    }

    #[test]
    fn test_load_minimal_config() {
        let config: ServerConfig = toml::from_str(
            r#"
            [jwt]
            secret = "s3cret"

            [storage]
            data_dir = "/var/lib/bttablas"
            "#,
        )
        .unwrap();
        assert_eq!(config.jwt.access_expires, "15m");
        assert_eq!(config.jwt.refresh_expires, "7d");
        assert!(config.admin.is_none());
    }
}
