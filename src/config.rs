use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// 认证服务的 JWT 共享密钥
    pub secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// 活动状态自动流转的检查间隔 (秒)
    pub interval_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { interval_secs: 60 }
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> Option<T> {
    lookup(name).and_then(|v| v.parse::<T>().ok())
}

impl Config {
    pub fn from_toml() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        use std::io::ErrorKind;

        let file = match std::fs::read_to_string(&config_path) {
            Ok(config_str) => Some(config_str),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => {
                return Err(format!("Failed to read config file {config_path}: {e}").into());
            }
        };
        Self::load(file.as_deref(), |name| env::var(name).ok())
    }

    /// file 为配置文件内容，不存在时完全依赖环境变量 (lookup)
    fn load(
        file: Option<&str>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let mut config = match file {
            Some(config_str) => Self::parse(config_str)?,
            None => Self::from_env(&lookup)?,
        };

        // 环境变量覆盖（即便文件存在时也覆盖）
        config.apply_env_overrides(&lookup);

        if config.jwt.secret.trim().is_empty() {
            return Err("JWT secret must not be empty".into());
        }
        Ok(config)
    }

    fn from_env(
        lookup: &impl Fn(&str) -> Option<String>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let database_url =
            lookup("DATABASE_URL").ok_or("DATABASE_URL is not set and config.toml was not found")?;
        let jwt_secret =
            lookup("JWT_SECRET").ok_or("JWT_SECRET is not set and config.toml was not found")?;

        Ok(Config {
            server: ServerConfig {
                host: lookup("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: parse_var(lookup, "SERVER_PORT").unwrap_or(8080),
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections: parse_var(lookup, "DB_MAX_CONNECTIONS").unwrap_or(10),
            },
            jwt: JwtConfig { secret: jwt_secret },
            scheduler: SchedulerConfig {
                interval_secs: parse_var(lookup, "SCHEDULER_INTERVAL_SECS").unwrap_or(60),
            },
        })
    }

    pub fn parse(config_str: &str) -> Result<Self, Box<dyn std::error::Error>> {
        toml::from_str(config_str).map_err(|e| format!("Failed to parse config file: {e}").into())
    }

    fn apply_env_overrides(&mut self, lookup: &impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("SERVER_HOST") {
            self.server.host = v;
        }
        if let Some(p) = parse_var(lookup, "SERVER_PORT") {
            self.server.port = p;
        }
        if let Some(v) = lookup("DATABASE_URL") {
            self.database.url = v;
        }
        if let Some(mc) = parse_var(lookup, "DB_MAX_CONNECTIONS") {
            self.database.max_connections = mc;
        }
        if let Some(v) = lookup("JWT_SECRET") {
            self.jwt.secret = v;
        }
        if let Some(n) = parse_var(lookup, "SCHEDULER_INTERVAL_SECS") {
            self.scheduler.interval_secs = n;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_parse_config_file() {
        let config = Config::parse(
            r#"
[server]
host = "127.0.0.1"
port = 9000

[database]
url = "postgres://localhost/loyalty"
max_connections = 5

[jwt]
secret = "s3cret"
"#,
        )
        .unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.jwt.secret, "s3cret");
        // 未配置时使用默认间隔
        assert_eq!(config.scheduler.interval_secs, 60);
    }

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn test_env_only_requires_jwt_secret() {
        let err = Config::load(None, vars(&[("DATABASE_URL", "postgres://db/loyalty")])).unwrap_err();
        assert!(err.to_string().contains("JWT_SECRET"));

        let config = Config::load(
            None,
            vars(&[
                ("DATABASE_URL", "postgres://db/loyalty"),
                ("JWT_SECRET", "from-env"),
                ("SERVER_PORT", "not-a-port"),
            ]),
        )
        .unwrap();
        assert_eq!(config.jwt.secret, "from-env");
        // 无法解析的值使用默认
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_env_overrides_file_and_rejects_blank_secret() {
        let file = "[server]\nhost = \"127.0.0.1\"\nport = 9000\n\n[database]\nurl = \"postgres://file\"\nmax_connections = 5\n\n[jwt]\nsecret = \"file-secret\"\n";

        let config = Config::load(Some(file), vars(&[("SERVER_PORT", "9100")])).unwrap();
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.jwt.secret, "file-secret");

        assert!(Config::load(Some(file), vars(&[("JWT_SECRET", "  ")])).is_err());
    }

    #[test]
    fn test_parse_rejects_missing_section() {
        assert!(Config::parse("[server]\nhost = \"x\"\nport = 1\n").is_err());
    }
}
