use dbdesk::AdminConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Settings from `dbdesk.toml`, with `${VAR}` references expanded.
///
/// ```toml
/// [database]
/// url = "${DATABASE_URL}"
/// pool_size = 8
///
/// [admin]
/// preview_sample_size = 10
/// free_text_policy = "confirm"
/// query_timeout = 30000
///
/// [logging]
/// level = "info"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub admin: AdminConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub pool_size: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl ConfigFile {
    /// Read `path`. A missing file is only an error when it was asked for
    /// explicitly; otherwise defaults apply.
    pub fn load(path: &Path, explicit: bool) -> anyhow::Result<Self> {
        if !path.exists() && !explicit {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;
        Self::parse(&raw)
            .map_err(|e| anyhow::anyhow!("failed to parse config file {}: {e}", path.display()))
    }

    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        let mut file: ConfigFile = toml::from_str(raw)?;
        file.expand_env()?;
        file.validate()?;
        Ok(file)
    }

    /// Connection URL: `--database`, then `database.url`, then `DATABASE_URL`.
    pub fn database_url(&self, cli_override: Option<&str>) -> anyhow::Result<String> {
        if let Some(url) = cli_override {
            return Ok(url.to_string());
        }
        if let Some(url) = &self.database.url {
            return Ok(url.clone());
        }
        std::env::var("DATABASE_URL").map_err(|_| {
            anyhow::anyhow!("no database configured: pass --database, set database.url or DATABASE_URL")
        })
    }

    fn expand_env(&mut self) -> anyhow::Result<()> {
        if let Some(url) = self.database.url.as_mut() {
            *url = expand_env_vars(url)?;
        }
        self.admin.confirmation_phrase = expand_env_vars(&self.admin.confirmation_phrase)?;
        Ok(())
    }

    fn validate(&self) -> anyhow::Result<()> {
        if let Some(url) = &self.database.url {
            if url.trim().is_empty() {
                anyhow::bail!("database.url must not be empty");
            }
        }
        if self.database.pool_size == Some(0) {
            anyhow::bail!("database.pool_size must be at least 1");
        }
        if self.admin.confirmation_phrase.trim().is_empty() {
            anyhow::bail!("admin.confirmation_phrase must not be empty");
        }
        Ok(())
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("dbdesk.toml")
}

fn expand_env_vars(input: &str) -> anyhow::Result<String> {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '$' && chars.peek() == Some(&'{') {
            chars.next();

            let mut key = String::new();
            let mut closed = false;
            for ch in chars.by_ref() {
                if ch == '}' {
                    closed = true;
                    break;
                }
                key.push(ch);
            }

            if !closed {
                anyhow::bail!("unterminated env var reference: ${{{key}}}");
            }
            if key.is_empty() {
                anyhow::bail!("invalid env var reference: ${{}}");
            }

            let v = std::env::var(&key)
                .map_err(|_| anyhow::anyhow!("missing env var for config expansion: {key}"))?;
            out.push_str(&v);
            continue;
        }

        out.push(c);
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbdesk::DangerousSqlPolicy;

    #[test]
    fn empty_file_uses_defaults() {
        let file = ConfigFile::parse("").unwrap();
        assert_eq!(file.admin, AdminConfig::default());
        assert_eq!(file.logging.level, "warn");
        assert!(file.database.url.is_none());
    }

    #[test]
    fn admin_section_overrides_defaults() {
        let file = ConfigFile::parse(
            r#"
[database]
url = "postgres://localhost/shop"

[admin]
free_text_policy = "error"
preview_sample_size = 5
query_timeout = 1500

[logging]
level = "debug"
"#,
        )
        .unwrap();

        assert_eq!(file.admin.free_text_policy, DangerousSqlPolicy::Error);
        assert_eq!(file.admin.preview_sample_size, 5);
        assert_eq!(
            file.admin.query_timeout,
            Some(std::time::Duration::from_millis(1500))
        );
        assert_eq!(file.admin.page_size, 50);
        assert_eq!(file.logging.level, "debug");
        assert_eq!(
            file.database_url(None).unwrap(),
            "postgres://localhost/shop"
        );
        assert_eq!(file.database_url(Some("postgres://other")).unwrap(), "postgres://other");
    }

    #[test]
    fn unset_env_reference_is_an_error() {
        let err = ConfigFile::parse("[database]\nurl = \"${DBDESK_TEST_SURELY_UNSET_VAR}\"\n")
            .unwrap_err();
        assert!(err.to_string().contains("DBDESK_TEST_SURELY_UNSET_VAR"));
    }

    #[test]
    fn expands_present_env_vars() {
        // PATH is set in any test environment.
        let path = std::env::var("PATH").unwrap();
        assert_eq!(expand_env_vars("a${PATH}b").unwrap(), format!("a{path}b"));
        assert!(expand_env_vars("${").is_err());
        assert!(expand_env_vars("${}").is_err());
    }

    #[test]
    fn zero_pool_size_is_rejected() {
        assert!(ConfigFile::parse("[database]\npool_size = 0\n").is_err());
    }
}
