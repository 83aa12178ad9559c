use std::time::Duration;

use compilebot_core::language::LanguageAllowList;

/// Log output format for the binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    /// Read `LOG_FORMAT`. Anything other than `json` means text.
    pub fn from_env() -> Self {
        Self::parse(std::env::var("LOG_FORMAT").ok().as_deref())
    }

    fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Text,
        }
    }
}

/// Configuration errors. All of them are fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),

    #[error("{name} must be {expected}, got {value:?}")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Listener configuration loaded from environment variables.
#[derive(Clone)]
pub struct ListenerConfig {
    /// Discord bot token.
    pub discord_token: String,
    /// Redis address, `host:port` or a `redis://` URL.
    pub redis_host: String,
    /// List key jobs are pushed to.
    pub job_queue: String,
    /// List key results are read from.
    pub response_queue: String,
    pub languages: LanguageAllowList,
    pub poll_interval: Duration,
    /// Bound on each queue call.
    pub queue_timeout: Duration,
    /// Bound on each chat send.
    pub send_timeout: Duration,
    /// Bound on draining background tasks at shutdown.
    pub shutdown_timeout: Duration,
    /// Clear the result queue at startup. Results left over from a
    /// previous process cannot be routed.
    pub purge_response_queue: bool,
}

impl ListenerConfig {
    /// Load configuration from environment variables.
    ///
    /// | Env Var                 | Default     |
    /// |-------------------------|-------------|
    /// | `DISCORD_TOKEN`         | required    |
    /// | `REDIS_HOST`            | required    |
    /// | `JOB_QUEUE`             | required    |
    /// | `RESPONSE_QUEUE`        | required    |
    /// | `SUPPORTED_LANGUAGES`   | `go,python` |
    /// | `POLL_INTERVAL_MS`      | `1000`      |
    /// | `QUEUE_TIMEOUT_SECS`    | `5`         |
    /// | `SEND_TIMEOUT_SECS`     | `10`        |
    /// | `SHUTDOWN_TIMEOUT_SECS` | `5`         |
    /// | `PURGE_RESPONSE_QUEUE`  | `true`      |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::Missing(name))
        };

        let discord_token = required("DISCORD_TOKEN")?;
        let redis_host = required("REDIS_HOST")?;
        let job_queue = required("JOB_QUEUE")?;
        let response_queue = required("RESPONSE_QUEUE")?;

        let languages = match lookup("SUPPORTED_LANGUAGES") {
            Some(list) => {
                let languages = LanguageAllowList::from_csv(&list);
                if languages.is_empty() {
                    return Err(ConfigError::Invalid {
                        name: "SUPPORTED_LANGUAGES",
                        expected: "a non-empty comma-separated list",
                        value: list,
                    });
                }
                languages
            }
            None => LanguageAllowList::default(),
        };

        let poll_interval = Duration::from_millis(parse_positive(&lookup, "POLL_INTERVAL_MS", 1000)?);
        let queue_timeout = Duration::from_secs(parse_positive(&lookup, "QUEUE_TIMEOUT_SECS", 5)?);
        let send_timeout = Duration::from_secs(parse_positive(&lookup, "SEND_TIMEOUT_SECS", 10)?);
        let shutdown_timeout =
            Duration::from_secs(parse_positive(&lookup, "SHUTDOWN_TIMEOUT_SECS", 5)?);

        let purge_response_queue = match lookup("PURGE_RESPONSE_QUEUE") {
            Some(value) => parse_bool(&value).ok_or(ConfigError::Invalid {
                name: "PURGE_RESPONSE_QUEUE",
                expected: "true or false",
                value,
            })?,
            None => true,
        };

        Ok(Self {
            discord_token,
            redis_host,
            job_queue,
            response_queue,
            languages,
            poll_interval,
            queue_timeout,
            send_timeout,
            shutdown_timeout,
            purge_response_queue,
        })
    }
}

impl std::fmt::Debug for ListenerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerConfig")
            .field("discord_token", &"<redacted>")
            .field("redis_host", &self.redis_host)
            .field("job_queue", &self.job_queue)
            .field("response_queue", &self.response_queue)
            .field("languages", &self.languages.to_string())
            .field("poll_interval", &self.poll_interval)
            .field("queue_timeout", &self.queue_timeout)
            .field("send_timeout", &self.send_timeout)
            .field("shutdown_timeout", &self.shutdown_timeout)
            .field("purge_response_queue", &self.purge_response_queue)
            .finish()
    }
}

fn parse_positive<F>(lookup: &F, name: &'static str, default: u64) -> Result<u64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse::<u64>()
            .ok()
            .filter(|v| *v > 0)
            .ok_or(ConfigError::Invalid {
                name,
                expected: "a positive integer",
                value,
            }),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    const REQUIRED: &[(&str, &str)] = &[
        ("DISCORD_TOKEN", "secret"),
        ("REDIS_HOST", "localhost:6379"),
        ("JOB_QUEUE", "jobs"),
        ("RESPONSE_QUEUE", "responses"),
    ];

    #[test]
    fn defaults_apply() {
        let config = ListenerConfig::from_lookup(lookup_from(REQUIRED)).unwrap();
        assert_eq!(config.job_queue, "jobs");
        assert_eq!(config.response_queue, "responses");
        assert_eq!(config.poll_interval, Duration::from_secs(1));
        assert_eq!(config.queue_timeout, Duration::from_secs(5));
        assert_eq!(config.send_timeout, Duration::from_secs(10));
        assert_eq!(config.shutdown_timeout, Duration::from_secs(5));
        assert!(config.purge_response_queue);
        assert!(config.languages.contains("go"));
        assert!(config.languages.contains("python"));
    }

    #[test]
    fn missing_required_variable() {
        let err = ListenerConfig::from_lookup(lookup_from(&REQUIRED[1..])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("DISCORD_TOKEN")));
    }

    #[test]
    fn blank_required_variable_counts_as_missing() {
        let mut pairs = REQUIRED.to_vec();
        pairs[2] = ("JOB_QUEUE", "  ");
        let err = ListenerConfig::from_lookup(lookup_from(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("JOB_QUEUE")));
    }

    #[test]
    fn overrides_are_parsed() {
        let mut pairs = REQUIRED.to_vec();
        pairs.extend([
            ("SUPPORTED_LANGUAGES", "rust, go"),
            ("POLL_INTERVAL_MS", "250"),
            ("QUEUE_TIMEOUT_SECS", "2"),
            ("PURGE_RESPONSE_QUEUE", "false"),
        ]);
        let config = ListenerConfig::from_lookup(lookup_from(&pairs)).unwrap();
        assert!(config.languages.contains("rust"));
        assert!(!config.languages.contains("python"));
        assert_eq!(config.poll_interval, Duration::from_millis(250));
        assert_eq!(config.queue_timeout, Duration::from_secs(2));
        assert!(!config.purge_response_queue);
    }

    #[test]
    fn invalid_numbers_are_rejected() {
        for bad in ["0", "-1", "soon"] {
            let mut pairs = REQUIRED.to_vec();
            pairs.push(("POLL_INTERVAL_MS", bad));
            let err = ListenerConfig::from_lookup(lookup_from(&pairs)).unwrap_err();
            assert!(
                matches!(err, ConfigError::Invalid { name: "POLL_INTERVAL_MS", .. }),
                "value {bad:?} gave {err:?}"
            );
        }
    }

    #[test]
    fn empty_language_list_is_rejected() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("SUPPORTED_LANGUAGES", " , "));
        let err = ListenerConfig::from_lookup(lookup_from(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "SUPPORTED_LANGUAGES", .. }));
    }

    #[test]
    fn debug_redacts_token() {
        let config = ListenerConfig::from_lookup(lookup_from(REQUIRED)).unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn log_format_parsing() {
        assert_eq!(LogFormat::parse(None), LogFormat::Text);
        assert_eq!(LogFormat::parse(Some("JSON")), LogFormat::Json);
        assert_eq!(LogFormat::parse(Some("pretty")), LogFormat::Text);
    }
}
