//! Loader for workspace configuration with YAML + environment overlays.
//!
//! Every section carries serde defaults, so a deployment can run with no
//! file at all and override individual knobs through `TALLY`-prefixed
//! environment variables (e.g. `TALLY_SERVER__PORT=8080`). String values
//! may reference `${VAR}` placeholders which are expanded recursively after
//! all sources are merged.
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;

#[derive(Debug, Default, Deserialize)]
pub struct TallyConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub aggregator: AggregatorConfig,
    #[serde(default)]
    pub profile: ProfileConfig,
    #[serde(default)]
    pub live: LiveConfig,
}

/// Where the HTTP/WebSocket surface listens.
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Fallback port. A hosting-assigned `PORT` environment variable, when
    /// present, takes precedence over this value (resolved in the binary).
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Follower-count cache behaviour.
#[derive(Debug, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,
}

/// Primary follower-count source: the widget aggregator API.
#[derive(Debug, Deserialize)]
pub struct AggregatorConfig {
    #[serde(default = "default_aggregator_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_source_timeout_secs")]
    pub timeout_secs: u64,
}

/// Fallback follower-count source: the public profile page.
#[derive(Debug, Deserialize)]
pub struct ProfileConfig {
    #[serde(default = "default_profile_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_source_timeout_secs")]
    pub timeout_secs: u64,
    /// Sent with the scrape request; only needs to look like a browser.
    #[serde(default = "default_accept_language")]
    pub accept_language: String,
}

/// Live-broadcast gateway the relay connects through.
#[derive(Debug, Deserialize)]
pub struct LiveConfig {
    /// Websocket URL of the webcast gateway. When unset, subscribe requests
    /// are treated as connect failures (logged, never retried).
    #[serde(default)]
    pub gateway: Option<String>,
    #[serde(default = "default_live_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Bound on the per-session event channel between driver and relay.
    #[serde(default = "default_live_event_buffer")]
    pub event_buffer: usize,
}

fn default_bind() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    3000
}
fn default_cache_ttl_secs() -> u64 {
    10
}
fn default_aggregator_endpoint() -> String {
    "https://api.tokcount.com".into()
}
fn default_profile_endpoint() -> String {
    "https://www.tiktok.com".into()
}
fn default_source_timeout_secs() -> u64 {
    6
}
fn default_accept_language() -> String {
    "en-US,en;q=0.9".into()
}
fn default_live_connect_timeout_secs() -> u64 {
    5
}
fn default_live_event_buffer() -> usize {
    64
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_cache_ttl_secs(),
        }
    }
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            endpoint: default_aggregator_endpoint(),
            timeout_secs: default_source_timeout_secs(),
        }
    }
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            endpoint: default_profile_endpoint(),
            timeout_secs: default_source_timeout_secs(),
            accept_language: default_accept_language(),
        }
    }
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            gateway: None,
            connect_timeout_secs: default_live_connect_timeout_secs(),
            event_buffer: default_live_event_buffer(),
        }
    }
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Builder hiding the `config` crate wiring (YAML + env overrides).
pub struct TallyConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
}

impl Default for TallyConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl TallyConfigLoader {
    /// Start with sensible defaults: `TALLY` env overrides only.
    ///
    /// ```
    /// use tally_config::TallyConfigLoader;
    ///
    /// let config = TallyConfigLoader::new().load().expect("defaults load");
    /// assert_eq!(config.server.port, 3000);
    /// assert_eq!(config.cache.ttl_secs, 10);
    /// assert!(config.live.gateway.is_none());
    /// ```
    pub fn new() -> Self {
        let builder =
            Config::builder().add_source(Environment::with_prefix("TALLY").separator("__"));
        Self { builder }
    }

    /// Attach a YAML/TOML/JSON file; the `config` crate infers format by
    /// suffix. Missing files are an error — use [`with_optional_file`] for
    /// the default lookup path.
    ///
    /// [`with_optional_file`]: TallyConfigLoader::with_optional_file
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self.builder.add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Attach a file that may legitimately be absent, so headless
    /// deployments can rely purely on environment variables.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Allow tests/CLI to merge inline YAML snippets.
    ///
    /// ```
    /// use tally_config::TallyConfigLoader;
    ///
    /// let cfg = TallyConfigLoader::new()
    ///     .with_yaml_str(
    ///         r#"
    /// server:
    ///   port: 8123
    /// live:
    ///   gateway: "wss://gateway.example/live"
    /// "#,
    ///     )
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(cfg.server.port, 8123);
    /// assert_eq!(cfg.live.gateway.as_deref(), Some("wss://gateway.example/live"));
    /// assert_eq!(cfg.aggregator.endpoint, "https://api.tokcount.com");
    /// ```
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, config::FileFormat::Yaml));
        self
    }

    /// Consume the builder and deserialize the merged sources.
    ///
    /// The loader combines file/YAML snippets with `TALLY`-prefixed
    /// environment variables and expands `${VAR}` placeholders before
    /// materialising the strongly typed config.
    pub fn load(self) -> Result<TallyConfig, ConfigError> {
        let cfg = self.builder.build()?;

        // Convert to serde_json::Value first so placeholder expansion can
        // walk the merged tree before it is typed.
        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        let typed: TallyConfig =
            serde_json::from_value(v).map_err(|e| ConfigError::Message(e.to_string()))?;

        Ok(typed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use temp_env;

    #[test]
    fn expands_simple_string() {
        temp_env::with_var("FOO", Some("bar"), || {
            let mut v = json!("prefix-${FOO}-suffix");
            expand_env_in_value(&mut v);
            assert_eq!(v, json!("prefix-bar-suffix"));
        });
    }

    #[test]
    fn expands_in_array_and_object() {
        temp_env::with_vars([("CITY", Some("Winston")), ("STATE", Some("NC"))], || {
            let mut v = json!([
                "hello-$CITY",
                { "loc": "${CITY}-${STATE}" },
                42,
                true,
                null
            ]);
            expand_env_in_value(&mut v);
            assert_eq!(
                v,
                json!(["hello-Winston", { "loc": "Winston-NC" }, 42, true, null])
            );
        });
    }

    #[test]
    fn expands_recursively_across_env_values() {
        temp_env::with_vars(
            [
                // BAR references BAZ; FOO references BAR — two hops.
                ("BAZ", Some("qux")),
                ("BAR", Some("mid-${BAZ}")),
                ("FOO", Some("start-${BAR}-end")),
            ],
            || {
                let mut v = json!("X=${FOO}");
                // Without recursive expansion this would stop at "X=start-${BAR}-end".
                expand_env_in_value(&mut v);
                assert_eq!(v, json!("X=start-mid-qux-end"));
            },
        );
    }

    #[test]
    fn stops_on_cycles_and_leaves_value_reasonable() {
        temp_env::with_vars([("A", Some("${B}")), ("B", Some("${A}"))], || {
            let mut v = json!("x=${A}-y");
            // Termination is what matters here; the depth cap guarantees it.
            expand_env_in_value(&mut v);
            let s = v.as_str().unwrap();
            assert!(s.starts_with("x=") && s.ends_with("-y"));
            // The cycle leaves an unresolved ${...} behind.
            assert!(s.contains("${"));
        });
    }

    #[test]
    fn unknown_vars_are_left_as_is() {
        let mut v = json!("hi-${DOES_NOT_EXIST}");
        expand_env_in_value(&mut v);
        assert_eq!(v, json!("hi-${DOES_NOT_EXIST}"));
    }

    #[test]
    fn sections_default_when_absent() {
        let cfg = TallyConfigLoader::new()
            .with_yaml_str("cache:\n  ttl_secs: 3\n")
            .load()
            .unwrap();
        assert_eq!(cfg.cache.ttl_secs, 3);
        assert_eq!(cfg.server.bind, "0.0.0.0");
        assert_eq!(cfg.profile.endpoint, "https://www.tiktok.com");
        assert_eq!(cfg.live.connect_timeout_secs, 5);
    }
}
