//! Server settings from command-line arguments and `GENVIZ_*` variables.

use log::warn;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::graph::PaletteMode;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_STATIC_DIR: &str = "static";
pub const DEFAULT_BODY_LIMIT: usize = 32 * 1024 * 1024;
pub const DEFAULT_MAX_SESSIONS: usize = 256;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub static_dir: PathBuf,
    pub palette_mode: PaletteMode,
    pub cache_decoded: bool,
    /// Largest accepted request body in bytes
    pub body_limit: usize,
    /// Live sessions kept at once; the least recently used is evicted
    pub max_sessions: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            static_dir: PathBuf::from(DEFAULT_STATIC_DIR),
            palette_mode: PaletteMode::Continuous,
            cache_decoded: true,
            body_limit: DEFAULT_BODY_LIMIT,
            max_sessions: DEFAULT_MAX_SESSIONS,
        }
    }
}

impl ServerConfig {
    /// Reads the process arguments and environment.
    pub fn from_env() -> Self {
        let args: Vec<String> = env::args().skip(1).collect();
        Self::resolve(&args, |key| env::var(key).ok())
    }

    /// Resolves the configuration
    ///
    /// Positional arguments are `[host] [port]` and win over the
    /// environment. Values that do not parse fall back to the defaults.
    ///
    /// # Arguments
    /// * `args` - Command-line arguments without the program name
    /// * `lookup` - Source of `GENVIZ_*` variables
    ///
    /// # Examples
    /// ```
    /// use genviz::config::ServerConfig;
    ///
    /// let config = ServerConfig::resolve(&["0.0.0.0".to_string()], |key| match key {
    ///     "GENVIZ_PORT" => Some("8080".to_string()),
    ///     _ => None,
    /// });
    /// assert_eq!(config.address(), "0.0.0.0:8080");
    /// ```
    pub fn resolve<F>(args: &[String], lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = ServerConfig::default();

        let host = args
            .first()
            .cloned()
            .or_else(|| lookup("GENVIZ_HOST"))
            .filter(|host| !host.trim().is_empty())
            .unwrap_or(defaults.host);

        let port = match args.get(1) {
            Some(port) => parse_or("port argument", port, defaults.port),
            None => setting(&lookup, "GENVIZ_PORT", defaults.port),
        };

        let static_dir = lookup("GENVIZ_STATIC_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.static_dir);

        let palette_mode = if flag(&lookup, "GENVIZ_PALETTE_COMPAT", false) {
            PaletteMode::Compat
        } else {
            PaletteMode::Continuous
        };

        ServerConfig {
            host,
            port,
            static_dir,
            palette_mode,
            cache_decoded: flag(&lookup, "GENVIZ_DECODE_CACHE", defaults.cache_decoded),
            body_limit: setting(&lookup, "GENVIZ_BODY_LIMIT", defaults.body_limit),
            max_sessions: setting(&lookup, "GENVIZ_MAX_SESSIONS", defaults.max_sessions).max(1),
        }
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn setting<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Copy,
{
    match lookup(key) {
        Some(raw) => parse_or(key, &raw, default),
        None => default,
    }
}

fn parse_or<T: FromStr + Copy>(what: &str, raw: &str, default: T) -> T {
    raw.trim().parse().unwrap_or_else(|_| {
        warn!("Ignoring invalid {} value {:?}", what, raw);
        default
    })
}

fn flag<F>(lookup: &F, key: &str, default: bool) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key).as_deref().map(str::trim) {
        None | Some("") => default,
        Some("1") | Some("true") | Some("yes") | Some("on") => true,
        Some("0") | Some("false") | Some("no") | Some("off") => false,
        Some(other) => {
            warn!("Ignoring invalid {} value {:?}", key, other);
            default
        }
    }
}
