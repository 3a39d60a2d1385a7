//! Connection target parsing.
//!
//! Two forms are accepted:
//!
//! - `<tcp|unix>:postgresql://<host>[:<port>|:<socket dir>:][/<dbname>][?<options>]`
//! - `<dbname>[@<host>][:<port>]`
//!
//! `options` is a list of `keyword=value` pairs separated by `&`.
use std::{borrow::Cow, env::var, fmt};

use crate::common::ByteStr;

/// Environment variable replacing the target in Informix modes.
pub const DBPATH_ENV: &str = "PG_DBPATH";

/// Parsed connection target.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Config {
    pub(crate) dbname: Option<ByteStr>,
    pub(crate) host: Option<ByteStr>,
    pub(crate) port: Option<ByteStr>,
    pub(crate) options: Vec<(ByteStr, ByteStr)>,
}

impl Config {
    /// Read the target override from `PG_DBPATH`.
    pub fn from_env() -> Option<String> {
        var(DBPATH_ENV).ok()
    }

    /// Parse a connection target.
    pub fn parse(target: &str) -> Result<Config, ParseError> {
        Self::parse_inner(ByteStr::copy_from_str(target))
    }

    /// Parse a static connection target.
    pub fn parse_static(target: &'static str) -> Result<Config, ParseError> {
        Self::parse_inner(ByteStr::from_static(target))
    }

    fn parse_inner(url: ByteStr) -> Result<Self, ParseError> {
        let mut read = url.as_str();

        // split at the last `$delim`, keeping what precedes it
        macro_rules! eat {
            (rev $delim:literal) => {{
                match read.rfind($delim) {
                    Some(idx) => {
                        let capture = &read[idx + 1..];
                        read = &read[..idx];
                        Some(url.slice_ref(capture))
                    }
                    None => None,
                }
            }};
            ($delim:literal) => {{
                match read.find($delim) {
                    Some(idx) => {
                        let capture = &read[..idx];
                        read = &read[idx + 1..];
                        Some(url.slice_ref(capture))
                    }
                    None => None,
                }
            }};
        }

        let unix = match read.split_once(':') {
            Some(("tcp", _)) => false,
            Some(("unix", _)) => true,
            _ => {
                // legacy `dbname[@host][:port]`
                let port = eat!(rev ':');
                let host = eat!(rev '@');
                let dbname = (!read.is_empty()).then(|| url.slice_ref(read));
                return Ok(Self { dbname, host, port, options: vec![] });
            }
        };

        let scheme_len = if unix { "unix:".len() } else { "tcp:".len() };
        read = &read[scheme_len..];
        let Some(rest) = read.strip_prefix("postgresql://") else {
            return Err(ParseError { reason: "expected postgresql:// after the protocol".into() });
        };
        read = rest;

        let options = match eat!(rev '?') {
            Some(options) => split_options(&options),
            None => vec![],
        };
        let dbname = eat!(rev '/').filter(|db| !db.is_empty());

        let mut host = eat!(':');
        let (port, socket) = match host.is_some() {
            true => match eat!(':') {
                Some(socket) => (None, Some(socket)),
                None => (Some(url.slice_ref(read)), None),
            },
            false => (None, None),
        };
        let server = host.take().unwrap_or_else(|| url.slice_ref(read));

        if unix {
            if server != "localhost" && server != "127.0.0.1" {
                return Err(ParseError { reason: "non-localhost access via sockets".into() });
            }
            return Ok(Self { dbname, host: socket, port, options });
        }

        if let Some(socket) = socket {
            return Err(ParseError { reason: format!("socketname {socket} given for TCP connection").into() });
        }

        let host = (!server.is_empty()).then_some(server);
        Ok(Self { dbname, host, port, options })
    }

    pub fn dbname(&self) -> Option<&str> {
        self.dbname.as_deref()
    }

    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    pub fn port(&self) -> Option<&str> {
        self.port.as_deref()
    }

    pub fn options(&self) -> &[(ByteStr, ByteStr)] {
        &self.options
    }

    /// Keyword and value pairs handed to the connector.
    pub fn params<'a>(&'a self, user: Option<&'a str>, password: Option<&'a str>) -> Vec<(&'a str, &'a str)> {
        let mut params = Vec::with_capacity(5 + self.options.len());
        if let Some(dbname) = &self.dbname {
            params.push(("dbname", dbname.as_str()));
        }
        if let Some(host) = &self.host {
            params.push(("host", host.as_str()));
        }
        if let Some(port) = &self.port {
            params.push(("port", port.as_str()));
        }
        if let Some(user) = user.filter(|u| !u.is_empty()) {
            params.push(("user", user));
        }
        if let Some(password) = password.filter(|p| !p.is_empty()) {
            params.push(("password", password));
        }
        for (key, value) in &self.options {
            params.push((key.as_str(), value.as_str()));
        }
        params
    }
}

/// Split `key=value&key=value`, spaces before keywords and values are
/// skipped and a trailing chunk without `=` is ignored.
fn split_options(options: &ByteStr) -> Vec<(ByteStr, ByteStr)> {
    options
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .map(|(key, value)| {
            let value = value.trim_start_matches(' ');
            (options.slice_ref(key.trim_start_matches(' ')), options.slice_ref(value))
        })
        .collect()
}

impl std::str::FromStr for Config {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Error when parsing a connection target.
pub struct ParseError {
    pub(crate) reason: Cow<'static,str>,
}

impl std::error::Error for ParseError { }

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            return f.write_str(&self.reason)
        }
        write!(f, "failed to parse connection target: {}", self.reason)
    }
}

impl fmt::Debug for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}
