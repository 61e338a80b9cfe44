//! Endpoint URLs: where a bridge listens and which peer it dials.
//!
//! Two forms are understood:
//!
//! - `tcp://host:port`; an empty host means every interface when binding
//!   and the loopback interface when dialing;
//! - `unix:///path/to.sock` (unix targets only).

use std::fmt;
use std::str::FromStr;

#[cfg(unix)]
use std::path::PathBuf;

use crate::error::EndpointError;

/// A parsed endpoint URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Endpoint {
    Tcp { host: String, port: u16 },
    #[cfg(unix)]
    Unix(PathBuf),
}

impl Endpoint {
    /// Socket address to bind a listener to.
    #[must_use]
    pub fn bind_address(&self) -> String {
        match self {
            Self::Tcp { host, port } if host.is_empty() => format!("0.0.0.0:{port}"),
            Self::Tcp { host, port } => format!("{host}:{port}"),
            #[cfg(unix)]
            Self::Unix(path) => path.display().to_string(),
        }
    }

    /// Socket address to connect to.
    #[must_use]
    pub fn dial_address(&self) -> String {
        match self {
            Self::Tcp { host, port } if host.is_empty() => format!("127.0.0.1:{port}"),
            Self::Tcp { host, port } => format!("{host}:{port}"),
            #[cfg(unix)]
            Self::Unix(path) => path.display().to_string(),
        }
    }
}

impl FromStr for Endpoint {
    type Err = EndpointError;

    fn from_str(url: &str) -> Result<Self, Self::Err> {
        let Some((scheme, rest)) = url.split_once("://") else {
            return Err(EndpointError::MissingScheme {
                url: url.to_string(),
            });
        };
        if rest.is_empty() {
            return Err(EndpointError::EmptyAddress {
                url: url.to_string(),
            });
        }
        match scheme {
            "tcp" => {
                let (host, port) = rest
                    .rsplit_once(':')
                    .and_then(|(host, port)| Some((host, port.parse::<u16>().ok()?)))
                    .ok_or_else(|| EndpointError::InvalidPort {
                        url: url.to_string(),
                    })?;
                Ok(Self::Tcp {
                    host: host.to_string(),
                    port,
                })
            }
            #[cfg(unix)]
            "unix" => Ok(Self::Unix(PathBuf::from(rest))),
            other => Err(EndpointError::UnsupportedScheme {
                url: url.to_string(),
                scheme: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp { host, port } => write!(f, "tcp://{host}:{port}"),
            #[cfg(unix)]
            Self::Unix(path) => write!(f, "unix://{}", path.display()),
        }
    }
}
