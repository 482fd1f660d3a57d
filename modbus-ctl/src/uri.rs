use std::fmt::Formatter;
use std::net::{SocketAddr, ToSocketAddrs};
use std::str::FromStr;

/// Location of the device to talk to
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Uri {
    /// `tcp://HOST:PORT`
    Tcp { host: String, port: u16 },
    /// `serial://DEVICE:BAUD`
    Serial { device: String, baud_rate: u32 },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum UriError {
    UnknownScheme(String),
    MissingSeparator(String),
    EmptyHost,
    BadPort(String),
    BadBaudRate(String),
    Unresolved(String),
}

impl Uri {
    /// resolve the host of a TCP uri to its first socket address
    pub(crate) fn socket_addr(host: &str, port: u16) -> Result<SocketAddr, UriError> {
        (host, port)
            .to_socket_addrs()
            .ok()
            .and_then(|mut addrs| addrs.next())
            .ok_or_else(|| UriError::Unresolved(format!("{host}:{port}")))
    }
}

impl FromStr for Uri {
    type Err = UriError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (scheme, rest) = s
            .split_once("://")
            .ok_or_else(|| UriError::UnknownScheme(s.to_string()))?;

        // split on the last colon so device paths and IPv6 hosts may contain colons
        let (location, suffix) = rest
            .rsplit_once(':')
            .ok_or_else(|| UriError::MissingSeparator(rest.to_string()))?;
        if location.is_empty() {
            return Err(UriError::EmptyHost);
        }

        match scheme {
            "tcp" => {
                let port = suffix
                    .parse()
                    .map_err(|_| UriError::BadPort(suffix.to_string()))?;
                let host = location
                    .strip_prefix('[')
                    .and_then(|x| x.strip_suffix(']'))
                    .unwrap_or(location);
                Ok(Uri::Tcp {
                    host: host.to_string(),
                    port,
                })
            }
            "serial" => {
                let baud_rate = suffix
                    .parse()
                    .map_err(|_| UriError::BadBaudRate(suffix.to_string()))?;
                Ok(Uri::Serial {
                    device: location.to_string(),
                    baud_rate,
                })
            }
            _ => Err(UriError::UnknownScheme(scheme.to_string())),
        }
    }
}

impl std::fmt::Display for Uri {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            Uri::Tcp { host, port } => write!(f, "tcp://{host}:{port}"),
            Uri::Serial { device, baud_rate } => write!(f, "serial://{device}:{baud_rate}"),
        }
    }
}

impl std::error::Error for UriError {}

impl std::fmt::Display for UriError {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            UriError::UnknownScheme(x) => {
                write!(f, "unknown uri scheme in '{x}', expected tcp:// or serial://")
            }
            UriError::MissingSeparator(x) => write!(f, "expected LOCATION:PORT, got '{x}'"),
            UriError::EmptyHost => f.write_str("uri has an empty host or device"),
            UriError::BadPort(x) => write!(f, "bad tcp port: {x}"),
            UriError::BadBaudRate(x) => write!(f, "bad baud rate: {x}"),
            UriError::Unresolved(x) => write!(f, "unable to resolve {x}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tcp_uri() {
        assert_eq!(
            "tcp://localhost:502".parse::<Uri>(),
            Ok(Uri::Tcp {
                host: "localhost".to_string(),
                port: 502
            })
        );
        assert_eq!(
            "tcp://[::1]:1502".parse::<Uri>(),
            Ok(Uri::Tcp {
                host: "::1".to_string(),
                port: 1502
            })
        );
    }

    #[test]
    fn parses_serial_uri_with_absolute_device_path() {
        assert_eq!(
            "serial:///dev/ttyUSB0:19200".parse::<Uri>(),
            Ok(Uri::Serial {
                device: "/dev/ttyUSB0".to_string(),
                baud_rate: 19200
            })
        );
    }

    #[test]
    fn rejects_malformed_uris() {
        assert_eq!(
            "udp://host:502".parse::<Uri>(),
            Err(UriError::UnknownScheme("udp".to_string()))
        );
        assert_eq!(
            "/dev/ttyS0".parse::<Uri>(),
            Err(UriError::UnknownScheme("/dev/ttyS0".to_string()))
        );
        assert_eq!(
            "serial:///dev/ttyS0".parse::<Uri>(),
            Err(UriError::MissingSeparator("/dev/ttyS0".to_string()))
        );
        assert_eq!(
            "tcp://host:http".parse::<Uri>(),
            Err(UriError::BadPort("http".to_string()))
        );
        assert_eq!(
            "serial://COM1:fast".parse::<Uri>(),
            Err(UriError::BadBaudRate("fast".to_string()))
        );
        assert_eq!("tcp://:502".parse::<Uri>(), Err(UriError::EmptyHost));
    }

    #[test]
    fn resolves_loopback_address() {
        assert_eq!(
            Uri::socket_addr("127.0.0.1", 502),
            Ok(SocketAddr::from(([127, 0, 0, 1], 502)))
        );
    }

    #[test]
    fn displays_in_parseable_form() {
        let uri: Uri = "serial://COM3:9600".parse().unwrap();
        assert_eq!(uri.to_string(), "serial://COM3:9600");
    }
}
