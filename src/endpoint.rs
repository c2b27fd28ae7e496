use std::fmt;
use std::str::FromStr;

/// Well-known consensus ports.
pub const CONSENSUS_PLAINTEXT_PORT: u16 = 50211;
pub const CONSENSUS_TLS_PORT: u16 = 50212;

/// Well-known mirror ports.
pub const MIRROR_PLAINTEXT_PORT: u16 = 5600;
pub const MIRROR_TLS_PORT: u16 = 443;

/// A host and port pair, with transport security derived from the port alone.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HostAndPort {
    pub host: String,
    pub port: u16,
}

impl HostAndPort {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self { host: host.into(), port }
    }

    /// TLS is used for the consensus and mirror TLS ports; everything else is plaintext.
    pub fn transport_security(&self) -> TransportSecurity {
        match self.port {
            CONSENSUS_TLS_PORT | MIRROR_TLS_PORT => TransportSecurity::Tls,
            _ => TransportSecurity::Plaintext,
        }
    }

    pub fn uri(&self) -> String {
        match self.transport_security() {
            TransportSecurity::Tls => format!("https://{}", self),
            TransportSecurity::Plaintext => format!("tcp://{}", self),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportSecurity {
    Plaintext,
    Tls,
}

impl fmt::Display for HostAndPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl FromStr for HostAndPort {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.rsplit_once(':') {
            Some((host, port)) => {
                let port = port
                    .parse::<u16>()
                    .map_err(|_| crate::Error::BadConfig(format!("invalid port in endpoint `{s}`")))?;
                Ok(Self::new(host, port))
            }
            None => Ok(Self::new(s, MIRROR_TLS_PORT)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_consensus_tls_port() {
        assert_eq!(HostAndPort::new("1.2.3.4", CONSENSUS_TLS_PORT).transport_security(), TransportSecurity::Tls);
        assert_eq!(HostAndPort::new("1.2.3.4", CONSENSUS_PLAINTEXT_PORT).transport_security(), TransportSecurity::Plaintext);
    }

    #[test]
    fn detects_mirror_tls_port() {
        assert_eq!(HostAndPort::new("mirror.example.com", MIRROR_TLS_PORT).transport_security(), TransportSecurity::Tls);
        assert_eq!(HostAndPort::new("mirror.example.com", MIRROR_PLAINTEXT_PORT).transport_security(), TransportSecurity::Plaintext);
    }

    #[test]
    fn parses_missing_port_as_mirror_tls_default() {
        let parsed: HostAndPort = "example.com".parse().unwrap();
        assert_eq!(parsed.port, MIRROR_TLS_PORT);
    }

    #[test]
    fn renders_host_colon_port() {
        assert_eq!(HostAndPort::new("example.com", 50211).to_string(), "example.com:50211");
    }
}
