use std::fmt;
use serde::{Deserialize, Serialize};

/// Anything the catalog can hold: entities are stored under a single
/// identity key and a later insert with the same key replaces the earlier one.
pub trait Keyed {
    fn key(&self) -> String;
}

/// A networked service as reported by the registry watcher,
/// e.g. `catalog.default.svc.cluster.local` listening on 80 and 8080.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    /// Hostname of the service, e.g. "catalog.mystore.com"
    pub hostname: String,

    /// Load balancer / virtual IP address, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    /// Ports the service listens on, in declaration order
    #[serde(default)]
    pub ports: Vec<Port>,

    /// Only set for external services; holds the external DNS name
    #[serde(default, rename = "external", skip_serializing_if = "String::is_empty")]
    pub external_name: String,

    #[serde(skip)]
    pub load_balancing_disabled: bool,
}

impl Service {
    pub fn new(hostname: impl Into<String>, ports: Vec<Port>) -> Self {
        Self {
            hostname: hostname.into(),
            address: None,
            ports,
            external_name: String::new(),
            load_balancing_disabled: false,
        }
    }

    /// Whether the service points outside the cluster.
    pub fn is_external(&self) -> bool {
        !self.external_name.is_empty()
    }

    /// Ports that speak HTTP and may therefore serve a description.
    pub fn http_ports(&self) -> impl Iterator<Item = &Port> {
        self.ports.iter().filter(|p| p.protocol.is_http())
    }

    /// Canonical service key: `hostname|a,b` with named ports sorted,
    /// unnamed ports omitted.
    pub fn service_key(&self) -> String {
        let mut names: Vec<&str> = self
            .ports
            .iter()
            .map(|p| p.name.as_str())
            .filter(|n| !n.is_empty())
            .collect();

        if names.is_empty() {
            return self.hostname.clone();
        }

        names.sort_unstable();
        format!("{}|{}", self.hostname, names.join(","))
    }
}

impl Keyed for Service {
    fn key(&self) -> String {
        self.hostname.clone()
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.service_key())
    }
}

/// A port a service listens on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Port {
    /// Mandatory when the service exposes more than one port
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    pub port: u16,

    #[serde(default)]
    pub protocol: Protocol,
}

impl Port {
    pub fn new(name: impl Into<String>, port: u16, protocol: Protocol) -> Self {
        Self {
            name: name.into(),
            port,
            protocol,
        }
    }
}

/// Network protocol carried by a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Protocol {
    Grpc,
    Https,
    Http2,
    Http,
    #[default]
    Tcp,
    Udp,
    Mongo,
    Redis,
    Unsupported,
}

impl Protocol {
    /// Parse a protocol name ignoring case; unknown names map to `Unsupported`.
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "tcp" => Protocol::Tcp,
            "udp" => Protocol::Udp,
            "grpc" => Protocol::Grpc,
            "http" => Protocol::Http,
            "http2" => Protocol::Http2,
            "https" => Protocol::Https,
            "mongo" => Protocol::Mongo,
            "redis" => Protocol::Redis,
            _ => Protocol::Unsupported,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Grpc => "GRPC",
            Protocol::Https => "HTTPS",
            Protocol::Http2 => "HTTP2",
            Protocol::Http => "HTTP",
            Protocol::Tcp => "TCP",
            Protocol::Udp => "UDP",
            Protocol::Mongo => "Mongo",
            Protocol::Redis => "Redis",
            Protocol::Unsupported => "UnsupportedProtocol",
        }
    }

    /// True for protocols that ride on plain HTTP transport.
    /// HTTPS is deliberately excluded: descriptions are fetched over `http://`.
    pub fn is_http(&self) -> bool {
        matches!(self, Protocol::Http | Protocol::Http2 | Protocol::Grpc)
    }
}

impl From<String> for Protocol {
    fn from(value: String) -> Self {
        Protocol::from_name(&value)
    }
}

impl From<Protocol> for String {
    fn from(value: Protocol) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A workload deployment. Only its identity matters to discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployment {
    pub name: String,
    #[serde(default)]
    pub namespace: String,
}

impl Keyed for Deployment {
    fn key(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}/{}", self.namespace, self.name)
        }
    }
}
