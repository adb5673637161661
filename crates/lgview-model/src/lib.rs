//! Shared data structures for the looking-glass client.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A test location: one looking-glass backend reachable at `url`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Location {
    pub id: String,
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticMethod {
    #[default]
    Ping,
    Ping6,
    Traceroute,
    Traceroute6,
    Mtr,
    Mtr6,
}

impl DiagnosticMethod {
    pub const ALL: [DiagnosticMethod; 6] = [
        DiagnosticMethod::Ping,
        DiagnosticMethod::Ping6,
        DiagnosticMethod::Traceroute,
        DiagnosticMethod::Traceroute6,
        DiagnosticMethod::Mtr,
        DiagnosticMethod::Mtr6,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DiagnosticMethod::Ping => "ping",
            DiagnosticMethod::Ping6 => "ping6",
            DiagnosticMethod::Traceroute => "traceroute",
            DiagnosticMethod::Traceroute6 => "traceroute6",
            DiagnosticMethod::Mtr => "mtr",
            DiagnosticMethod::Mtr6 => "mtr6",
        }
    }

    /// Server-side path for this method, relative to a location's base URL.
    pub fn path(self) -> &'static str {
        match self {
            DiagnosticMethod::Ping => "/lookingglass/ping",
            DiagnosticMethod::Ping6 => "/lookingglass/ping6",
            DiagnosticMethod::Traceroute => "/lookingglass/traceroute",
            DiagnosticMethod::Traceroute6 => "/lookingglass/traceroute6",
            DiagnosticMethod::Mtr => "/lookingglass/mtr",
            DiagnosticMethod::Mtr6 => "/lookingglass/mtr6",
        }
    }

    /// The method after this one in selector order, wrapping around.
    pub fn next(self) -> DiagnosticMethod {
        let index = Self::ALL
            .iter()
            .position(|method| *method == self)
            .unwrap_or(0);
        Self::ALL[(index + 1) % Self::ALL.len()]
    }
}

impl fmt::Display for DiagnosticMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown method {0:?} (expected one of ping, ping6, traceroute, traceroute6, mtr, mtr6)")]
pub struct UnknownMethod(pub String);

impl FromStr for DiagnosticMethod {
    type Err = UnknownMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|method| method.as_str() == wanted)
            .ok_or_else(|| UnknownMethod(s.to_string()))
    }
}

/// Request body for every diagnostic endpoint. The target is sent verbatim.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommandRequest {
    pub target: String,
}

impl CommandRequest {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NetworkInfo {
    pub location: String,
    pub map_url: String,
    pub facility: String,
    pub facility_url: String,
    pub looking_glass_ipv4: String,
    pub looking_glass_ipv6: String,
    pub your_ip: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum SpeedTestSize {
    #[default]
    #[serde(rename = "100M")]
    Mb100,
    #[serde(rename = "1G")]
    Gb1,
    #[serde(rename = "10G")]
    Gb10,
}

impl SpeedTestSize {
    pub fn path(self) -> &'static str {
        match self {
            SpeedTestSize::Mb100 => "/speedtest/100M",
            SpeedTestSize::Gb1 => "/speedtest/1G",
            SpeedTestSize::Gb10 => "/speedtest/10G",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown speed test size {0:?} (expected 100m, 1g or 10g)")]
pub struct UnknownSpeedTestSize(pub String);

impl FromStr for SpeedTestSize {
    type Err = UnknownSpeedTestSize;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "100m" => Ok(SpeedTestSize::Mb100),
            "1g" => Ok(SpeedTestSize::Gb1),
            "10g" => Ok(SpeedTestSize::Gb10),
            _ => Err(UnknownSpeedTestSize(s.to_string())),
        }
    }
}
