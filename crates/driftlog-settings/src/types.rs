//! Shared value types for node settings

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// 16-byte globally unique node instance identifier.
///
/// Minted once per process start and published to peers through gossip.
/// The all-zero value is reserved as "unset" and rejected at settings
/// construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstanceId(pub [u8; 16]);

impl InstanceId {
    /// The reserved "unset" identifier.
    pub const fn nil() -> Self {
        Self([0; 16])
    }

    /// Mint a fresh random identifier.
    pub fn generate() -> Self {
        use rand::RngCore;
        let mut bytes = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Whether this is the reserved unset identifier.
    pub fn is_nil(&self) -> bool {
        self.0 == [0; 16]
    }

    /// Get as bytes
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// Error parsing an [`InstanceId`] from text.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid instance id `{0}`: expected 32 hex digits")]
pub struct ParseInstanceIdError(String);

impl FromStr for InstanceId {
    type Err = ParseInstanceIdError;

    /// Accepts 32 hex digits, with or without GUID-style `-` separators.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let compact: String = s.chars().filter(|c| *c != '-').collect();
        let raw = hex::decode(&compact).map_err(|_| ParseInstanceIdError(s.to_string()))?;
        let bytes: [u8; 16] = raw
            .try_into()
            .map_err(|_| ParseInstanceIdError(s.to_string()))?;
        Ok(Self(bytes))
    }
}

/// The address/port tuple this node publishes to peers for discovery.
///
/// The host may be a DNS name rather than an IP literal: the advertised
/// address can differ from the bind address when the node sits behind NAT.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvertisedGossipInfo {
    /// Hostname or IP literal peers should dial
    pub host: String,
    /// Advertised gossip port
    pub port: u16,
}

impl AdvertisedGossipInfo {
    /// Create new advertise info
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for AdvertisedGossipInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Backend(s) operational statistics are written to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatsStorage {
    /// Append stats to the store's own stats stream
    #[default]
    Stream,
    /// Write stats to rotating CSV files
    Csv,
    /// Both stream and CSV
    StreamAndCsv,
}

impl fmt::Display for StatsStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StatsStorage::Stream => "Stream",
            StatsStorage::Csv => "Csv",
            StatsStorage::StreamAndCsv => "StreamAndCsv",
        };
        f.write_str(name)
    }
}

/// Error parsing a [`StatsStorage`] selector from text.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid stats storage `{0}`: expected one of stream, csv, stream-and-csv")]
pub struct ParseStatsStorageError(String);

impl FromStr for StatsStorage {
    type Err = ParseStatsStorageError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "stream" => Ok(StatsStorage::Stream),
            "csv" => Ok(StatsStorage::Csv),
            "stream-and-csv" | "both" => Ok(StatsStorage::StreamAndCsv),
            _ => Err(ParseStatsStorageError(s.to_string())),
        }
    }
}
