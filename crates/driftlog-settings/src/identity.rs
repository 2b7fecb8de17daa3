//! Node identity derivation
//!
//! Turns the raw endpoint surface of one cluster member into a canonical
//! [`NodeIdentity`] record. Pure and deterministic; every precondition
//! violation aborts with [`SettingsError::InvalidConfiguration`] and no
//! partial identity is ever produced.

use crate::error::{Result, SettingsError};
use crate::types::InstanceId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;

/// Raw endpoint inputs for one node, prior to validation.
///
/// All fields are optional here; which combinations are acceptable is
/// decided by [`NodeIdentity::derive`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeEndpoints {
    /// Internal plaintext TCP endpoint (replication plane)
    pub internal_tcp: Option<SocketAddr>,
    /// Internal TLS TCP endpoint (replication plane)
    pub internal_secure_tcp: Option<SocketAddr>,
    /// External plaintext TCP endpoint (client plane)
    pub external_tcp: Option<SocketAddr>,
    /// External TLS TCP endpoint (client plane)
    pub external_secure_tcp: Option<SocketAddr>,
    /// Internal management (HTTP) endpoint
    pub internal_http: Option<SocketAddr>,
    /// External management (HTTP) endpoint
    pub external_http: Option<SocketAddr>,
}

/// Canonical identity of one cluster member.
///
/// Created once during settings assembly and immutable thereafter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeIdentity {
    /// Globally unique instance identifier
    pub instance_id: InstanceId,
    /// Process-local index used to tell co-hosted nodes apart in logs
    pub debug_index: i32,
    /// Internal plaintext TCP endpoint
    pub internal_tcp: Option<SocketAddr>,
    /// Internal TLS TCP endpoint
    pub internal_secure_tcp: Option<SocketAddr>,
    /// External plaintext TCP endpoint
    pub external_tcp: Option<SocketAddr>,
    /// External TLS TCP endpoint
    pub external_secure_tcp: Option<SocketAddr>,
    /// Internal management endpoint
    pub internal_http: SocketAddr,
    /// External management endpoint
    pub external_http: SocketAddr,
    /// Whether this node only follows and never takes part in elections
    pub read_only_replica: bool,
}

impl NodeIdentity {
    /// Derive a node identity from raw inputs.
    ///
    /// Preconditions:
    /// - `instance_id` must not be nil
    /// - at least one of the two internal TCP endpoints must be set
    /// - both management endpoints must be set
    pub fn derive(
        instance_id: InstanceId,
        debug_index: i32,
        endpoints: &NodeEndpoints,
        read_only_replica: bool,
    ) -> Result<Self> {
        if instance_id.is_nil() {
            return Err(SettingsError::invalid(
                "instanceId",
                "must not be the nil identifier",
            ));
        }
        if endpoints.internal_tcp.is_none() && endpoints.internal_secure_tcp.is_none() {
            return Err(SettingsError::invalid(
                "internalTcpEndpoint",
                "at least one internal TCP endpoint (plain or secure) must be configured",
            ));
        }
        let internal_http = endpoints
            .internal_http
            .ok_or_else(|| SettingsError::invalid("internalHttpEndpoint", "is required"))?;
        let external_http = endpoints
            .external_http
            .ok_or_else(|| SettingsError::invalid("externalHttpEndpoint", "is required"))?;

        Ok(Self {
            instance_id,
            debug_index,
            internal_tcp: endpoints.internal_tcp,
            internal_secure_tcp: endpoints.internal_secure_tcp,
            external_tcp: endpoints.external_tcp,
            external_secure_tcp: endpoints.external_secure_tcp,
            internal_http,
            external_http,
            read_only_replica,
        })
    }
}

impl fmt::Display for NodeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}, {}, {}]",
            self.instance_id,
            self.debug_index,
            render_endpoint(self.internal_tcp.or(self.internal_secure_tcp)),
            self.external_http,
        )
    }
}

/// Render an optional endpoint for diagnostics, `n/a` when absent.
pub(crate) fn render_endpoint(endpoint: Option<SocketAddr>) -> String {
    match endpoint {
        Some(addr) => addr.to_string(),
        None => "n/a".to_string(),
    }
}
