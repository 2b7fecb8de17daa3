//! Node settings validation and assembly
//!
//! [`ClusterNodeOptions`] is the mutable staging surface the bootstrap fills
//! in from its CLI/env/file parser. A single terminal [`build`] call runs
//! every cross-field check in a pinned order and either yields the immutable
//! [`ClusterNodeSettings`] value all other subsystems trust without
//! re-checking, or fails with the first violation found.
//!
//! [`build`]: ClusterNodeOptions::build

use crate::error::{Result, SettingsError};
use crate::identity::{render_endpoint, NodeEndpoints, NodeIdentity};
use crate::policy::{
    AuthenticationFactoryRef, AuthorizationFactoryRef, ConsumerStrategyFactoryRef,
};
use crate::types::{AdvertisedGossipInfo, InstanceId, StatsStorage};
use rustls::pki_types::CertificateDer;
use std::collections::BTreeMap;
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Hard upper bound on a single append payload.
pub const MAX_APPEND_SIZE_CEILING: u32 = 16 * 1024 * 1024;

/// Default single-append payload limit.
pub const DEFAULT_MAX_APPEND_SIZE: u32 = 1024 * 1024;

// =============================================================================
// STAGING OPTIONS
// =============================================================================

/// Raw configuration surface for one node, prior to validation.
///
/// One public field per documented parameter; `Default` encodes every
/// documented default. Nothing is checked until [`build`] runs, so a
/// partially filled value can be passed around and amended freely.
///
/// [`build`]: ClusterNodeOptions::build
#[derive(Clone)]
pub struct ClusterNodeOptions {
    // Identity
    pub instance_id: InstanceId,
    pub debug_index: i32,
    pub endpoints: NodeEndpoints,
    pub read_only_replica: bool,
    pub gossip_advertise: Option<AdvertisedGossipInfo>,

    // Security
    pub enable_trusted_auth: bool,
    pub certificate: Option<CertificateDer<'static>>,
    pub trusted_root_certs: Option<Vec<CertificateDer<'static>>>,
    pub disable_internal_tls: bool,
    pub disable_external_tls: bool,
    pub enable_external_tcp: bool,

    // Topology & discovery
    pub discover_via_dns: bool,
    pub cluster_dns: Option<String>,
    pub gossip_seeds: Option<Vec<SocketAddr>>,
    pub cluster_node_count: u32,
    pub gossip_on_single_node: bool,

    // Replication quorum
    pub prepare_ack_count: u32,
    pub commit_ack_count: u32,
    pub prepare_timeout: Duration,
    pub commit_timeout: Duration,
    pub write_timeout: Duration,
    pub min_flush_delay: Duration,
    pub node_priority: i32,
    pub max_truncation: i64,
    pub unsafe_allow_surplus_nodes: bool,
    pub max_append_size: u32,

    // Gossip timing
    pub gossip_interval: Duration,
    pub gossip_allowed_time_difference: Duration,
    pub gossip_timeout: Duration,
    pub dead_member_removal_period: Duration,
    pub int_tcp_heartbeat_timeout: Duration,
    pub int_tcp_heartbeat_interval: Duration,
    pub ext_tcp_heartbeat_timeout: Duration,
    pub ext_tcp_heartbeat_interval: Duration,
    pub gossip_over_secure_transport: bool,

    // HTTP/API surface
    pub admin_on_public: bool,
    pub stats_on_public: bool,
    pub gossip_on_public: bool,
    pub enable_atom_pub_over_http: bool,
    pub disable_http_caching: bool,
    pub log_http_requests: bool,
    pub log_failed_authentication_attempts: bool,
    pub disable_first_level_http_authorization: bool,

    // Storage & index tuning
    pub max_memtable_entry_count: usize,
    pub hash_collision_read_limit: u32,
    pub index_cache_depth: u32,
    pub index_bitness_version: u8,
    pub optimize_index_merge: bool,
    pub index_path: Option<PathBuf>,
    pub max_auto_merge_index_level: u32,
    pub reader_threads_count: usize,
    pub initialization_threads: usize,
    pub reduce_file_cache_pressure: bool,
    pub always_keep_scavenged: bool,
    pub skip_index_verify: bool,
    pub skip_index_scan_on_reads: bool,
    pub ptable_max_reader_count: usize,
    pub scavenge_history_max_age: u32,
    pub disable_scavenge_merging: bool,
    pub verify_db_hash: bool,
    pub unsafe_ignore_hard_deletes: bool,

    // Connection limits
    pub connection_pending_send_bytes_threshold: usize,
    pub connection_queue_size_threshold: usize,
    pub worker_threads: usize,

    // Operational statistics
    pub stats_period: Duration,
    pub stats_storage: StatsStorage,
    pub enable_histograms: bool,
    pub fault_out_of_order_projections: bool,
    pub start_standard_projections: bool,

    // Pluggable policy (the two required factories are `build` arguments)
    pub additional_consumer_strategies: BTreeMap<String, ConsumerStrategyFactoryRef>,
}

impl Default for ClusterNodeOptions {
    fn default() -> Self {
        Self {
            instance_id: InstanceId::nil(),
            debug_index: 0,
            endpoints: NodeEndpoints::default(),
            read_only_replica: false,
            gossip_advertise: None,

            enable_trusted_auth: false,
            certificate: None,
            trusted_root_certs: None,
            disable_internal_tls: false,
            disable_external_tls: false,
            enable_external_tcp: false,

            discover_via_dns: false,
            cluster_dns: Some(String::new()),
            gossip_seeds: Some(Vec::new()),
            cluster_node_count: 1,
            gossip_on_single_node: false,

            prepare_ack_count: 1,
            commit_ack_count: 1,
            prepare_timeout: Duration::from_secs(2),
            commit_timeout: Duration::from_secs(2),
            write_timeout: Duration::from_secs(2),
            min_flush_delay: Duration::from_millis(2),
            node_priority: 0,
            max_truncation: -1,
            unsafe_allow_surplus_nodes: false,
            max_append_size: DEFAULT_MAX_APPEND_SIZE,

            gossip_interval: Duration::from_secs(2),
            gossip_allowed_time_difference: Duration::from_secs(60),
            gossip_timeout: Duration::from_millis(2500),
            dead_member_removal_period: Duration::from_secs(1800),
            int_tcp_heartbeat_timeout: Duration::from_millis(700),
            int_tcp_heartbeat_interval: Duration::from_millis(700),
            ext_tcp_heartbeat_timeout: Duration::from_millis(1000),
            ext_tcp_heartbeat_interval: Duration::from_millis(2000),
            gossip_over_secure_transport: true,

            admin_on_public: false,
            stats_on_public: false,
            gossip_on_public: false,
            enable_atom_pub_over_http: true,
            disable_http_caching: false,
            log_http_requests: false,
            log_failed_authentication_attempts: false,
            disable_first_level_http_authorization: false,

            max_memtable_entry_count: 1_000_000,
            hash_collision_read_limit: 100,
            index_cache_depth: 16,
            index_bitness_version: 4,
            optimize_index_merge: false,
            index_path: None,
            max_auto_merge_index_level: 1000,
            reader_threads_count: 4,
            initialization_threads: 1,
            reduce_file_cache_pressure: false,
            always_keep_scavenged: false,
            skip_index_verify: false,
            skip_index_scan_on_reads: false,
            ptable_max_reader_count: 16,
            scavenge_history_max_age: 30,
            disable_scavenge_merging: false,
            verify_db_hash: true,
            unsafe_ignore_hard_deletes: false,

            connection_pending_send_bytes_threshold: 10 * 1024 * 1024,
            connection_queue_size_threshold: 50_000,
            worker_threads: 5,

            stats_period: Duration::from_secs(30),
            stats_storage: StatsStorage::default(),
            enable_histograms: false,
            fault_out_of_order_projections: false,
            start_standard_projections: false,

            additional_consumer_strategies: BTreeMap::new(),
        }
    }
}

impl fmt::Debug for ClusterNodeOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClusterNodeOptions")
            .field("instance_id", &self.instance_id)
            .field("endpoints", &self.endpoints)
            .field("gossip_advertise", &self.gossip_advertise)
            .field("discover_via_dns", &self.discover_via_dns)
            .field("cluster_dns", &self.cluster_dns)
            .field("cluster_node_count", &self.cluster_node_count)
            .field("prepare_ack_count", &self.prepare_ack_count)
            .field("commit_ack_count", &self.commit_ack_count)
            .field("max_append_size", &self.max_append_size)
            .field(
                "additional_consumer_strategies",
                &self
                    .additional_consumer_strategies
                    .keys()
                    .collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

impl ClusterNodeOptions {
    /// Validate every field and assemble the immutable settings value.
    ///
    /// Checks run in a pinned order; the first violation wins. The two
    /// provider factories are taken here rather than staged as fields so a
    /// build call without them does not compile.
    pub fn build(
        self,
        authentication: AuthenticationFactoryRef,
        authorization: AuthorizationFactoryRef,
    ) -> Result<ClusterNodeSettings> {
        if self.instance_id.is_nil() {
            return Err(SettingsError::invalid(
                "instanceId",
                "must not be the nil identifier",
            ));
        }
        if self.endpoints.internal_tcp.is_none() && self.endpoints.internal_secure_tcp.is_none() {
            return Err(SettingsError::invalid(
                "internalTcpEndpoint",
                "at least one internal TCP endpoint (plain or secure) must be configured",
            ));
        }
        if self.endpoints.internal_http.is_none() {
            return Err(SettingsError::invalid("internalHttpEndpoint", "is required"));
        }
        if self.endpoints.external_http.is_none() {
            return Err(SettingsError::invalid("externalHttpEndpoint", "is required"));
        }
        if (self.endpoints.internal_secure_tcp.is_some()
            || self.endpoints.external_secure_tcp.is_some())
            && self.certificate.is_none()
        {
            return Err(SettingsError::invalid(
                "certificate",
                "a server certificate is required when a secure TCP endpoint is configured",
            ));
        }
        if self.worker_threads == 0 {
            return Err(SettingsError::invalid("workerThreads", "must be positive"));
        }
        // Presence is required even with DNS discovery disabled; only the
        // blank-content check further down is conditional.
        let cluster_dns = self
            .cluster_dns
            .ok_or_else(|| SettingsError::invalid("clusterDns", "is required"))?;
        let gossip_seeds = self
            .gossip_seeds
            .ok_or_else(|| SettingsError::invalid("gossipSeeds", "is required (may be empty)"))?;
        if self.cluster_node_count == 0 {
            return Err(SettingsError::invalid("clusterNodeCount", "must be positive"));
        }
        if self.prepare_ack_count == 0 {
            return Err(SettingsError::invalid("prepareAckCount", "must be positive"));
        }
        if self.commit_ack_count == 0 {
            return Err(SettingsError::invalid("commitAckCount", "must be positive"));
        }
        if self.initialization_threads == 0 {
            return Err(SettingsError::invalid(
                "initializationThreads",
                "must be positive",
            ));
        }
        let gossip_advertise = self
            .gossip_advertise
            .ok_or_else(|| SettingsError::invalid("gossipAdvertiseInfo", "is required"))?;
        if self.max_append_size > MAX_APPEND_SIZE_CEILING {
            return Err(SettingsError::conflict(format!(
                "maxAppendSize {} exceeds the 16 MiB ceiling ({} bytes)",
                self.max_append_size, MAX_APPEND_SIZE_CEILING
            )));
        }
        if self.discover_via_dns && cluster_dns.trim().is_empty() {
            return Err(SettingsError::conflict(
                "DNS discovery is enabled but clusterDns is blank; either disable DNS \
                 discovery (and supply gossip seeds) or provide a cluster DNS name",
            ));
        }

        let node = NodeIdentity::derive(
            self.instance_id,
            self.debug_index,
            &self.endpoints,
            self.read_only_replica,
        )?;

        Ok(ClusterNodeSettings {
            node,
            gossip_advertise,
            security: SecuritySettings {
                enable_trusted_auth: self.enable_trusted_auth,
                certificate: self.certificate,
                trusted_root_certs: self.trusted_root_certs,
                disable_internal_tls: self.disable_internal_tls,
                disable_external_tls: self.disable_external_tls,
                enable_external_tcp: self.enable_external_tcp,
            },
            topology: TopologySettings {
                discover_via_dns: self.discover_via_dns,
                cluster_dns,
                gossip_seeds,
                cluster_node_count: self.cluster_node_count,
                gossip_on_single_node: self.gossip_on_single_node,
            },
            replication: ReplicationSettings {
                prepare_ack_count: self.prepare_ack_count,
                commit_ack_count: self.commit_ack_count,
                prepare_timeout: self.prepare_timeout,
                commit_timeout: self.commit_timeout,
                write_timeout: self.write_timeout,
                min_flush_delay: self.min_flush_delay,
                node_priority: self.node_priority,
                max_truncation: self.max_truncation,
                unsafe_allow_surplus_nodes: self.unsafe_allow_surplus_nodes,
                max_append_size: self.max_append_size,
            },
            gossip: GossipSettings {
                interval: self.gossip_interval,
                allowed_time_difference: self.gossip_allowed_time_difference,
                timeout: self.gossip_timeout,
                dead_member_removal_period: self.dead_member_removal_period,
                int_tcp_heartbeat_timeout: self.int_tcp_heartbeat_timeout,
                int_tcp_heartbeat_interval: self.int_tcp_heartbeat_interval,
                ext_tcp_heartbeat_timeout: self.ext_tcp_heartbeat_timeout,
                ext_tcp_heartbeat_interval: self.ext_tcp_heartbeat_interval,
                over_secure_transport: self.gossip_over_secure_transport,
            },
            http: HttpSettings {
                admin_on_public: self.admin_on_public,
                stats_on_public: self.stats_on_public,
                gossip_on_public: self.gossip_on_public,
                enable_atom_pub_over_http: self.enable_atom_pub_over_http,
                disable_http_caching: self.disable_http_caching,
                log_http_requests: self.log_http_requests,
                log_failed_authentication_attempts: self.log_failed_authentication_attempts,
                disable_first_level_http_authorization: self.disable_first_level_http_authorization,
            },
            storage: StorageSettings {
                max_memtable_entry_count: self.max_memtable_entry_count,
                hash_collision_read_limit: self.hash_collision_read_limit,
                index_cache_depth: self.index_cache_depth,
                index_bitness_version: self.index_bitness_version,
                optimize_index_merge: self.optimize_index_merge,
                index_path: self.index_path,
                max_auto_merge_index_level: self.max_auto_merge_index_level,
                reader_threads_count: self.reader_threads_count,
                initialization_threads: self.initialization_threads,
                reduce_file_cache_pressure: self.reduce_file_cache_pressure,
                always_keep_scavenged: self.always_keep_scavenged,
                skip_index_verify: self.skip_index_verify,
                skip_index_scan_on_reads: self.skip_index_scan_on_reads,
                ptable_max_reader_count: self.ptable_max_reader_count,
                scavenge_history_max_age: self.scavenge_history_max_age,
                disable_scavenge_merging: self.disable_scavenge_merging,
                verify_db_hash: self.verify_db_hash,
                unsafe_ignore_hard_deletes: self.unsafe_ignore_hard_deletes,
            },
            limits: ConnectionLimits {
                connection_pending_send_bytes_threshold: self
                    .connection_pending_send_bytes_threshold,
                connection_queue_size_threshold: self.connection_queue_size_threshold,
                worker_threads: self.worker_threads,
            },
            policy: PolicySettings {
                authentication,
                authorization,
                additional_consumer_strategies: self.additional_consumer_strategies,
            },
            stats: StatsSettings {
                period: self.stats_period,
                storage: self.stats_storage,
                enable_histograms: self.enable_histograms,
                fault_out_of_order_projections: self.fault_out_of_order_projections,
                start_standard_projections: self.start_standard_projections,
            },
        })
    }
}

// =============================================================================
// ASSEMBLED SETTINGS
// =============================================================================

/// TLS material and transport security switches.
#[derive(Clone, Debug)]
pub struct SecuritySettings {
    pub enable_trusted_auth: bool,
    pub certificate: Option<CertificateDer<'static>>,
    pub trusted_root_certs: Option<Vec<CertificateDer<'static>>>,
    pub disable_internal_tls: bool,
    pub disable_external_tls: bool,
    pub enable_external_tcp: bool,
}

/// Cluster topology and peer discovery.
#[derive(Clone, Debug)]
pub struct TopologySettings {
    pub discover_via_dns: bool,
    pub cluster_dns: String,
    pub gossip_seeds: Vec<SocketAddr>,
    pub cluster_node_count: u32,
    pub gossip_on_single_node: bool,
}

/// Replication quorum sizes and write-path timeouts.
#[derive(Clone, Debug)]
pub struct ReplicationSettings {
    pub prepare_ack_count: u32,
    pub commit_ack_count: u32,
    pub prepare_timeout: Duration,
    pub commit_timeout: Duration,
    pub write_timeout: Duration,
    pub min_flush_delay: Duration,
    pub node_priority: i32,
    pub max_truncation: i64,
    pub unsafe_allow_surplus_nodes: bool,
    pub max_append_size: u32,
}

/// Gossip and failure-detection timing.
#[derive(Clone, Debug)]
pub struct GossipSettings {
    pub interval: Duration,
    pub allowed_time_difference: Duration,
    pub timeout: Duration,
    pub dead_member_removal_period: Duration,
    pub int_tcp_heartbeat_timeout: Duration,
    pub int_tcp_heartbeat_interval: Duration,
    pub ext_tcp_heartbeat_timeout: Duration,
    pub ext_tcp_heartbeat_interval: Duration,
    pub over_secure_transport: bool,
}

/// What the public HTTP endpoint exposes and logs.
#[derive(Clone, Debug)]
pub struct HttpSettings {
    pub admin_on_public: bool,
    pub stats_on_public: bool,
    pub gossip_on_public: bool,
    pub enable_atom_pub_over_http: bool,
    pub disable_http_caching: bool,
    pub log_http_requests: bool,
    pub log_failed_authentication_attempts: bool,
    pub disable_first_level_http_authorization: bool,
}

/// Storage engine and index tuning knobs.
#[derive(Clone, Debug)]
pub struct StorageSettings {
    pub max_memtable_entry_count: usize,
    pub hash_collision_read_limit: u32,
    pub index_cache_depth: u32,
    pub index_bitness_version: u8,
    pub optimize_index_merge: bool,
    pub index_path: Option<PathBuf>,
    pub max_auto_merge_index_level: u32,
    pub reader_threads_count: usize,
    pub initialization_threads: usize,
    pub reduce_file_cache_pressure: bool,
    pub always_keep_scavenged: bool,
    pub skip_index_verify: bool,
    pub skip_index_scan_on_reads: bool,
    pub ptable_max_reader_count: usize,
    pub scavenge_history_max_age: u32,
    pub disable_scavenge_merging: bool,
    pub verify_db_hash: bool,
    pub unsafe_ignore_hard_deletes: bool,
}

/// Per-connection backpressure thresholds and worker pool size.
#[derive(Clone, Debug)]
pub struct ConnectionLimits {
    pub connection_pending_send_bytes_threshold: usize,
    pub connection_queue_size_threshold: usize,
    pub worker_threads: usize,
}

/// Caller-supplied capability objects.
#[derive(Clone)]
pub struct PolicySettings {
    pub authentication: AuthenticationFactoryRef,
    pub authorization: AuthorizationFactoryRef,
    pub additional_consumer_strategies: BTreeMap<String, ConsumerStrategyFactoryRef>,
}

impl fmt::Debug for PolicySettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolicySettings")
            .field("authentication", &self.authentication.name())
            .field("authorization", &self.authorization.name())
            .field(
                "additional_consumer_strategies",
                &self
                    .additional_consumer_strategies
                    .keys()
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Operational statistics collection.
#[derive(Clone, Debug)]
pub struct StatsSettings {
    pub period: Duration,
    pub storage: StatsStorage,
    pub enable_histograms: bool,
    pub fault_out_of_order_projections: bool,
    pub start_standard_projections: bool,
}

/// The validated, immutable settings value for one cluster node.
///
/// Constructed exactly once per process by [`ClusterNodeOptions::build`] and
/// shared by reference with every subsystem for the life of the process.
/// There is no mutation; the handful of knobs that may legitimately change
/// after publication are exposed as copy-on-write operations returning a new
/// value.
#[derive(Clone, Debug)]
pub struct ClusterNodeSettings {
    pub node: NodeIdentity,
    pub gossip_advertise: AdvertisedGossipInfo,
    pub security: SecuritySettings,
    pub topology: TopologySettings,
    pub replication: ReplicationSettings,
    pub gossip: GossipSettings,
    pub http: HttpSettings,
    pub storage: StorageSettings,
    pub limits: ConnectionLimits,
    pub policy: PolicySettings,
    pub stats: StatsSettings,
}

impl ClusterNodeSettings {
    /// New value with the public-endpoint exposure flags replaced.
    #[must_use]
    pub fn with_public_surface(&self, admin: bool, stats: bool, gossip: bool) -> Self {
        let mut next = self.clone();
        next.http.admin_on_public = admin;
        next.http.stats_on_public = stats;
        next.http.gossip_on_public = gossip;
        next
    }

    /// New value with rotated certificate material.
    #[must_use]
    pub fn with_certificates(
        &self,
        certificate: CertificateDer<'static>,
        trusted_root_certs: Option<Vec<CertificateDer<'static>>>,
    ) -> Self {
        let mut next = self.clone();
        next.security.certificate = Some(certificate);
        next.security.trusted_root_certs = trusted_root_certs;
        next
    }

    /// New value with the index page-table reader cap replaced.
    #[must_use]
    pub fn with_ptable_max_reader_count(&self, count: usize) -> Self {
        let mut next = self.clone();
        next.storage.ptable_max_reader_count = count;
        next
    }
}

// =============================================================================
// DIAGNOSTIC RENDERING
// =============================================================================

fn render_certificate(cert: &Option<CertificateDer<'static>>) -> String {
    match cert {
        Some(der) => {
            let fingerprint = blake3::hash(der.as_ref());
            format!(
                "blake3:{} ({} bytes DER)",
                hex::encode(&fingerprint.as_bytes()[..8]),
                der.as_ref().len()
            )
        }
        None => "n/a".to_string(),
    }
}

fn render_trusted_roots(roots: &Option<Vec<CertificateDer<'static>>>) -> String {
    match roots {
        Some(certs) => format!("{} certificate(s)", certs.len()),
        None => "n/a".to_string(),
    }
}

impl fmt::Display for ClusterNodeSettings {
    /// Fixed-order, newline-separated `Key: value` rendering for operators.
    ///
    /// Human-only output; there is no parse contract and no round-trip
    /// guarantee. Never fails for a validly-constructed value.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "InstanceId: {}", self.node.instance_id)?;
        writeln!(f, "InternalTcp: {}", render_endpoint(self.node.internal_tcp))?;
        writeln!(
            f,
            "InternalSecureTcp: {}",
            render_endpoint(self.node.internal_secure_tcp)
        )?;
        writeln!(f, "ExternalTcp: {}", render_endpoint(self.node.external_tcp))?;
        writeln!(
            f,
            "ExternalSecureTcp: {}",
            render_endpoint(self.node.external_secure_tcp)
        )?;
        writeln!(f, "InternalHttp: {}", self.node.internal_http)?;
        writeln!(f, "ExternalHttp: {}", self.node.external_http)?;
        writeln!(f, "EnableTrustedAuth: {}", self.security.enable_trusted_auth)?;
        writeln!(f, "Certificate: {}", render_certificate(&self.security.certificate))?;
        writeln!(
            f,
            "TrustedRootCertificates: {}",
            render_trusted_roots(&self.security.trusted_root_certs)
        )?;
        writeln!(f, "LogHttpRequests: {}", self.http.log_http_requests)?;
        writeln!(f, "WorkerThreads: {}", self.limits.worker_threads)?;
        writeln!(f, "DiscoverViaDns: {}", self.topology.discover_via_dns)?;
        writeln!(f, "ClusterDns: {}", self.topology.cluster_dns)?;
        writeln!(
            f,
            "GossipSeeds: {}",
            self.topology
                .gossip_seeds
                .iter()
                .map(|s| s.to_string())
                .collect::<Vec<_>>()
                .join(",")
        )?;
        writeln!(f, "ClusterNodeCount: {}", self.topology.cluster_node_count)?;
        writeln!(f, "MinFlushDelay: {:?}", self.replication.min_flush_delay)?;
        writeln!(f, "PrepareAckCount: {}", self.replication.prepare_ack_count)?;
        writeln!(f, "CommitAckCount: {}", self.replication.commit_ack_count)?;
        writeln!(f, "PrepareTimeout: {:?}", self.replication.prepare_timeout)?;
        writeln!(f, "CommitTimeout: {:?}", self.replication.commit_timeout)?;
        writeln!(f, "WriteTimeout: {:?}", self.replication.write_timeout)?;
        writeln!(f, "DisableInternalTls: {}", self.security.disable_internal_tls)?;
        writeln!(f, "DisableExternalTls: {}", self.security.disable_external_tls)?;
        writeln!(f, "StatsPeriod: {:?}", self.stats.period)?;
        writeln!(f, "StatsStorage: {}", self.stats.storage)?;
        writeln!(
            f,
            "AuthenticationProviderFactory: {}",
            self.policy.authentication.name()
        )?;
        writeln!(
            f,
            "AuthorizationProviderFactory: {}",
            self.policy.authorization.name()
        )?;
        writeln!(f, "NodePriority: {}", self.replication.node_priority)?;
        writeln!(f, "GossipInterval: {:?}", self.gossip.interval)?;
        writeln!(
            f,
            "GossipAllowedTimeDifference: {:?}",
            self.gossip.allowed_time_difference
        )?;
        writeln!(f, "GossipTimeout: {:?}", self.gossip.timeout)?;
        writeln!(f, "HistogramEnabled: {}", self.stats.enable_histograms)?;
        writeln!(f, "HttpCachingDisabled: {}", self.http.disable_http_caching)?;
        writeln!(
            f,
            "IndexPath: {}",
            self.storage
                .index_path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "n/a".to_string())
        )?;
        writeln!(
            f,
            "ScavengeHistoryMaxAge: {}",
            self.storage.scavenge_history_max_age
        )?;
        writeln!(
            f,
            "ConnectionPendingSendBytesThreshold: {}",
            self.limits.connection_pending_send_bytes_threshold
        )?;
        writeln!(
            f,
            "ReduceFileCachePressure: {}",
            self.storage.reduce_file_cache_pressure
        )?;
        writeln!(
            f,
            "InitializationThreads: {}",
            self.storage.initialization_threads
        )?;
        writeln!(
            f,
            "DisableFirstLevelHttpAuthorization: {}",
            self.http.disable_first_level_http_authorization
        )?;
        writeln!(f, "ReadOnlyReplica: {}", self.node.read_only_replica)?;
        writeln!(
            f,
            "UnsafeAllowSurplusNodes: {}",
            self.replication.unsafe_allow_surplus_nodes
        )?;
        writeln!(
            f,
            "DeadMemberRemovalPeriod: {:?}",
            self.gossip.dead_member_removal_period
        )?;
        writeln!(f, "MaxTruncation: {}", self.replication.max_truncation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{
        AuthenticationProviderFactory, AuthorizationProviderFactory, ConsumerStrategyFactory,
    };
    use std::sync::Arc;

    struct TestAuthentication;

    impl AuthenticationProviderFactory for TestAuthentication {
        fn name(&self) -> &str {
            "test-authentication"
        }
    }

    struct TestAuthorization;

    impl AuthorizationProviderFactory for TestAuthorization {
        fn name(&self) -> &str {
            "test-authorization"
        }
    }

    struct RoundRobin;

    impl ConsumerStrategyFactory for RoundRobin {
        fn strategy_name(&self) -> &str {
            "round-robin"
        }
    }

    fn factories() -> (AuthenticationFactoryRef, AuthorizationFactoryRef) {
        (Arc::new(TestAuthentication), Arc::new(TestAuthorization))
    }

    fn addr(port: u16) -> SocketAddr {
        format!("127.0.0.1:{port}").parse().unwrap()
    }

    fn valid_options() -> ClusterNodeOptions {
        ClusterNodeOptions {
            instance_id: InstanceId([1; 16]),
            endpoints: NodeEndpoints {
                internal_tcp: Some(addr(1112)),
                internal_http: Some(addr(2112)),
                external_http: Some(addr(2113)),
                ..Default::default()
            },
            gossip_advertise: Some(AdvertisedGossipInfo::new("127.0.0.1", 2113)),
            ..Default::default()
        }
    }

    fn build(options: ClusterNodeOptions) -> Result<ClusterNodeSettings> {
        let (authn, authz) = factories();
        options.build(authn, authz)
    }

    fn dummy_cert() -> CertificateDer<'static> {
        CertificateDer::from(vec![0x30, 0x82, 0x01, 0x0a, 0xde, 0xad, 0xbe, 0xef])
    }

    #[test]
    fn test_valid_options_build() {
        let settings = build(valid_options()).unwrap();
        assert_eq!(settings.node.instance_id, InstanceId([1; 16]));
        assert_eq!(settings.node.internal_tcp, Some(addr(1112)));
        assert_eq!(settings.node.internal_http, addr(2112));
        assert_eq!(settings.gossip_advertise.port, 2113);
        assert!(settings.topology.gossip_seeds.is_empty());
    }

    #[test]
    fn test_defaults_flow_through() {
        let settings = build(valid_options()).unwrap();
        assert_eq!(settings.limits.worker_threads, 5);
        assert_eq!(settings.replication.max_append_size, DEFAULT_MAX_APPEND_SIZE);
        assert_eq!(settings.replication.max_truncation, -1);
        assert_eq!(settings.storage.index_cache_depth, 16);
        assert_eq!(settings.storage.index_bitness_version, 4);
        assert_eq!(settings.storage.reader_threads_count, 4);
        assert_eq!(settings.storage.max_auto_merge_index_level, 1000);
        assert_eq!(settings.storage.initialization_threads, 1);
        assert!(settings.policy.additional_consumer_strategies.is_empty());
        assert!(settings.http.enable_atom_pub_over_http);
        assert!(settings.gossip.over_secure_transport);
        assert_eq!(settings.stats.storage, StatsStorage::Stream);
    }

    #[test]
    fn test_supplied_values_flow_through() {
        let mut options = valid_options();
        options.cluster_node_count = 3;
        options.prepare_ack_count = 2;
        options.commit_ack_count = 2;
        options.prepare_timeout = Duration::from_secs(5);
        options.max_append_size = 2 * 1024 * 1024;
        options.index_path = Some(PathBuf::from("/var/lib/driftlog/index"));
        options
            .additional_consumer_strategies
            .insert("round-robin".to_string(), Arc::new(RoundRobin));

        let settings = build(options).unwrap();
        assert_eq!(settings.topology.cluster_node_count, 3);
        assert_eq!(settings.replication.prepare_ack_count, 2);
        assert_eq!(settings.replication.commit_ack_count, 2);
        assert_eq!(settings.replication.prepare_timeout, Duration::from_secs(5));
        assert_eq!(settings.replication.max_append_size, 2 * 1024 * 1024);
        assert_eq!(
            settings.storage.index_path.as_deref(),
            Some(std::path::Path::new("/var/lib/driftlog/index"))
        );
        assert_eq!(settings.policy.additional_consumer_strategies.len(), 1);
        assert_eq!(
            settings.policy.additional_consumer_strategies["round-robin"].strategy_name(),
            "round-robin"
        );
    }

    #[test]
    fn test_nil_instance_id_rejected() {
        let mut options = valid_options();
        options.instance_id = InstanceId::nil();
        let err = build(options).unwrap_err();
        assert_eq!(err.field(), Some("instanceId"));
    }

    #[test]
    fn test_both_internal_endpoints_missing_rejected() {
        let mut options = valid_options();
        options.endpoints.internal_tcp = None;
        options.endpoints.internal_secure_tcp = None;
        let err = build(options).unwrap_err();
        assert_eq!(err.field(), Some("internalTcpEndpoint"));
    }

    #[test]
    fn test_one_internal_endpoint_suffices() {
        let mut options = valid_options();
        options.endpoints.internal_tcp = None;
        options.endpoints.internal_secure_tcp = Some(addr(1113));
        options.certificate = Some(dummy_cert());
        let settings = build(options).unwrap();
        assert_eq!(settings.node.internal_secure_tcp, Some(addr(1113)));
    }

    #[test]
    fn test_missing_http_endpoints_rejected() {
        let mut options = valid_options();
        options.endpoints.internal_http = None;
        assert_eq!(build(options).unwrap_err().field(), Some("internalHttpEndpoint"));

        let mut options = valid_options();
        options.endpoints.external_http = None;
        assert_eq!(build(options).unwrap_err().field(), Some("externalHttpEndpoint"));
    }

    #[test]
    fn test_secure_endpoint_requires_certificate() {
        let mut options = valid_options();
        options.endpoints.internal_secure_tcp = Some(addr(1113));
        assert_eq!(build(options).unwrap_err().field(), Some("certificate"));

        let mut options = valid_options();
        options.endpoints.external_secure_tcp = Some(addr(1115));
        assert_eq!(build(options).unwrap_err().field(), Some("certificate"));

        let mut options = valid_options();
        options.endpoints.external_secure_tcp = Some(addr(1115));
        options.certificate = Some(dummy_cert());
        assert!(build(options).is_ok());
    }

    #[test]
    fn test_zero_counts_rejected() {
        let cases: [(&str, fn(&mut ClusterNodeOptions)); 5] = [
            ("workerThreads", |o| o.worker_threads = 0),
            ("clusterNodeCount", |o| o.cluster_node_count = 0),
            ("prepareAckCount", |o| o.prepare_ack_count = 0),
            ("commitAckCount", |o| o.commit_ack_count = 0),
            ("initializationThreads", |o| o.initialization_threads = 0),
        ];
        for (field, set) in cases {
            let mut options = valid_options();
            set(&mut options);
            let err = build(options).unwrap_err();
            assert_eq!(err.field(), Some(field), "expected {field} to be rejected");
            assert!(err.to_string().contains("must be positive"));
        }
    }

    #[test]
    fn test_prepare_ack_count_zero_references_field() {
        let mut options = valid_options();
        options.cluster_node_count = 3;
        options.prepare_ack_count = 0;
        let err = build(options).unwrap_err();
        assert!(matches!(err, SettingsError::InvalidConfiguration { .. }));
        assert!(err.to_string().contains("prepareAckCount"));
    }

    #[test]
    fn test_cluster_dns_presence_required_even_without_discovery() {
        let mut options = valid_options();
        options.discover_via_dns = false;
        options.cluster_dns = None;
        let err = build(options).unwrap_err();
        assert_eq!(err.field(), Some("clusterDns"));
    }

    #[test]
    fn test_blank_cluster_dns_accepted_without_discovery() {
        let mut options = valid_options();
        options.discover_via_dns = false;
        options.cluster_dns = Some(String::new());
        let settings = build(options).unwrap();
        assert_eq!(settings.topology.cluster_dns, "");
    }

    #[test]
    fn test_dns_discovery_with_blank_name_conflicts() {
        for blank in ["", "   "] {
            let mut options = valid_options();
            options.discover_via_dns = true;
            options.cluster_dns = Some(blank.to_string());
            let err = build(options).unwrap_err();
            assert!(matches!(err, SettingsError::ConfigurationConflict { .. }));
        }

        let mut options = valid_options();
        options.discover_via_dns = true;
        options.cluster_dns = Some("cluster.driftlog.local".to_string());
        assert!(build(options).is_ok());
    }

    #[test]
    fn test_missing_gossip_seeds_rejected() {
        let mut options = valid_options();
        options.gossip_seeds = None;
        assert_eq!(build(options).unwrap_err().field(), Some("gossipSeeds"));
    }

    #[test]
    fn test_missing_gossip_advertise_rejected() {
        let mut options = valid_options();
        options.gossip_advertise = None;
        assert_eq!(build(options).unwrap_err().field(), Some("gossipAdvertiseInfo"));
    }

    #[test]
    fn test_append_size_ceiling() {
        let mut options = valid_options();
        options.max_append_size = MAX_APPEND_SIZE_CEILING;
        assert!(build(options).is_ok());

        let mut options = valid_options();
        options.max_append_size = MAX_APPEND_SIZE_CEILING + 1;
        let err = build(options).unwrap_err();
        assert!(matches!(err, SettingsError::ConfigurationConflict { .. }));
    }

    #[test]
    fn test_append_size_conflict_names_ceiling() {
        let mut options = valid_options();
        options.max_append_size = 17_000_000;
        let err = build(options).unwrap_err();
        assert!(matches!(err, SettingsError::ConfigurationConflict { .. }));
        assert!(err.to_string().contains("16 MiB"));
    }

    #[test]
    fn test_first_failure_order() {
        // instanceId is checked before workerThreads
        let mut options = valid_options();
        options.instance_id = InstanceId::nil();
        options.worker_threads = 0;
        assert_eq!(build(options).unwrap_err().field(), Some("instanceId"));

        // workerThreads is checked before prepareAckCount
        let mut options = valid_options();
        options.worker_threads = 0;
        options.prepare_ack_count = 0;
        assert_eq!(build(options).unwrap_err().field(), Some("workerThreads"));

        // the append-size conflict is checked before the DNS conflict
        let mut options = valid_options();
        options.max_append_size = MAX_APPEND_SIZE_CEILING + 1;
        options.discover_via_dns = true;
        options.cluster_dns = Some(String::new());
        let err = build(options).unwrap_err();
        assert!(err.to_string().contains("maxAppendSize"));
    }

    #[test]
    fn test_rendering_contains_expected_fields() {
        let mut options = valid_options();
        options.cluster_node_count = 3;
        options.prepare_ack_count = 2;
        options.commit_ack_count = 2;
        let settings = build(options).unwrap();
        let rendered = settings.to_string();

        assert!(rendered.contains("WorkerThreads: 5"));
        assert!(rendered.contains("ClusterNodeCount: 3"));
        assert!(rendered.contains("Certificate: n/a"));
        assert!(rendered.contains("TrustedRootCertificates: n/a"));
        assert!(rendered.contains("InternalTcp: 127.0.0.1:1112"));
        assert!(rendered.contains("ExternalTcp: n/a"));
        assert!(rendered.contains("AuthenticationProviderFactory: test-authentication"));
        assert!(rendered.contains("MaxTruncation: -1"));
        // every entry on its own line
        assert!(rendered.lines().all(|l| l.contains(": ")));
    }

    #[test]
    fn test_rendering_with_certificate() {
        let mut options = valid_options();
        options.endpoints.internal_secure_tcp = Some(addr(1113));
        options.certificate = Some(dummy_cert());
        options.trusted_root_certs = Some(vec![dummy_cert(), dummy_cert()]);
        let rendered = build(options).unwrap().to_string();

        assert!(rendered.contains("Certificate: blake3:"));
        assert!(rendered.contains("TrustedRootCertificates: 2 certificate(s)"));
    }

    #[test]
    fn test_rendering_idempotent_across_builds() {
        let (authn, authz) = factories();
        let first = valid_options().build(authn.clone(), authz.clone()).unwrap();
        let second = valid_options().build(authn, authz).unwrap();
        assert_eq!(first.to_string(), second.to_string());
    }

    #[test]
    fn test_reconfigure_public_surface_copy_on_write() {
        let settings = build(valid_options()).unwrap();
        let reconfigured = settings.with_public_surface(true, true, false);

        assert!(!settings.http.admin_on_public);
        assert!(!settings.http.stats_on_public);
        assert!(reconfigured.http.admin_on_public);
        assert!(reconfigured.http.stats_on_public);
        assert!(!reconfigured.http.gossip_on_public);
        // untouched groups are carried over
        assert_eq!(
            reconfigured.replication.prepare_ack_count,
            settings.replication.prepare_ack_count
        );
    }

    #[test]
    fn test_reconfigure_certificates_copy_on_write() {
        let settings = build(valid_options()).unwrap();
        let rotated = settings.with_certificates(dummy_cert(), None);

        assert!(settings.security.certificate.is_none());
        assert!(rotated.security.certificate.is_some());
    }

    #[test]
    fn test_reconfigure_reader_cap_copy_on_write() {
        let settings = build(valid_options()).unwrap();
        let widened = settings.with_ptable_max_reader_count(64);

        assert_eq!(settings.storage.ptable_max_reader_count, 16);
        assert_eq!(widened.storage.ptable_max_reader_count, 64);
    }
}
