//! Configuration surface for driftlog-confcheck
//!
//! Mirrors the full documented parameter surface of a DriftLog node. This
//! layer only parses and maps; every acceptance decision belongs to
//! `ClusterNodeOptions::build`.

use clap::Parser;
use driftlog_settings::{
    AdvertisedGossipInfo, ClusterNodeOptions, InstanceId, NodeEndpoints, StatsStorage,
};
use rustls::pki_types::CertificateDer;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// DriftLog node configuration checker
#[derive(Parser, Debug, Clone)]
#[command(name = "driftlog-confcheck")]
#[command(about = "Validate a DriftLog node configuration and render the effective settings")]
pub struct Config {
    /// Node instance id (32 hex digits); a fresh id is minted when omitted
    #[arg(long, env = "DRIFTLOG_INSTANCE_ID")]
    pub instance_id: Option<InstanceId>,

    /// Process-local debug index for co-hosted nodes
    #[arg(long, default_value = "0")]
    pub debug_index: i32,

    /// Internal plaintext TCP endpoint (replication plane)
    #[arg(long)]
    pub int_tcp: Option<SocketAddr>,

    /// Internal TLS TCP endpoint (replication plane)
    #[arg(long)]
    pub int_secure_tcp: Option<SocketAddr>,

    /// External plaintext TCP endpoint (client plane)
    #[arg(long)]
    pub ext_tcp: Option<SocketAddr>,

    /// External TLS TCP endpoint (client plane)
    #[arg(long)]
    pub ext_secure_tcp: Option<SocketAddr>,

    /// Internal management (HTTP) endpoint
    #[arg(long)]
    pub int_http: Option<SocketAddr>,

    /// External management (HTTP) endpoint
    #[arg(long)]
    pub ext_http: Option<SocketAddr>,

    /// Host to advertise for gossip (defaults to the external HTTP address)
    #[arg(long)]
    pub advertise_host: Option<String>,

    /// Port to advertise for gossip (defaults to the external HTTP port)
    #[arg(long)]
    pub advertise_port: Option<u16>,

    /// Run as a read-only replica (follows, never joins elections)
    #[arg(long)]
    pub read_only_replica: bool,

    /// Server certificate in DER form
    #[arg(long, env = "DRIFTLOG_CERTIFICATE_FILE")]
    pub certificate_file: Option<PathBuf>,

    /// Trusted root certificates in DER form (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub trusted_root_cert_files: Vec<PathBuf>,

    /// Trust client certificates for authentication
    #[arg(long)]
    pub enable_trusted_auth: bool,

    /// Disable TLS on the internal (replication) plane
    #[arg(long)]
    pub disable_internal_tls: bool,

    /// Disable TLS on the external (client) plane
    #[arg(long)]
    pub disable_external_tls: bool,

    /// Enable the external plaintext TCP endpoint
    #[arg(long)]
    pub enable_external_tcp: bool,

    /// Discover cluster members via DNS instead of static seeds
    #[arg(long)]
    pub discover_via_dns: bool,

    /// Cluster DNS name used when DNS discovery is enabled
    #[arg(long, default_value = "")]
    pub cluster_dns: String,

    /// Static gossip seed endpoints (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub gossip_seed: Vec<SocketAddr>,

    /// Number of nodes expected in the cluster
    #[arg(long, default_value = "1")]
    pub cluster_size: u32,

    /// Keep gossiping even when clustered with only this node
    #[arg(long)]
    pub gossip_on_single_node: bool,

    /// Replicas that must acknowledge a prepare
    #[arg(long, default_value = "1")]
    pub prepare_ack_count: u32,

    /// Replicas that must acknowledge a commit
    #[arg(long, default_value = "1")]
    pub commit_ack_count: u32,

    /// Prepare phase timeout (milliseconds)
    #[arg(long, default_value = "2000")]
    pub prepare_timeout_ms: u64,

    /// Commit phase timeout (milliseconds)
    #[arg(long, default_value = "2000")]
    pub commit_timeout_ms: u64,

    /// Write completion timeout (milliseconds)
    #[arg(long, default_value = "2000")]
    pub write_timeout_ms: u64,

    /// Minimum delay between log flushes (milliseconds)
    #[arg(long, default_value = "2")]
    pub min_flush_delay_ms: u64,

    /// Election priority of this node
    #[arg(long, default_value = "0")]
    pub node_priority: i32,

    /// Maximum log truncation on startup, -1 to disable the check
    #[arg(long, default_value = "-1")]
    pub max_truncation: i64,

    /// Tolerate more nodes than the configured cluster size
    #[arg(long)]
    pub unsafe_allow_surplus_nodes: bool,

    /// Maximum single-append payload size in bytes
    #[arg(long, default_value = "1048576")]
    pub max_append_size: u32,

    /// Gossip round interval (milliseconds)
    #[arg(long, default_value = "2000")]
    pub gossip_interval_ms: u64,

    /// Allowed clock skew between members (milliseconds)
    #[arg(long, default_value = "60000")]
    pub gossip_allowed_difference_ms: u64,

    /// Gossip exchange timeout (milliseconds)
    #[arg(long, default_value = "2500")]
    pub gossip_timeout_ms: u64,

    /// How long a dead member stays listed before removal (seconds)
    #[arg(long, default_value = "1800")]
    pub dead_member_removal_period_secs: u64,

    /// Internal TCP heartbeat timeout (milliseconds)
    #[arg(long, default_value = "700")]
    pub int_tcp_heartbeat_timeout_ms: u64,

    /// Internal TCP heartbeat interval (milliseconds)
    #[arg(long, default_value = "700")]
    pub int_tcp_heartbeat_interval_ms: u64,

    /// External TCP heartbeat timeout (milliseconds)
    #[arg(long, default_value = "1000")]
    pub ext_tcp_heartbeat_timeout_ms: u64,

    /// External TCP heartbeat interval (milliseconds)
    #[arg(long, default_value = "2000")]
    pub ext_tcp_heartbeat_interval_ms: u64,

    /// Send gossip over the plaintext transport
    #[arg(long)]
    pub gossip_over_plaintext: bool,

    /// Expose admin endpoints on the public HTTP interface
    #[arg(long)]
    pub admin_on_public: bool,

    /// Expose stats endpoints on the public HTTP interface
    #[arg(long)]
    pub stats_on_public: bool,

    /// Expose gossip endpoints on the public HTTP interface
    #[arg(long)]
    pub gossip_on_public: bool,

    /// Disable the AtomPub feed over HTTP
    #[arg(long)]
    pub disable_atom_pub_over_http: bool,

    /// Disable HTTP response caching
    #[arg(long)]
    pub disable_http_caching: bool,

    /// Log every HTTP request
    #[arg(long)]
    pub log_http_requests: bool,

    /// Log failed authentication attempts
    #[arg(long)]
    pub log_failed_authentication_attempts: bool,

    /// Skip first-level authorization on HTTP endpoints
    #[arg(long)]
    pub disable_first_level_http_authorization: bool,

    /// Maximum entries held in an in-memory index table
    #[arg(long, default_value = "1000000")]
    pub max_memtable_size: usize,

    /// Reads allowed while resolving an index hash collision
    #[arg(long, default_value = "100")]
    pub hash_collision_read_limit: u32,

    /// Index cache depth
    #[arg(long, default_value = "16")]
    pub index_cache_depth: u32,

    /// On-disk index format version
    #[arg(long, default_value = "4")]
    pub index_bitness_version: u8,

    /// Optimize index merges by skipping untouched ranges
    #[arg(long)]
    pub optimize_index_merge: bool,

    /// Index storage path (defaults to the data directory)
    #[arg(long)]
    pub index_path: Option<PathBuf>,

    /// Maximum index level merged automatically
    #[arg(long, default_value = "1000")]
    pub max_auto_merge_index_level: u32,

    /// Reader threads for index and log access
    #[arg(long, default_value = "4")]
    pub reader_threads_count: usize,

    /// Threads used to open the database on startup
    #[arg(long, default_value = "1")]
    pub initialization_threads: usize,

    /// Reduce page-cache pressure from log access
    #[arg(long)]
    pub reduce_file_cache_pressure: bool,

    /// Keep scavenged chunks instead of deleting them
    #[arg(long)]
    pub always_keep_scavenged: bool,

    /// Skip index checksum verification on open
    #[arg(long)]
    pub skip_index_verify: bool,

    /// Skip the index scan on reads
    #[arg(long)]
    pub skip_index_scan_on_reads: bool,

    /// Maximum concurrent readers per index page table
    #[arg(long, default_value = "16")]
    pub ptable_max_reader_count: usize,

    /// Days of scavenge history to keep
    #[arg(long, default_value = "30")]
    pub scavenge_history_max_age: u32,

    /// Disable merging of chunks during scavenge
    #[arg(long)]
    pub disable_scavenge_merging: bool,

    /// Skip database hash verification on open
    #[arg(long)]
    pub skip_db_verify: bool,

    /// Allow scavenging to drop hard-deleted streams entirely
    #[arg(long)]
    pub unsafe_ignore_hard_deletes: bool,

    /// Pending send bytes per connection before disconnect
    #[arg(long, default_value = "10485760")]
    pub connection_pending_send_bytes_threshold: usize,

    /// Queued messages per connection before disconnect
    #[arg(long, default_value = "50000")]
    pub connection_queue_size_threshold: usize,

    /// Worker thread pool size
    #[arg(long, default_value = "5")]
    pub worker_threads: usize,

    /// Stats collection period (seconds)
    #[arg(long, default_value = "30")]
    pub stats_period_secs: u64,

    /// Where stats are written (stream, csv, stream-and-csv)
    #[arg(long, default_value = "stream")]
    pub stats_storage: StatsStorage,

    /// Collect histograms for operation latencies
    #[arg(long)]
    pub enable_histograms: bool,

    /// Fault projections that see events out of order
    #[arg(long)]
    pub fault_out_of_order_projections: bool,

    /// Start the standard projections automatically
    #[arg(long)]
    pub start_standard_projections: bool,
}

impl Config {
    /// Map the parsed surface onto staging options.
    ///
    /// Certificate material is passed in because loading it is file I/O and
    /// belongs to the binary, not this mapping.
    pub fn into_options(
        self,
        instance_id: InstanceId,
        certificate: Option<CertificateDer<'static>>,
        trusted_root_certs: Option<Vec<CertificateDer<'static>>>,
    ) -> ClusterNodeOptions {
        let gossip_advertise = self.gossip_advertise();
        ClusterNodeOptions {
            instance_id,
            debug_index: self.debug_index,
            endpoints: NodeEndpoints {
                internal_tcp: self.int_tcp,
                internal_secure_tcp: self.int_secure_tcp,
                external_tcp: self.ext_tcp,
                external_secure_tcp: self.ext_secure_tcp,
                internal_http: self.int_http,
                external_http: self.ext_http,
            },
            read_only_replica: self.read_only_replica,
            gossip_advertise,

            enable_trusted_auth: self.enable_trusted_auth,
            certificate,
            trusted_root_certs,
            disable_internal_tls: self.disable_internal_tls,
            disable_external_tls: self.disable_external_tls,
            enable_external_tcp: self.enable_external_tcp,

            discover_via_dns: self.discover_via_dns,
            cluster_dns: Some(self.cluster_dns),
            gossip_seeds: Some(self.gossip_seed),
            cluster_node_count: self.cluster_size,
            gossip_on_single_node: self.gossip_on_single_node,

            prepare_ack_count: self.prepare_ack_count,
            commit_ack_count: self.commit_ack_count,
            prepare_timeout: Duration::from_millis(self.prepare_timeout_ms),
            commit_timeout: Duration::from_millis(self.commit_timeout_ms),
            write_timeout: Duration::from_millis(self.write_timeout_ms),
            min_flush_delay: Duration::from_millis(self.min_flush_delay_ms),
            node_priority: self.node_priority,
            max_truncation: self.max_truncation,
            unsafe_allow_surplus_nodes: self.unsafe_allow_surplus_nodes,
            max_append_size: self.max_append_size,

            gossip_interval: Duration::from_millis(self.gossip_interval_ms),
            gossip_allowed_time_difference: Duration::from_millis(
                self.gossip_allowed_difference_ms,
            ),
            gossip_timeout: Duration::from_millis(self.gossip_timeout_ms),
            dead_member_removal_period: Duration::from_secs(self.dead_member_removal_period_secs),
            int_tcp_heartbeat_timeout: Duration::from_millis(self.int_tcp_heartbeat_timeout_ms),
            int_tcp_heartbeat_interval: Duration::from_millis(self.int_tcp_heartbeat_interval_ms),
            ext_tcp_heartbeat_timeout: Duration::from_millis(self.ext_tcp_heartbeat_timeout_ms),
            ext_tcp_heartbeat_interval: Duration::from_millis(self.ext_tcp_heartbeat_interval_ms),
            gossip_over_secure_transport: !self.gossip_over_plaintext,

            admin_on_public: self.admin_on_public,
            stats_on_public: self.stats_on_public,
            gossip_on_public: self.gossip_on_public,
            enable_atom_pub_over_http: !self.disable_atom_pub_over_http,
            disable_http_caching: self.disable_http_caching,
            log_http_requests: self.log_http_requests,
            log_failed_authentication_attempts: self.log_failed_authentication_attempts,
            disable_first_level_http_authorization: self.disable_first_level_http_authorization,

            max_memtable_entry_count: self.max_memtable_size,
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
            verify_db_hash: !self.skip_db_verify,
            unsafe_ignore_hard_deletes: self.unsafe_ignore_hard_deletes,

            connection_pending_send_bytes_threshold: self.connection_pending_send_bytes_threshold,
            connection_queue_size_threshold: self.connection_queue_size_threshold,
            worker_threads: self.worker_threads,

            stats_period: Duration::from_secs(self.stats_period_secs),
            stats_storage: self.stats_storage,
            enable_histograms: self.enable_histograms,
            fault_out_of_order_projections: self.fault_out_of_order_projections,
            start_standard_projections: self.start_standard_projections,

            additional_consumer_strategies: Default::default(),
        }
    }

    /// Advertised gossip address: explicit flags win, otherwise fall back to
    /// the external HTTP endpoint.
    fn gossip_advertise(&self) -> Option<AdvertisedGossipInfo> {
        match (&self.advertise_host, self.advertise_port, self.ext_http) {
            (Some(host), Some(port), _) => Some(AdvertisedGossipInfo::new(host.clone(), port)),
            (Some(host), None, Some(http)) => {
                Some(AdvertisedGossipInfo::new(host.clone(), http.port()))
            }
            (None, Some(port), Some(http)) => {
                Some(AdvertisedGossipInfo::new(http.ip().to_string(), port))
            }
            (None, None, Some(http)) => {
                Some(AdvertisedGossipInfo::new(http.ip().to_string(), http.port()))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Config {
        let mut full = vec!["driftlog-confcheck"];
        full.extend_from_slice(args);
        Config::parse_from(full)
    }

    #[test]
    fn test_defaults_map_onto_option_defaults() {
        let config = parse(&[]);
        let options = config.into_options(InstanceId([1; 16]), None, None);
        let defaults = ClusterNodeOptions::default();

        assert_eq!(options.cluster_node_count, defaults.cluster_node_count);
        assert_eq!(options.prepare_ack_count, defaults.prepare_ack_count);
        assert_eq!(options.max_append_size, defaults.max_append_size);
        assert_eq!(options.gossip_interval, defaults.gossip_interval);
        assert_eq!(options.worker_threads, defaults.worker_threads);
        assert_eq!(options.verify_db_hash, defaults.verify_db_hash);
        assert_eq!(
            options.gossip_over_secure_transport,
            defaults.gossip_over_secure_transport
        );
        assert_eq!(options.cluster_dns, defaults.cluster_dns);
        assert_eq!(options.gossip_seeds, Some(Vec::new()));
    }

    #[test]
    fn test_advertise_falls_back_to_external_http() {
        let config = parse(&["--ext-http", "10.0.0.5:2113"]);
        let advertise = config.gossip_advertise().unwrap();
        assert_eq!(advertise.host, "10.0.0.5");
        assert_eq!(advertise.port, 2113);
    }

    #[test]
    fn test_explicit_advertise_wins() {
        let config = parse(&[
            "--ext-http",
            "10.0.0.5:2113",
            "--advertise-host",
            "node1.example.com",
            "--advertise-port",
            "443",
        ]);
        let advertise = config.gossip_advertise().unwrap();
        assert_eq!(advertise.host, "node1.example.com");
        assert_eq!(advertise.port, 443);
    }

    #[test]
    fn test_no_endpoints_means_no_advertise() {
        let config = parse(&[]);
        assert!(config.gossip_advertise().is_none());
    }

    #[test]
    fn test_inverted_flags() {
        let config = parse(&["--disable-atom-pub-over-http", "--skip-db-verify"]);
        let options = config.into_options(InstanceId([1; 16]), None, None);
        assert!(!options.enable_atom_pub_over_http);
        assert!(!options.verify_db_hash);
    }

    #[test]
    fn test_gossip_seed_list_parses() {
        let config = parse(&["--gossip-seed", "10.0.0.1:2113,10.0.0.2:2113"]);
        assert_eq!(config.gossip_seed.len(), 2);
    }
}
