//! Pluggable policy contracts
//!
//! The settings core treats authentication, authorization, and persistent
//! subscription consumer strategies as opaque capabilities supplied by the
//! bootstrap. It never inspects their internals; the only obligation is a
//! diagnostic name for rendering.

use std::sync::Arc;

/// Builds the authentication provider the HTTP/TCP frontends will use.
pub trait AuthenticationProviderFactory: Send + Sync {
    /// Short name used in diagnostics
    fn name(&self) -> &str;
}

/// Builds the authorization provider consulted on every operation.
pub trait AuthorizationProviderFactory: Send + Sync {
    /// Short name used in diagnostics
    fn name(&self) -> &str;
}

/// Builds a named consumer strategy for persistent subscriptions.
///
/// Registered under its strategy name; subscription groups select a
/// strategy by that name at creation time.
pub trait ConsumerStrategyFactory: Send + Sync {
    /// Strategy name subscription groups refer to
    fn strategy_name(&self) -> &str;
}

/// Shared handle types used throughout the settings value.
pub type AuthenticationFactoryRef = Arc<dyn AuthenticationProviderFactory>;
pub type AuthorizationFactoryRef = Arc<dyn AuthorizationProviderFactory>;
pub type ConsumerStrategyFactoryRef = Arc<dyn ConsumerStrategyFactory>;
