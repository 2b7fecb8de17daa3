//! Stock policy factories
//!
//! The settings core requires the bootstrap to supply authentication and
//! authorization provider factories. The checker uses the store's internal
//! providers, which is what a node runs with unless an operator plugs in
//! an external policy.

use driftlog_settings::{AuthenticationProviderFactory, AuthorizationProviderFactory};

/// Factory for the built-in user-database authentication provider.
pub struct InternalAuthenticationFactory;

impl AuthenticationProviderFactory for InternalAuthenticationFactory {
    fn name(&self) -> &str {
        "internal"
    }
}

/// Factory for the built-in ACL authorization provider.
pub struct InternalAuthorizationFactory;

impl AuthorizationProviderFactory for InternalAuthorizationFactory {
    fn name(&self) -> &str {
        "internal"
    }
}
