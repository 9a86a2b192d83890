use crate::config::{ColorTables, ConfigStore};
use crate::model::ResolvedIdentity;
use crate::monitor::{LocationResolver, NetworkStateReader};
use std::sync::Arc;

/// A resolved identity together with the color generation it must be
/// rendered against.
pub struct Composition {
    pub identity: ResolvedIdentity,
    pub tables: Arc<ColorTables>,
}

pub struct IdentityResolver;

impl IdentityResolver {
    /// Combine the current snapshots. Performs no lookups of its own.
    pub fn compose(
        network: &NetworkStateReader,
        location: &LocationResolver,
        config: &ConfigStore,
    ) -> Composition {
        Composition {
            identity: ResolvedIdentity {
                network: network.last_known().to_string(),
                location: location.snapshot().clone(),
            },
            tables: config.snapshot(),
        }
    }
}
