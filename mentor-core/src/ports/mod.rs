//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external dependencies. The core domain
//! depends only on these traits, not on concrete implementations.

mod identity_provider;
mod progress_store;

pub use identity_provider::{
    IdentityProvider, OAuthRedirect, SessionHandler, SessionListeners, Subscription,
};
pub use progress_store::ProgressStore;
