//! Sessions, profiles, and the login pipeline for authgate.
//!
//! This crate provides:
//! - Authenticated profiles (`Profile`) assembled from provider user info and
//!   group memberships
//! - Session records (`Session`) and their storage (`SessionStore`)
//! - The login pipeline (`IdentityBridge`) over pluggable provider traits
//! - The source catalog that decides which paths require login
//! - Same-origin return-to handling for post-login redirects
//!
//! # Example
//!
//! ```
//! use authgate_platform_access::{NonPublicPaths, SourceCatalog};
//!
//! let catalog = SourceCatalog::parse_list("community,groups/blab=blab").unwrap();
//! let gated: NonPublicPaths = catalog.non_public_paths();
//!
//! assert!(gated.requires_login("/groups/blab/ncov"));
//! assert!(!gated.requires_login("/community/flu"));
//! ```

pub mod bridge;
pub mod catalog;
pub mod error;
pub mod origin;
pub mod profile;
pub mod provider;
pub mod session;
pub mod store;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-export main types at crate root
pub use bridge::{
    AuthorizationRequest, CallbackParams, FlowState, GroupDirectory, IdentityBridge,
    IdentityProvider,
};
pub use catalog::{NonPublicPaths, Source, SourceCatalog, Visibility};
pub use error::{CatalogError, LoginError, SessionStoreError};
pub use origin::{DEFAULT_LANDING_PATH, ReturnTo, ServingOrigin};
pub use profile::{Profile, UserInfo};
pub use provider::ProviderConfig;
pub use session::Session;
pub use store::{MemorySessionStore, SessionStore};
