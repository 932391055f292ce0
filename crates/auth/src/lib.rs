//! `ori-auth`: pure token/identity/role boundary.
//!
//! This crate is intentionally decoupled from HTTP and storage. Tokens are
//! decoded, never verified: signature checks belong to the backend.

pub mod authorize;
pub mod claims;
pub mod identity;
pub mod roles;
pub mod token;

pub use authorize::{
    AccessDenied, AccessExplanation, DenialKind, authorize, explain_access, has_any_role,
};
pub use claims::Claims;
pub use identity::{Identity, ROLE_SOURCES, RoleSource, SubjectId, resolve_identity, resolve_role};
pub use roles::{Role, RoleRequirement, UnknownRole};
pub use token::{MalformedToken, decode_token, encode_unsigned};
