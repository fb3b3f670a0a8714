pub mod auth;
pub mod claims;
pub mod policy;

pub use auth::{auth_middleware, AuthenticatedUser};
pub use claims::claims_augmentation_middleware;
pub use policy::Policy;
