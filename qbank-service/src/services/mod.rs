//! Services layer for qbank-service.
//!
//! Business workflows plus the persistence and identity-provider clients.

mod company;
mod database;
mod identity;
mod invitation;
pub mod token;

pub use company::CompanyService;
pub use database::Database;
pub use identity::{CustomClaims, HttpIdentityProvider, IdentityProvider, MockIdentityProvider};
pub use invitation::InvitationService;
