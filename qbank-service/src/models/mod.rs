pub mod company;
pub mod invitation;
pub mod user;

pub use company::Company;
pub use invitation::{Invitation, InvitationPreview};
pub use user::{InviteRole, Role, User, UserProfile};
