pub mod element;
pub mod user;

pub use element::{Confirm, Element, ElementFilter, Rename, Sponsorship, ELEMENTS};
pub use user::{NewUser, User, UserFilter, UserSummary, USERS};
