// Public handlers: no session required
pub mod elements;
pub mod session;

pub use elements::get as elements_get;
pub use elements::post as elements_post;
pub use session::{login, logout, welcome};
