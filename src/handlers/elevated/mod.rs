// Elevated handlers: restricted to the admin account
pub mod users;

pub use users::delete as users_delete;
pub use users::get as users_get;
pub use users::patch as users_patch;
pub use users::post as users_post;
