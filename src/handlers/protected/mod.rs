// Protected handlers: a valid user session is required
pub mod certificates;
pub mod elements;
pub mod password;
pub mod reservations;
pub mod sponsorships;

pub use certificates::get as certificates_get;

pub use elements::delete as elements_delete;
pub use elements::patch as elements_patch;

pub use password::patch as password_patch;

pub use reservations::delete as reservations_delete;
pub use reservations::get as reservations_get;
pub use reservations::patch as reservations_patch;
pub use reservations::post as reservations_post;

pub use sponsorships::delete as sponsorships_delete;
pub use sponsorships::get as sponsorships_get;
pub use sponsorships::patch as sponsorships_patch;
