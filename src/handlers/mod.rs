// Handlers grouped by the session they require:
// public (none) → protected (user session) → elevated (admin session)
pub mod elevated;
pub mod protected;
pub mod public;
pub mod utils;
