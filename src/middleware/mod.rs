pub mod auth;
pub mod response;

pub use auth::{
    end_session, require_admin, require_user, session_cookie, session_token, start_session,
    SESSION_COOKIE,
};
pub use response::{ApiResponse, ApiResult};
