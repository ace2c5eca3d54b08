//! Data models returned by the Session Issuer.

mod user;

pub use user::UserInfo;
