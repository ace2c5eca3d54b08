//! Client-side pieces shared by the auth views.

mod form;

pub use form::{FormController, FormError, FormMode, FormStatus, OAuthButton};
