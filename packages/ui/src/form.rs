//! Headless sign-up / sign-in form state.
//!
//! [`FormController`] holds everything a view needs to render an auth form: the
//! field values, the submission status, field-level and banner errors, and which
//! OAuth button (if any) is currently loading. Views call its methods from event
//! handlers and re-render from its getters.

use std::collections::BTreeMap;

use auth_api::dispatch::fields;
use auth_api::{
    AuthKind, AuthRequest, AuthResult, CredentialDispatcher, EnabledProviders, OAuthProvider,
    ProviderRegistry,
};
use thiserror::Error;
use tracing::{debug, error, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    SignUp,
    SignIn,
}

impl FormMode {
    fn kind(self) -> AuthKind {
        match self {
            Self::SignUp => AuthKind::Signup,
            Self::SignIn => AuthKind::Signin,
        }
    }

    fn fields(self) -> &'static [&'static str] {
        match self {
            Self::SignUp => &[fields::NAME, fields::EMAIL, fields::PASSWORD],
            Self::SignIn => &[fields::EMAIL, fields::PASSWORD],
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FormStatus {
    #[default]
    Idle,
    Submitting,
    Success,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("a submission is already in progress")]
    Busy,
    #[error("{} sign-in is not enabled", .0.display_name())]
    ProviderUnavailable(OAuthProvider),
}

/// One OAuth button as the view should draw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthButton {
    pub provider: OAuthProvider,
    pub label: String,
    pub disabled: bool,
    pub loading: bool,
}

#[derive(Debug, Clone)]
pub struct FormController {
    mode: FormMode,
    status: FormStatus,
    /// The single OAuth flow allowed to be in flight.
    oauth_loading: Option<OAuthProvider>,
    providers: EnabledProviders,
    values: BTreeMap<String, String>,
    field_errors: BTreeMap<String, String>,
    error: Option<String>,
    redirect: Option<String>,
    callback_url: Option<String>,
}

impl FormController {
    /// Starts idle with the fallback provider set until [`Self::refresh_providers`] runs.
    pub fn new(mode: FormMode) -> Self {
        Self {
            mode,
            status: FormStatus::Idle,
            oauth_loading: None,
            providers: EnabledProviders::fallback(),
            values: BTreeMap::new(),
            field_errors: BTreeMap::new(),
            error: None,
            redirect: None,
            callback_url: None,
        }
    }

    /// Where the browser should land after an OAuth flow completes.
    pub fn with_callback_url(mut self, url: impl Into<String>) -> Self {
        self.callback_url = Some(url.into());
        self
    }

    pub fn mode(&self) -> FormMode {
        self.mode
    }

    pub fn status(&self) -> FormStatus {
        self.status
    }

    pub fn oauth_loading(&self) -> Option<OAuthProvider> {
        self.oauth_loading
    }

    pub fn providers(&self) -> EnabledProviders {
        self.providers
    }

    pub fn set_providers(&mut self, providers: EnabledProviders) {
        self.providers = providers;
    }

    pub async fn refresh_providers(&mut self, registry: &dyn ProviderRegistry) {
        self.providers = registry.enabled_providers().await;
    }

    pub fn value(&self, name: &str) -> &str {
        self.values.get(name).map(String::as_str).unwrap_or_default()
    }

    /// Provider URL from the last successful OAuth start.
    pub fn redirect(&self) -> Option<&str> {
        self.redirect.as_deref()
    }

    /// Record a field edit. Clears that field's error and leaves the failed state.
    pub fn edit_field(&mut self, name: &str, value: impl Into<String>) {
        self.values.insert(name.to_string(), value.into());
        self.field_errors.remove(name);
        if self.status == FormStatus::Failed {
            self.status = FormStatus::Idle;
        }
    }

    pub fn begin_submit(&mut self) -> Result<(), FormError> {
        if !self.can_submit() {
            return Err(FormError::Busy);
        }
        self.status = FormStatus::Submitting;
        self.error = None;
        self.field_errors.clear();
        Ok(())
    }

    /// Apply the dispatcher's answer to an in-flight submission.
    pub fn finish(&mut self, result: AuthResult) -> FormStatus {
        if self.status != FormStatus::Submitting {
            warn!(status = ?self.status, "result arrived with no submission in flight");
            return self.status;
        }

        if result.success {
            self.status = FormStatus::Success;
            self.redirect = result.redirect;
        } else {
            self.status = FormStatus::Failed;
            self.error = result.error;
            self.field_errors = result.field_errors.unwrap_or_default();
        }
        debug!(status = ?self.status, "submission finished");
        self.status
    }

    pub fn begin_oauth(&mut self, provider: OAuthProvider) -> Result<(), FormError> {
        if !self.can_submit() {
            return Err(FormError::Busy);
        }
        if !self.providers.is_enabled(provider.kind()) {
            return Err(FormError::ProviderUnavailable(provider));
        }
        self.oauth_loading = Some(provider);
        self.error = None;
        Ok(())
    }

    pub fn oauth_failed(&mut self, message: impl Into<String>) {
        self.oauth_loading = None;
        self.error = Some(message.into());
        self.status = FormStatus::Failed;
    }

    /// The provider URL is known and the browser is leaving. The loading flag stays
    /// set until the navigation completes or the view calls [`Self::oauth_aborted`].
    pub fn oauth_redirected(&mut self, url: impl Into<String>) {
        self.redirect = Some(url.into());
    }

    /// The view cancelled a pending provider navigation.
    pub fn oauth_aborted(&mut self) {
        self.oauth_loading = None;
        self.redirect = None;
    }

    /// The request the current values describe.
    pub fn request(&self) -> AuthRequest {
        self.mode
            .fields()
            .iter()
            .fold(AuthRequest::new(self.mode.kind()), |request, name| {
                request.field(name, self.value(name))
            })
    }

    /// Submit the email + password form and wait for the outcome.
    pub async fn submit(
        &mut self,
        dispatcher: &CredentialDispatcher,
    ) -> Result<FormStatus, FormError> {
        self.begin_submit()?;
        let result = dispatcher.submit(self.request()).await;
        Ok(self.finish(result))
    }

    /// Start an OAuth flow. Returns the provider URL to navigate to. `None` means
    /// either the issuer finished without a navigation (status is `Success`) or the
    /// flow could not start and the banner says why.
    pub async fn sign_in_with(
        &mut self,
        dispatcher: &CredentialDispatcher,
        provider: OAuthProvider,
    ) -> Result<Option<String>, FormError> {
        self.begin_oauth(provider)?;

        let mut request = AuthRequest::social(provider);
        request.kind = self.mode.kind();
        if let Some(url) = &self.callback_url {
            request = request.field(fields::CALLBACK_URL, url);
        }

        let result = dispatcher.submit(request).await;
        match result.redirect {
            Some(url) if result.success => {
                self.oauth_redirected(url.clone());
                Ok(Some(url))
            }
            None if result.success => {
                debug!(%provider, "issuer completed sign-in without a redirect");
                self.oauth_loading = None;
                self.status = FormStatus::Success;
                Ok(None)
            }
            _ => {
                let message = result
                    .error
                    .or_else(|| result.field_errors.and_then(|e| e.into_values().next()))
                    .unwrap_or_else(|| format!("Failed to sign in with {}", provider.display_name()));
                error!(%provider, "Failed to start sign-in: {}", message);
                self.oauth_failed(message);
                Ok(None)
            }
        }
    }

    pub fn field_error(&self, name: &str) -> Option<&str> {
        self.field_errors.get(name).map(String::as_str)
    }

    pub fn error_banner(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
        if self.status == FormStatus::Failed && self.field_errors.is_empty() {
            self.status = FormStatus::Idle;
        }
    }

    pub fn can_submit(&self) -> bool {
        self.status != FormStatus::Submitting && self.oauth_loading.is_none()
    }

    pub fn submit_label(&self) -> &'static str {
        let submitting = self.status == FormStatus::Submitting;
        match (self.mode, submitting) {
            (FormMode::SignUp, true) => "Signing up...",
            (FormMode::SignUp, false) => "Sign Up",
            (FormMode::SignIn, true) => "Signing in...",
            (FormMode::SignIn, false) => "Sign In",
        }
    }

    pub fn oauth_buttons(&self) -> Vec<OAuthButton> {
        let disabled = !self.can_submit();
        self.providers
            .oauth()
            .map(|provider| {
                let loading = self.oauth_loading == Some(provider);
                OAuthButton {
                    provider,
                    label: if loading {
                        "Loading...".to_string()
                    } else {
                        format!("Continue with {}", provider.display_name())
                    },
                    disabled,
                    loading,
                }
            })
            .collect()
    }

    pub fn show_email_form(&self) -> bool {
        self.providers.email_password
    }

    /// The "or continue with email" divider sits between the OAuth buttons and the form.
    pub fn show_divider(&self) -> bool {
        self.providers.email_password && self.providers.has_oauth()
    }
}
