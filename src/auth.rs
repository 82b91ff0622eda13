//! Form-based login against the portal.
//!
//! Success is detected structurally: the logged-in marker must appear within
//! a bounded wait after submitting the form. Field lookup runs through
//! ordered selector strategies because the portal has shipped both named and
//! id-addressed inputs over time.

use std::fmt;
use std::time::Duration;

use tracing::info;

use crate::browser::Browser;
use crate::error::MirrorError;

const LOGIN_CONTROL: [&str; 1] = [".icon-connexion"];
const IDENTIFIER_FIELDS: [&str; 3] = ["[name='identifiant']", "#identifiant", "input[type='text']"];
const SECRET_FIELDS: [&str; 3] = [
    "[name='motdepasse']",
    "#motdepasse",
    "input[type='password']",
];
const LOGGED_IN_MARKER: [&str; 1] = [".icon-deconnexion"];

const LOGIN_CONTROL_WAIT: Duration = Duration::from_secs(15);
const FORM_WAIT: Duration = Duration::from_secs(5);
const CONFIRMATION_WAIT: Duration = Duration::from_secs(10);

/// Account credentials for one run. The secret never appears in logs or
/// debug output.
#[derive(Clone)]
pub struct Credentials {
    pub email: String,
    pub secret: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Authenticates the browser session against the portal.
///
/// # Errors
///
/// Returns [`MirrorError::Authentication`] when any step of the handshake
/// fails; the caller treats this as fatal and mirrors nothing.
pub async fn login<B: Browser + ?Sized>(
    browser: &B,
    base_url: &str,
    credentials: &Credentials,
) -> Result<(), MirrorError> {
    info!(email = %credentials.email, "logging in");

    browser.goto(base_url).await?;
    if !browser.wait_for_any(&LOGIN_CONTROL, LOGIN_CONTROL_WAIT).await? {
        return Err(MirrorError::authentication("login control never appeared"));
    }
    browser
        .click_first(&LOGIN_CONTROL)
        .await
        .map_err(|error| MirrorError::authentication(format!("login control: {error}")))?;

    // the form renders after the click
    browser.wait_for_any(&IDENTIFIER_FIELDS, FORM_WAIT).await?;
    browser
        .fill_first(&IDENTIFIER_FIELDS, &credentials.email)
        .await
        .map_err(|error| MirrorError::authentication(format!("identifier field: {error}")))?;
    browser
        .fill_first(&SECRET_FIELDS, &credentials.secret)
        .await
        .map_err(|error| MirrorError::authentication(format!("secret field: {error}")))?;
    browser
        .press_enter_first(&SECRET_FIELDS)
        .await
        .map_err(|error| MirrorError::authentication(format!("form submit: {error}")))?;

    if browser
        .wait_for_any(&LOGGED_IN_MARKER, CONFIRMATION_WAIT)
        .await?
    {
        info!("login confirmed");
        Ok(())
    } else {
        Err(MirrorError::authentication(
            "logged-in marker never appeared; check the credentials",
        ))
    }
}
