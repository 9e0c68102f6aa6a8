// Credential check - Must pass before any other API call
use crate::application::looker_api::LookerApi;
use crate::domain::query::User;
use crate::infrastructure::looker_client::LookerApiError;

pub const CREDENTIAL_ERROR_MESSAGE: &str =
    "Error retrieving self using API. Please check your credentials.";

/// Confirm the session is valid. Any failure is returned unchanged.
pub async fn verify_api_credentials(api: &dyn LookerApi) -> anyhow::Result<User> {
    match api.me().await {
        Ok(user) => {
            tracing::info!(
                "Authenticated as user {} ({}, {})",
                user.id,
                user.display_name.as_deref().unwrap_or("unnamed"),
                user.email.as_deref().unwrap_or("no email")
            );
            Ok(user)
        }
        Err(e) => {
            eprintln!("{}", credential_failure_report(&e));
            tracing::error!(error = %e, "credential check failed");
            Err(e)
        }
    }
}

/// Console text for a failed identity check. Rejected credentials get the
/// fixed message alone; anything else also names the underlying failure.
pub fn credential_failure_report(err: &anyhow::Error) -> String {
    match err.downcast_ref::<LookerApiError>() {
        Some(LookerApiError::Unauthorized { .. }) => CREDENTIAL_ERROR_MESSAGE.to_string(),
        _ => format!(
            "{} The API could not be reached or answered unexpectedly: {:#}",
            CREDENTIAL_ERROR_MESSAGE, err
        ),
    }
}
