//! Authentication utilities for portal requests

use crate::portal::PortalError;
use crate::types::{AuthScheme, Credentials};
use base64::Engine;

pub struct AuthHandler;

impl AuthHandler {
    /// Encode the credential pair as `base64(username:password)`
    pub fn encode_credentials(credentials: &Credentials) -> String {
        let token = format!("{}:{}", credentials.username, credentials.password);
        base64::engine::general_purpose::STANDARD.encode(token.as_bytes())
    }

    /// Full `Authorization` header value for the given scheme
    pub fn authorization_header(scheme: AuthScheme, credentials: &Credentials) -> String {
        format!(
            "{} {}",
            scheme.header_prefix(),
            Self::encode_credentials(credentials)
        )
    }

    pub fn validate(credentials: &Credentials) -> Result<(), PortalError> {
        if credentials.username.is_empty() {
            return Err(PortalError::MissingCredentials("username".to_string()));
        }
        if credentials.password.is_empty() {
            return Err(PortalError::MissingCredentials("password".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_encoding() {
        let credentials = Credentials::new("user", "pass");
        assert_eq!(AuthHandler::encode_credentials(&credentials), "dXNlcjpwYXNz");
    }

    #[test]
    fn test_authorization_header_schemes() {
        let credentials = Credentials::new("user", "pass");
        assert_eq!(
            AuthHandler::authorization_header(AuthScheme::Bearer, &credentials),
            "Bearer dXNlcjpwYXNz"
        );
        assert_eq!(
            AuthHandler::authorization_header(AuthScheme::UserToken, &credentials),
            "UserToken dXNlcjpwYXNz"
        );
    }

    #[test]
    fn test_credential_validation() {
        assert!(AuthHandler::validate(&Credentials::new("user", "pass")).is_ok());
        assert!(matches!(
            AuthHandler::validate(&Credentials::new("", "pass")),
            Err(PortalError::MissingCredentials(field)) if field == "username"
        ));
        assert!(matches!(
            AuthHandler::validate(&Credentials::new("user", "")),
            Err(PortalError::MissingCredentials(field)) if field == "password"
        ));
    }
}
