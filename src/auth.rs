use std::fmt;

use crate::error::{FreeCicdError, Result};

/// Personal access token used to authenticate against Azure DevOps.
///
/// The token value never shows up in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Token(String);

impl Token {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Token {
    fn from(value: &str) -> Self {
        Self(value.trim().to_string())
    }
}

impl From<String> for Token {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token(***)")
    }
}

/// Organization name and access token for one Azure DevOps organization.
///
/// Not persisted; a session is opened from it for every top-level operation.
#[derive(Debug, Clone)]
pub struct Connection {
    pub organization: String,
    pub token: Token,
}

impl Connection {
    pub fn new(organization: impl Into<String>, token: Token) -> Self {
        Self {
            organization: organization.into().trim().to_string(),
            token,
        }
    }

    /// Both the organization and the token must be non-empty.
    pub fn validate(&self) -> Result<()> {
        if self.organization.is_empty() {
            return Err(FreeCicdError::Config(
                "Azure DevOps organization name is empty".into(),
            ));
        }
        if self.token.as_str().is_empty() {
            return Err(FreeCicdError::Config(
                "Azure DevOps access token is empty".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_debug_is_redacted() {
        let token = Token::from("super-secret");
        assert_eq!(format!("{token:?}"), "Token(***)");
        assert_eq!(token.as_str(), "super-secret");
    }

    #[test]
    fn test_connection_requires_org_and_token() {
        assert!(Connection::new("contoso", Token::from("pat")).validate().is_ok());
        assert!(Connection::new("  ", Token::from("pat")).validate().is_err());
        assert!(Connection::new("contoso", Token::from(" ")).validate().is_err());
    }
}
