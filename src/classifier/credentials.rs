use std::env;

use async_trait::async_trait;

use crate::classifier::{
    error::{ClassifierError, authentication_error, invalid_config},
    types::{CredentialRef, ProviderDialect, ProviderProfile, ResolvedCredential},
};

pub const ANTHROPIC_VERSION: &str = "2023-06-01";

#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn resolve(
        &self,
        reference: &CredentialRef,
        provider: &ProviderProfile,
    ) -> Result<ResolvedCredential, ClassifierError>;
}

#[derive(Default)]
pub struct EnvCredentialProvider;

#[async_trait]
impl CredentialProvider for EnvCredentialProvider {
    async fn resolve(
        &self,
        reference: &CredentialRef,
        provider: &ProviderProfile,
    ) -> Result<ResolvedCredential, ClassifierError> {
        match reference {
            CredentialRef::Env { var } => {
                let token = env::var(var).map_err(|_| {
                    authentication_error(format!(
                        "missing credential environment variable {} for provider {}",
                        var,
                        provider.dialect.as_str()
                    ))
                })?;
                Ok(credential_for_dialect(provider.dialect, &token))
            }
            CredentialRef::InlineToken { token } => {
                if token.trim().is_empty() {
                    return Err(invalid_config("inline credential token cannot be empty"));
                }
                Ok(credential_for_dialect(provider.dialect, token))
            }
            CredentialRef::None => Ok(ResolvedCredential::none()),
        }
    }
}

/// The anthropic messages API authenticates through `x-api-key` rather than
/// a bearer header.
fn credential_for_dialect(dialect: ProviderDialect, token: &str) -> ResolvedCredential {
    match dialect {
        ProviderDialect::Anthropic => ResolvedCredential {
            auth_header: None,
            extra_headers: vec![
                ("x-api-key".to_string(), token.to_string()),
                ("anthropic-version".to_string(), ANTHROPIC_VERSION.to_string()),
            ],
        },
        _ => ResolvedCredential {
            auth_header: Some(format!("Bearer {token}")),
            extra_headers: Vec::new(),
        },
    }
}
