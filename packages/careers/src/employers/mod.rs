//! Built-in employer definitions.
//!
//! Each employer is a configuration of one of the generic sources; adding
//! an employer means adding a config function, not a new source type.

pub mod asml;
pub mod micron;

pub use asml::AsmlCredentials;

use std::sync::Arc;

use crate::error::{SourceError, SourceResult};
use crate::sources::SourceContext;
use crate::traits::PageSource;

/// Lowercase keys accepted on the command line.
pub const BUILTIN_KEYS: &[&str] = &["asml", "micron"];

/// Credentials for the built-in employers, passed in explicitly.
#[derive(Debug, Clone, Default)]
pub struct EmployerCredentials {
    pub asml: Option<AsmlCredentials>,
}

/// Display name for a built-in key.
pub fn display_name(key: &str) -> Option<&'static str> {
    match key {
        "asml" => Some(asml::NAME),
        "micron" => Some(micron::NAME),
        _ => None,
    }
}

/// Build the source for a built-in employer key.
///
/// Returns `None` for an unknown key; construction problems (such as a
/// missing credential) come back as `Some(Err(_))`.
pub fn build_builtin(
    key: &str,
    ctx: &SourceContext,
    credentials: &EmployerCredentials,
) -> Option<SourceResult<Arc<dyn PageSource>>> {
    let built: SourceResult<Arc<dyn PageSource>> = match key {
        "asml" => match &credentials.asml {
            Some(creds) => asml::source(ctx.client.clone(), creds).map(|s| Arc::new(s) as Arc<dyn PageSource>),
            None => Err(SourceError::MissingCredential {
                employer: asml::NAME.to_string(),
                name: "ASML_AUTH_TOKEN/ASML_UUID_PREFIX".to_string(),
            }),
        },
        "micron" => micron::source(ctx.client.clone()).map(|s| Arc::new(s) as Arc<dyn PageSource>),
        _ => return None,
    };
    Some(built)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_unknown_key() {
        let ctx = SourceContext::new(Duration::from_secs(5)).unwrap();
        assert!(build_builtin("intel", &ctx, &EmployerCredentials::default()).is_none());
        assert_eq!(display_name("intel"), None);
    }

    #[test]
    fn test_asml_without_credentials_fails_to_build() {
        let ctx = SourceContext::new(Duration::from_secs(5)).unwrap();
        let result = build_builtin("asml", &ctx, &EmployerCredentials::default()).unwrap();
        assert!(matches!(result, Err(SourceError::MissingCredential { .. })));
    }

    #[test]
    fn test_every_builtin_key_resolves() {
        let ctx = SourceContext::new(Duration::from_secs(5)).unwrap();
        let credentials = EmployerCredentials {
            asml: Some(AsmlCredentials {
                auth_token: "t".into(),
                uuid_prefix: "p-".into(),
            }),
        };
        for key in BUILTIN_KEYS {
            let source = tokio_test::assert_ok!(build_builtin(key, &ctx, &credentials).unwrap());
            assert_eq!(Some(source.employer()), display_name(key));
        }
    }
}
