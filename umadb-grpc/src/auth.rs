//! Bearer-token authentication.

use tonic::{Request, Status, metadata::AsciiMetadataValue, service::Interceptor};
use umadb_core::InvalidArgument;

/// Adds `authorization: Bearer <key>` to every outgoing call when a key is
/// configured, and leaves calls untouched otherwise.
#[derive(Clone, Default)]
pub struct BearerAuth {
    header: Option<AsciiMetadataValue>,
}

impl BearerAuth {
    /// # Errors
    ///
    /// Returns [`InvalidArgument`] if the key cannot be sent as an HTTP
    /// header value.
    pub fn new(api_key: Option<&str>) -> Result<Self, InvalidArgument> {
        let header = api_key
            .map(|key| {
                format!("Bearer {key}").parse::<AsciiMetadataValue>().map_err(|_| {
                    InvalidArgument::config("API key contains characters not allowed in a header")
                })
            })
            .transpose()?;
        Ok(Self { header })
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.header.is_some()
    }
}

impl Interceptor for BearerAuth {
    fn call(&mut self, mut request: Request<()>) -> Result<Request<()>, Status> {
        if let Some(header) = &self.header {
            request.metadata_mut().insert("authorization", header.clone());
        }
        Ok(request)
    }
}

impl std::fmt::Debug for BearerAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BearerAuth")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attaches_bearer_header() {
        let mut auth = BearerAuth::new(Some("secret")).unwrap();

        let request = auth.call(Request::new(())).unwrap();

        assert_eq!(
            request.metadata().get("authorization").unwrap(),
            "Bearer secret"
        );
    }

    #[test]
    fn without_key_leaves_request_alone() {
        let mut auth = BearerAuth::new(None).unwrap();

        let request = auth.call(Request::new(())).unwrap();

        assert!(request.metadata().get("authorization").is_none());
        assert!(!auth.is_enabled());
    }

    #[test]
    fn rejects_non_header_keys() {
        assert!(BearerAuth::new(Some("bad\r\nkey")).is_err());
    }
}
