//! Listener errors for [`crate::ApiServer`].

use std::net::SocketAddr;

use thiserror::Error;

/// Result alias for API server operations.
pub type ApiServerResult<T> = std::result::Result<T, ApiServerError>;

/// Errors raised while binding or serving the API.
#[derive(Debug, Error)]
pub enum ApiServerError {
    /// The listen address could not be bound.
    #[error("failed to bind api listener")]
    Bind {
        /// Address requested.
        addr: SocketAddr,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
    /// The accept loop stopped with an error.
    #[error("api server terminated unexpectedly")]
    Serve {
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;
    use std::io;
    use std::net::{Ipv4Addr, SocketAddrV4};

    #[test]
    fn bind_error_keeps_address_and_source() {
        let addr = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 8000));
        let err = ApiServerError::Bind {
            addr,
            source: io::Error::new(io::ErrorKind::AddrInUse, "busy"),
        };
        assert_eq!(err.to_string(), "failed to bind api listener");
        assert!(matches!(err, ApiServerError::Bind { addr: bound, .. } if bound == addr));
        assert!(err.source().is_some());
    }
}
