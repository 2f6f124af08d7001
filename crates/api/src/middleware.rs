/// Identification of the calling actor from gateway headers
pub mod auth;
/// Mapping of domain errors to HTTP responses
pub mod error_handling;
