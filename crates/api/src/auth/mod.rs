//! Authentication primitives.
//!
//! - [`jwt`] -- JWT access-token generation and validation. Tokens are issued
//!   by the identity service that owns credentials; this server only verifies
//!   them.

pub mod jwt;
