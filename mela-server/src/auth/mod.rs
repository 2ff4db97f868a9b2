//! Identity: JWT verification and the `CurrentUser` extractor

mod extractor;
pub mod jwt;

pub use extractor::authenticate;
pub use jwt::{Claims, JwtConfig, JwtError, JwtService};
