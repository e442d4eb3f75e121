pub mod jwt;

pub use jwt::{Claims, JwtIdentityVerifier, issue_token};
