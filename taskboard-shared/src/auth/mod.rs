/// Authentication and authorization
///
/// # Modules
///
/// - [`permissions`]: role enum and the role → permission-set resolver
/// - [`password`]: Argon2id hashing, temporary passwords, reset tokens
/// - [`jwt`]: HS256 session tokens
/// - [`session`]: email/password login
/// - [`middleware`]: bearer-token request authentication
/// - [`authorization`]: guard helpers used by the store modules

pub mod authorization;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod permissions;
pub mod session;
