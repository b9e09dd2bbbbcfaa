pub mod claims;
pub mod extractors;
pub mod guards;
pub mod middleware;

pub use claims::{AuthUser, Claims};

use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use util::config;

/// Generates a JWT and its expiry timestamp for a given user.
///
/// Token issuance proper belongs to the identity service; this helper exists
/// for tooling and tests that need a caller identity against this API.
pub fn generate_jwt(user_id: i64, admin: bool) -> (String, String) {
    let expiry = Utc::now() + Duration::minutes(config::jwt_duration_minutes() as i64);
    let exp_timestamp = expiry.timestamp() as usize;

    let claims = Claims {
        sub: user_id,
        admin,
        exp: exp_timestamp,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config::jwt_secret().as_bytes()),
    )
    .expect("Token encoding failed");

    (token, expiry.to_rfc3339())
}
