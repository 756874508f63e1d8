use serde::{Deserialize, Serialize};

pub const PASSWORD_RESET: &str = "password_reset";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// User id for access tokens, email for reset tokens.
    pub sub: String,
    pub exp: usize,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>
}
