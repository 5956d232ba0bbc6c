use serde::{Deserialize, Serialize};

/// Body of `POST /api/auth/login` (password-grant style).
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Body of `POST /api/auth/refresh`.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Response returned after login or refresh.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub account: PublicAccount,
}

/// Public part of the account returned alongside the token pair.
#[derive(Debug, Serialize)]
pub struct PublicAccount {
    pub id: i64,
    pub email: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_response_never_carries_credentials() {
        let response = AuthResponse {
            access_token: "a.b.c".into(),
            refresh_token: "d.e.f".into(),
            account: PublicAccount {
                id: 1,
                email: "test@example.com".into(),
            },
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["account"]["email"], "test@example.com");
        assert!(json["account"].get("password_hash").is_none());
    }
}
