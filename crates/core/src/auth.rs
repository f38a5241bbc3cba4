//! Authentication seam.
//!
//! Handlers never check passwords or tokens themselves; they ask an injected [`AuthProvider`].
//! [`DemoAuthProvider`] serves the three fixed demo accounts, [`HttpAuthProvider`] delegates to
//! the upstream API.

use crate::http::ApiClient;
use crate::roles::Role;
use crate::{EmrError, EmrResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Password shared by all demo accounts.
pub const DEMO_PASSWORD: &str = "demo123";

/// Prefix of demo tokens; the user id follows.
pub const DEMO_TOKEN_PREFIX: &str = "demo-token-";

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abha_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specialty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_number: Option<String>,
}

/// A signed-in user and the bearer token that identifies them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user: User,
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// # Errors
    ///
    /// Returns [`EmrError::InvalidCredentials`] when the email/password pair is not accepted.
    async fn login(&self, credentials: &Credentials) -> EmrResult<Session>;

    /// Resolve a bearer token to its user.
    ///
    /// # Errors
    ///
    /// Returns [`EmrError::Unauthenticated`] for unknown or expired tokens.
    async fn current_user(&self, token: &str) -> EmrResult<User>;
}

// ============================================================================
// Demo accounts
// ============================================================================

#[derive(Clone, Debug)]
pub struct DemoAuthProvider {
    users: Vec<User>,
}

impl Default for DemoAuthProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl DemoAuthProvider {
    pub fn new() -> Self {
        let user = |id: &str, name: &str, email: &str, role: Role, abha_id: &str, phone: &str| {
            User {
                id: id.into(),
                name: name.into(),
                email: email.into(),
                role,
                abha_id: Some(abha_id.into()),
                phone: Some(phone.into()),
                specialty: None,
                license_number: None,
            }
        };

        let admin = User {
            specialty: Some("System Administrator".into()),
            ..user(
                "demo-admin-001",
                "Dr. Admin Demo",
                "admin@demo.com",
                Role::Admin,
                "ABHA-ADMIN-001",
                "+91-99999-99999",
            )
        };
        let doctor = User {
            specialty: Some("Cardiology".into()),
            license_number: Some("MH-12345".into()),
            ..user(
                "demo-doctor-001",
                "Dr. Priya Sharma",
                "doctor@demo.com",
                Role::Doctor,
                "ABHA-DOC-001",
                "+91-98765-43210",
            )
        };
        let patient = user(
            "demo-user-001",
            "Rajesh Kumar",
            "user@demo.com",
            Role::Patient,
            "ABHA-USER-001",
            "+91-98765-43211",
        );

        Self {
            users: vec![admin, doctor, patient],
        }
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn token_for(user: &User) -> String {
        format!("{DEMO_TOKEN_PREFIX}{}", user.id)
    }
}

#[async_trait]
impl AuthProvider for DemoAuthProvider {
    async fn login(&self, credentials: &Credentials) -> EmrResult<Session> {
        let email = credentials.email.trim();
        let user = self
            .users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email) && credentials.password == DEMO_PASSWORD)
            .ok_or(EmrError::InvalidCredentials)?;

        tracing::info!(user_id = %user.id, role = %user.role, "demo login");
        Ok(Session {
            token: Self::token_for(user),
            user: user.clone(),
        })
    }

    async fn current_user(&self, token: &str) -> EmrResult<User> {
        let id = token
            .strip_prefix(DEMO_TOKEN_PREFIX)
            .ok_or(EmrError::Unauthenticated)?;
        self.users
            .iter()
            .find(|u| u.id == id)
            .cloned()
            .ok_or(EmrError::Unauthenticated)
    }
}

// ============================================================================
// Upstream API
// ============================================================================

/// `POST {base}/auth/login` and `GET {base}/user/me`.
#[derive(Clone, Debug)]
pub struct HttpAuthProvider {
    client: ApiClient,
}

impl HttpAuthProvider {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[derive(Serialize)]
struct LoginBody<'a> {
    email: &'a str,
    password: &'a str,
}

#[async_trait]
impl AuthProvider for HttpAuthProvider {
    async fn login(&self, credentials: &Credentials) -> EmrResult<Session> {
        let body = LoginBody {
            email: credentials.email.trim(),
            password: &credentials.password,
        };
        self.client
            .post_json("/auth/login", &body)
            .await
            .map_err(|e| match e {
                EmrError::Unauthenticated => EmrError::InvalidCredentials,
                other => other,
            })
    }

    async fn current_user(&self, token: &str) -> EmrResult<User> {
        self.client
            .with_token(token)
            .get_json("/user/me", &[])
            .await
    }
}
