//! Bearer-token authentication shared by the API surfaces.
//!
//! Token verification is delegated to the injected [`AuthProvider`]; this module only extracts
//! the token and applies the role table.

use emr_core::{AuthProvider, EmrError, RouteGroup, User};

/// Why a request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    /// No token, a malformed header, or a token the provider does not recognise.
    Unauthenticated,
    /// Valid token, but the user's role may not use the route group.
    Forbidden,
    /// The provider could not be reached.
    Unavailable,
}

/// Extract the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: Option<&str>) -> Result<&str, AuthFailure> {
    let value = header.ok_or(AuthFailure::Unauthenticated)?;
    let (scheme, token) = value
        .trim()
        .split_once(' ')
        .ok_or(AuthFailure::Unauthenticated)?;
    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(AuthFailure::Unauthenticated);
    }
    Ok(token)
}

/// Resolve the header to a user and check that their role may use `group`.
pub async fn authorise(
    provider: &dyn AuthProvider,
    header: Option<&str>,
    group: RouteGroup,
) -> Result<User, AuthFailure> {
    let token = bearer_token(header)?;
    let user = provider.current_user(token).await.map_err(|e| match e {
        EmrError::Transport(_) => AuthFailure::Unavailable,
        _ => AuthFailure::Unauthenticated,
    })?;

    if !user.role.can_access(group) {
        tracing::warn!(user_id = %user.id, role = %user.role, ?group, "access denied");
        return Err(AuthFailure::Forbidden);
    }
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use emr_core::DemoAuthProvider;

    #[test]
    fn bearer_token_parsing() {
        assert_eq!(bearer_token(Some("Bearer abc")), Ok("abc"));
        assert_eq!(bearer_token(Some("bearer  abc ")), Ok("abc"));
        assert_eq!(bearer_token(None), Err(AuthFailure::Unauthenticated));
        assert_eq!(bearer_token(Some("Basic abc")), Err(AuthFailure::Unauthenticated));
        assert_eq!(bearer_token(Some("Bearer")), Err(AuthFailure::Unauthenticated));
        assert_eq!(bearer_token(Some("Bearer   ")), Err(AuthFailure::Unauthenticated));
    }

    #[tokio::test]
    async fn roles_gate_route_groups() {
        let auth = DemoAuthProvider::new();
        let doctor = Some("Bearer demo-token-demo-doctor-001");
        let patient = Some("Bearer demo-token-demo-user-001");

        assert!(authorise(&auth, doctor, RouteGroup::Doctor).await.is_ok());
        assert_eq!(
            authorise(&auth, doctor, RouteGroup::Admin).await.unwrap_err(),
            AuthFailure::Forbidden
        );
        assert_eq!(
            authorise(&auth, patient, RouteGroup::Doctor).await.unwrap_err(),
            AuthFailure::Forbidden
        );
        assert_eq!(
            authorise(&auth, Some("Bearer forged"), RouteGroup::Authenticated)
                .await
                .unwrap_err(),
            AuthFailure::Unauthenticated
        );
    }
}
