/*!
 * # Authentication and Authorization Module
 *
 * Bearer JWT authentication for the helpdesk API.
 *
 * - Tokens are HS256 JWTs issued by the identity provider (or minted by the
 *   admin CLI) carrying `userId`, `tenantId`, `email` and `role`.
 * - `auth_middleware` validates the token and stores an [`AuthUser`] in the
 *   request extensions.
 * - [`TenantContext`] is the extractor every tenant-scoped handler takes; it
 *   fails with 401 when the token has no usable tenant or user id.
 * - Role gates are attached per router via [`AuthRouterExt`].
 */

use crate::{config::AppConfig, errors::ServiceError};
use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::{str::FromStr, sync::Arc, time::Duration};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

pub mod roles;

pub use roles::Role;

/// Claim structure for JWT tokens. Field names follow the identity
/// provider's camelCase convention.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
}

/// Authenticated caller extracted from the JWT
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: String,
    pub tenant_id: Option<String>,
    pub email: Option<String>,
    pub role: Role,
}

impl AuthUser {
    /// Check whether the caller passes a gate for `role`
    pub fn has_role(&self, role: Role) -> bool {
        self.role.satisfies(role)
    }
}

impl TryFrom<Claims> for AuthUser {
    type Error = AuthError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        let role = Role::from_str(&claims.role).map_err(|_| AuthError::InvalidToken)?;
        Ok(Self {
            user_id: claims.user_id,
            tenant_id: claims.tenant_id,
            email: claims.email,
            role,
        })
    }
}

/// Tenant and user resolved from the token. Every tenant-owned operation
/// receives one of these.
#[derive(Debug, Clone)]
pub struct TenantContext {
    pub tenant_id: Uuid,
    pub user_id: Uuid,
    pub email: Option<String>,
    pub role: Role,
}

impl TenantContext {
    pub fn new(tenant_id: Uuid, user_id: Uuid, role: Role) -> Self {
        Self {
            tenant_id,
            user_id,
            email: None,
            role,
        }
    }
}

impl TryFrom<&AuthUser> for TenantContext {
    type Error = ServiceError;

    fn try_from(user: &AuthUser) -> Result<Self, Self::Error> {
        let tenant_id = user
            .tenant_id
            .as_deref()
            .and_then(|id| Uuid::parse_str(id).ok());
        let user_id = Uuid::parse_str(&user.user_id).ok();

        match (tenant_id, user_id) {
            (Some(tenant_id), Some(user_id)) => Ok(Self {
                tenant_id,
                user_id,
                email: user.email.clone(),
                role: user.role,
            }),
            _ => Err(ServiceError::Unauthorized(
                "Tenant context required".to_string(),
            )),
        }
    }
}

/// Authentication configuration
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub token_expiration: Duration,
}

impl AuthConfig {
    pub fn new(jwt_secret: String, jwt_issuer: String, token_expiration: Duration) -> Self {
        Self {
            jwt_secret,
            jwt_issuer,
            token_expiration,
        }
    }
}

impl From<&AppConfig> for AuthConfig {
    fn from(cfg: &AppConfig) -> Self {
        Self::new(
            cfg.jwt_secret.clone(),
            cfg.jwt_issuer.clone(),
            Duration::from_secs(cfg.jwt_expiration_secs),
        )
    }
}

/// Issues and validates bearer tokens
#[derive(Debug, Clone)]
pub struct AuthService {
    config: AuthConfig,
}

impl AuthService {
    pub fn new(config: AuthConfig) -> Self {
        Self { config }
    }

    pub fn issuer(&self) -> &str {
        &self.config.jwt_issuer
    }

    /// Mint a signed token for the given identity
    pub fn issue_token(
        &self,
        user_id: Uuid,
        tenant_id: Option<Uuid>,
        email: Option<String>,
        role: Role,
    ) -> Result<String, AuthError> {
        let now = Utc::now();
        let exp = now
            + ChronoDuration::from_std(self.config.token_expiration)
                .map_err(|_| AuthError::TokenCreation("Invalid token duration".to_string()))?;

        let claims = Claims {
            user_id: user_id.to_string(),
            tenant_id: tenant_id.map(|id| id.to_string()),
            email,
            role: role.to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            iss: self.config.jwt_issuer.clone(),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| AuthError::TokenCreation(e.to_string()))
    }

    /// Validate a JWT token and extract the claims
    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[self.config.jwt_issuer.as_str()]);

        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        })
    }
}

/// Authentication error types
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing authentication")]
    MissingAuth,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Token creation failed: {0}")]
    TokenCreation(String),

    #[error("Insufficient permissions")]
    InsufficientPermissions,

    #[error("Authentication service not available")]
    ServiceUnavailable,
}

impl From<AuthError> for ServiceError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingAuth | AuthError::InvalidToken | AuthError::TokenExpired => {
                ServiceError::Unauthorized(err.to_string())
            }
            AuthError::InsufficientPermissions => ServiceError::Forbidden(err.to_string()),
            AuthError::TokenCreation(_) | AuthError::ServiceUnavailable => {
                ServiceError::InternalError(err.to_string())
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        ServiceError::from(self).into_response()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(AuthError::MissingAuth)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for TenantContext
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = parts.extensions.get::<AuthUser>().ok_or_else(|| {
            ServiceError::Unauthorized("Tenant context required".to_string())
        })?;
        TenantContext::try_from(user)
    }
}

/// Role middleware: rejects callers holding none of the allowed roles
pub async fn role_middleware(
    State(allowed): State<Arc<Vec<Role>>>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let user = request
        .extensions()
        .get::<AuthUser>()
        .ok_or(AuthError::MissingAuth)?;

    if !allowed.iter().any(|role| user.has_role(*role)) {
        debug!(role = %user.role, "role gate rejected caller");
        return Err(AuthError::InsufficientPermissions);
    }

    Ok(next.run(request).await)
}

/// Authentication middleware that extracts and validates bearer tokens
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let auth_service = match request.extensions().get::<Arc<AuthService>>() {
        Some(service) => service.clone(),
        None => return AuthError::ServiceUnavailable.into_response(),
    };

    match extract_auth_from_headers(request.headers(), &auth_service) {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

fn extract_auth_from_headers(
    headers: &HeaderMap,
    auth_service: &AuthService,
) -> Result<AuthUser, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingAuth)?;

    let token = value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::MissingAuth)?;

    let claims = auth_service.validate_token(token)?;
    AuthUser::try_from(claims)
}

/// Extension methods for Router to add auth middleware
pub trait AuthRouterExt {
    fn with_auth(self) -> Self;
    fn with_role(self, role: Role) -> Self;
    fn with_roles(self, roles: &[Role]) -> Self;
}

impl<S> AuthRouterExt for axum::Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_auth(self) -> Self {
        self.layer(axum::middleware::from_fn(auth_middleware))
    }

    fn with_role(self, role: Role) -> Self {
        self.with_roles(&[role])
    }

    fn with_roles(self, roles: &[Role]) -> Self {
        self.layer(axum::middleware::from_fn_with_state(
            Arc::new(roles.to_vec()),
            role_middleware,
        ))
        .with_auth()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    const SECRET: &str = "k8Jq2vN0xR4tZ7wL1mC9bF3hY6pD5sGa";

    fn service(issuer: &str) -> AuthService {
        AuthService::new(AuthConfig::new(
            SECRET.to_string(),
            issuer.to_string(),
            Duration::from_secs(3600),
        ))
    }

    #[test]
    fn issued_token_validates_with_camel_case_claims() {
        let auth = service("helpdesk-api");
        let user_id = Uuid::new_v4();
        let tenant_id = Uuid::new_v4();
        let token = auth
            .issue_token(
                user_id,
                Some(tenant_id),
                Some("agent@example.com".into()),
                Role::Agent,
            )
            .unwrap();

        let claims = auth.validate_token(&token).unwrap();
        assert_eq!(claims.user_id, user_id.to_string());
        assert_eq!(claims.tenant_id, Some(tenant_id.to_string()));
        assert_eq!(claims.role, "agent");

        let json = serde_json::to_value(&claims).unwrap();
        assert!(json.get("userId").is_some());
        assert!(json.get("tenantId").is_some());
    }

    #[test]
    fn token_from_other_issuer_is_rejected() {
        let token = service("someone-else")
            .issue_token(Uuid::new_v4(), None, None, Role::Agent)
            .unwrap();
        assert_matches!(
            service("helpdesk-api").validate_token(&token),
            Err(AuthError::InvalidToken)
        );
    }

    #[test]
    fn garbage_token_is_rejected() {
        assert_matches!(
            service("helpdesk-api").validate_token("not.a.jwt"),
            Err(AuthError::InvalidToken)
        );
    }

    #[test]
    fn tenant_context_requires_tenant_and_user_ids() {
        let tenant_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();
        let user = AuthUser {
            user_id: user_id.to_string(),
            tenant_id: Some(tenant_id.to_string()),
            email: None,
            role: Role::Agent,
        };
        let ctx = TenantContext::try_from(&user).unwrap();
        assert_eq!(ctx.tenant_id, tenant_id);
        assert_eq!(ctx.user_id, user_id);

        let no_tenant = AuthUser {
            tenant_id: None,
            ..user.clone()
        };
        assert_matches!(
            TenantContext::try_from(&no_tenant),
            Err(ServiceError::Unauthorized(_))
        );

        let bad_user = AuthUser {
            user_id: "not-a-uuid".into(),
            ..user
        };
        assert_matches!(
            TenantContext::try_from(&bad_user),
            Err(ServiceError::Unauthorized(_))
        );
    }

    #[test]
    fn unknown_role_in_claims_is_rejected() {
        let claims = Claims {
            user_id: Uuid::new_v4().to_string(),
            tenant_id: None,
            email: None,
            role: "root".into(),
            iat: 0,
            exp: 0,
            iss: "helpdesk-api".into(),
        };
        assert_matches!(AuthUser::try_from(claims), Err(AuthError::InvalidToken));
    }
}
