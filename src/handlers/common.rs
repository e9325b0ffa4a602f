use crate::{
    auth::TenantContext,
    config::AppConfig,
    errors::ServiceError,
    services::{ticket_history::AuditContext, Page, MAX_PAGE},
    ApiResponse, PaginatedResponse,
};
use axum::{
    http::{header, HeaderMap, StatusCode},
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

/// Response of create endpoints: 201 plus the envelope
pub type Created<T> = (StatusCode, Json<ApiResponse<T>>);

pub type CreatedResult<T> = Result<Created<T>, ServiceError>;

/// Result of delete endpoints: an empty 204
pub type NoContent = Result<StatusCode, ServiceError>;

/// Pagination parameters for list operations
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PaginationParams {
    /// 1-based page number
    pub page: Option<u64>,
    /// Page size, clamped to the configured maximum
    pub limit: Option<u64>,
}

/// Clamps the requested page size and rejects page numbers past [`MAX_PAGE`]
pub fn page_for(
    config: &AppConfig,
    page: Option<u64>,
    limit: Option<u64>,
) -> Result<Page, ServiceError> {
    let page = page.unwrap_or(1);
    if page > MAX_PAGE {
        return Err(ServiceError::ValidationError(format!(
            "page must not exceed {}",
            MAX_PAGE
        )));
    }
    Ok(Page::new(page, config.page_size(limit)))
}

/// Wraps a page of models into the paginated envelope body
pub fn paginate<M, T: From<M>>(rows: Vec<M>, total: u64, page: Page) -> PaginatedResponse<T> {
    PaginatedResponse::new(rows.into_iter().map(T::from).collect(), total, page)
}

pub fn created<T>(data: T) -> Created<T> {
    (StatusCode::CREATED, Json(ApiResponse::success(data)))
}

pub fn ok<T>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse::success(data))
}

/// Caller details stamped on ticket history rows
pub fn audit_context(headers: &HeaderMap, ctx: &TenantContext) -> AuditContext {
    let ip_address = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        });
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    AuditContext {
        performed_by_name: ctx.email.clone(),
        ip_address,
        user_agent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::roles::Role;
    use axum::http::HeaderValue;
    use uuid::Uuid;

    #[test]
    fn audit_context_prefers_first_forwarded_address() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7, 10.0.0.1"));
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.9"));
        headers.insert(header::USER_AGENT, HeaderValue::from_static("helpdesk-ui/2.1"));
        let mut ctx = TenantContext::new(Uuid::new_v4(), Uuid::new_v4(), Role::Agent);
        ctx.email = Some("agent@acme.test".into());

        let audit = audit_context(&headers, &ctx);
        assert_eq!(audit.ip_address.as_deref(), Some("203.0.113.7"));
        assert_eq!(audit.user_agent.as_deref(), Some("helpdesk-ui/2.1"));
        assert_eq!(audit.performed_by_name.as_deref(), Some("agent@acme.test"));
    }

    #[test]
    fn paging_uses_config_bounds() {
        let config = AppConfig::new(
            "sqlite::memory:".into(),
            "secret".into(),
            "127.0.0.1".into(),
            8080,
            "test".into(),
        );
        let page = page_for(&config, Some(3), Some(1_000_000)).unwrap();
        assert_eq!(page.page, 3);
        assert_eq!(page.limit, config.api_max_page_size);
        assert_eq!(
            page_for(&config, None, None).unwrap().limit,
            config.api_default_page_size
        );
        assert_eq!(page_for(&config, Some(MAX_PAGE), None).unwrap().page, MAX_PAGE);
        assert!(matches!(
            page_for(&config, Some(u64::MAX), None),
            Err(ServiceError::ValidationError(_))
        ));
    }
}
