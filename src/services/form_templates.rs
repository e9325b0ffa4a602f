//! Form templates built in the UI form builder and submission checks.

use crate::{
    auth::TenantContext,
    db::TenantSchemas,
    entities::form_template,
    errors::ServiceError,
    services::{validation::{is_valid_field_key, validate_not_blank}, Page},
};
use chrono::{NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::HashSet;
use std::sync::Arc;
use strum::{AsRefStr, Display, EnumIter, EnumString};
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

static EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern"));
static PHONE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[0-9 ()\-]{6,20}$").expect("phone pattern"));

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TemplateTarget {
    Ticket,
    Item,
    Contract,
    General,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FieldType {
    Text,
    Textarea,
    Number,
    Select,
    Multiselect,
    Date,
    Checkbox,
    Email,
    Phone,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TemplateField {
    pub key: String,
    pub label: String,
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "name": "On-site visit report",
    "target": "ticket",
    "fields": [
        {"key": "visit_date", "label": "Visit date", "field_type": "date", "required": true},
        {"key": "outcome", "label": "Outcome", "field_type": "select", "options": ["fixed", "pending"]}
    ]
}))]
pub struct CreateFormTemplateInput {
    #[validate(length(min = 1, max = 200), custom = "validate_not_blank")]
    pub name: String,
    pub description: Option<String>,
    pub target: TemplateTarget,
    pub fields: Vec<TemplateField>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateFormTemplateInput {
    #[validate(length(min = 1, max = 200), custom = "validate_not_blank")]
    pub name: Option<String>,
    pub description: Option<String>,
    pub target: Option<TemplateTarget>,
    pub fields: Option<Vec<TemplateField>>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct FormSubmission {
    #[schema(value_type = Object)]
    pub values: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SubmissionResult {
    pub valid: bool,
    pub errors: Vec<FieldError>,
}

/// Template with its fields decoded.
#[derive(Debug, Clone)]
pub struct FormTemplateView {
    pub template: form_template::Model,
    pub fields: Vec<TemplateField>,
}

/// Checks the builder output before it is stored.
pub fn validate_fields(fields: &[TemplateField]) -> Result<(), ServiceError> {
    if fields.is_empty() {
        return Err(ServiceError::ValidationError(
            "A template needs at least one field".to_string(),
        ));
    }
    let mut keys = HashSet::new();
    for field in fields {
        if !is_valid_field_key(&field.key) {
            return Err(ServiceError::ValidationError(format!(
                "Field key '{}' must use lowercase letters, digits and underscores",
                field.key
            )));
        }
        if !keys.insert(field.key.as_str()) {
            return Err(ServiceError::ValidationError(format!(
                "Field key '{}' is used more than once",
                field.key
            )));
        }
        if field.label.trim().is_empty() {
            return Err(ServiceError::ValidationError(format!(
                "Field '{}' needs a label",
                field.key
            )));
        }
        let needs_options = matches!(field.field_type, FieldType::Select | FieldType::Multiselect);
        let has_options = field.options.as_ref().is_some_and(|o| !o.is_empty());
        if needs_options && !has_options {
            return Err(ServiceError::ValidationError(format!(
                "Field '{}' of type {} needs at least one option",
                field.key, field.field_type
            )));
        }
    }
    Ok(())
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

fn check_value(field: &TemplateField, value: &Value) -> Option<String> {
    let options = field.options.as_deref().unwrap_or_default();
    match field.field_type {
        FieldType::Text | FieldType::Textarea => {
            (!value.is_string()).then(|| "must be text".to_string())
        }
        FieldType::Number => {
            let numeric = match value {
                Value::Number(n) => n.as_f64().is_some_and(f64::is_finite),
                Value::String(s) => s.trim().parse::<f64>().is_ok_and(f64::is_finite),
                _ => false,
            };
            (!numeric).then(|| "must be a number".to_string())
        }
        FieldType::Checkbox => (!value.is_boolean()).then(|| "must be true or false".to_string()),
        FieldType::Date => match value.as_str() {
            Some(s) if NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok() => None,
            _ => Some("must be a date (YYYY-MM-DD)".to_string()),
        },
        FieldType::Email => match value.as_str() {
            Some(s) if EMAIL.is_match(s) => None,
            _ => Some("must be an email address".to_string()),
        },
        FieldType::Phone => match value.as_str() {
            Some(s) if PHONE.is_match(s) => None,
            _ => Some("must be a phone number".to_string()),
        },
        FieldType::Select => match value.as_str() {
            Some(s) if options.iter().any(|o| o == s) => None,
            _ => Some(format!("must be one of: {}", options.join(", "))),
        },
        FieldType::Multiselect => {
            let all_known = value.as_array().is_some_and(|items| {
                items
                    .iter()
                    .all(|v| v.as_str().is_some_and(|s| options.iter().any(|o| o == s)))
            });
            (!all_known).then(|| format!("must be a list drawn from: {}", options.join(", ")))
        }
    }
}

/// Per-field errors for a submission; an empty list means it is valid.
pub fn validate_submission(fields: &[TemplateField], values: &Map<String, Value>) -> Vec<FieldError> {
    let mut errors = Vec::new();
    for field in fields {
        match values.get(&field.key) {
            Some(value) if !is_blank(value) => {
                if let Some(message) = check_value(field, value) {
                    errors.push(FieldError {
                        field: field.key.clone(),
                        message,
                    });
                }
            }
            _ if field.required => errors.push(FieldError {
                field: field.key.clone(),
                message: "is required".to_string(),
            }),
            _ => {}
        }
    }

    let known: HashSet<&str> = fields.iter().map(|f| f.key.as_str()).collect();
    let mut unknown: Vec<&String> = values.keys().filter(|k| !known.contains(k.as_str())).collect();
    unknown.sort();
    errors.extend(unknown.into_iter().map(|key| FieldError {
        field: key.clone(),
        message: "is not part of this template".to_string(),
    }));
    errors
}

fn decode_fields(model: &form_template::Model) -> Result<Vec<TemplateField>, ServiceError> {
    Ok(serde_json::from_value(model.fields.clone())?)
}

fn view(template: form_template::Model) -> Result<FormTemplateView, ServiceError> {
    let fields = decode_fields(&template)?;
    Ok(FormTemplateView { template, fields })
}

/// Service for form templates
#[derive(Clone)]
pub struct FormTemplateService {
    schemas: Arc<TenantSchemas>,
}

impl FormTemplateService {
    pub fn new(schemas: Arc<TenantSchemas>) -> Self {
        Self { schemas }
    }

    #[instrument(skip(self, ctx, input), fields(tenant_id = %ctx.tenant_id))]
    pub async fn create_template(
        &self,
        ctx: &TenantContext,
        input: CreateFormTemplateInput,
    ) -> Result<FormTemplateView, ServiceError> {
        input.validate()?;
        validate_fields(&input.fields)?;

        let txn = self.schemas.begin(ctx.tenant_id).await?;
        let now = Utc::now();
        let created = form_template::ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(ctx.tenant_id),
            name: Set(input.name.trim().to_string()),
            description: Set(input.description),
            target: Set(input.target.to_string()),
            fields: Set(serde_json::to_value(&input.fields)?),
            version: Set(1),
            is_active: Set(true),
            created_by: Set(ctx.user_id),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;

        info!(template_id = %created.id, fields = input.fields.len(), "form template created");
        Ok(FormTemplateView {
            template: created,
            fields: input.fields,
        })
    }

    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id))]
    pub async fn get_template(
        &self,
        ctx: &TenantContext,
        id: Uuid,
    ) -> Result<FormTemplateView, ServiceError> {
        let txn = self.schemas.begin(ctx.tenant_id).await?;
        let found = find_template(&txn, ctx.tenant_id, id).await?;
        txn.commit().await?;
        view(found)
    }

    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id))]
    pub async fn list_templates(
        &self,
        ctx: &TenantContext,
        target: Option<TemplateTarget>,
        include_inactive: bool,
        page: Page,
    ) -> Result<(Vec<FormTemplateView>, u64), ServiceError> {
        let txn = self.schemas.begin(ctx.tenant_id).await?;
        let mut query = form_template::Entity::find()
            .filter(form_template::Column::TenantId.eq(ctx.tenant_id));
        if !include_inactive {
            query = query.filter(form_template::Column::IsActive.eq(true));
        }
        if let Some(target) = target {
            query = query.filter(form_template::Column::Target.eq(target.to_string()));
        }

        let total = query.clone().count(&txn).await?;
        let rows = query
            .order_by_asc(form_template::Column::Name)
            .offset(page.offset())
            .limit(page.limit)
            .all(&txn)
            .await?;
        txn.commit().await?;

        let views = rows.into_iter().map(view).collect::<Result<Vec<_>, _>>()?;
        Ok((views, total))
    }

    /// Updates a template and bumps its version
    #[instrument(skip(self, ctx, input), fields(tenant_id = %ctx.tenant_id))]
    pub async fn update_template(
        &self,
        ctx: &TenantContext,
        id: Uuid,
        input: UpdateFormTemplateInput,
    ) -> Result<FormTemplateView, ServiceError> {
        input.validate()?;
        if let Some(fields) = &input.fields {
            validate_fields(fields)?;
        }

        let txn = self.schemas.begin(ctx.tenant_id).await?;
        let existing = find_template(&txn, ctx.tenant_id, id).await?;
        if !existing.is_active {
            return Err(ServiceError::not_found("Form template", id));
        }
        let version = existing.version + 1;

        let mut active: form_template::ActiveModel = existing.into();
        if let Some(name) = input.name {
            active.name = Set(name.trim().to_string());
        }
        if input.description.is_some() {
            active.description = Set(input.description);
        }
        if let Some(target) = input.target {
            active.target = Set(target.to_string());
        }
        if let Some(fields) = &input.fields {
            active.fields = Set(serde_json::to_value(fields)?);
        }
        active.version = Set(version);
        active.updated_at = Set(Utc::now());

        let updated = active.update(&txn).await?;
        txn.commit().await?;

        info!(template_id = %id, version, "form template updated");
        view(updated)
    }

    /// Soft deletes a template
    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id))]
    pub async fn delete_template(&self, ctx: &TenantContext, id: Uuid) -> Result<(), ServiceError> {
        let txn = self.schemas.begin(ctx.tenant_id).await?;
        let existing = find_template(&txn, ctx.tenant_id, id).await?;
        if !existing.is_active {
            return Err(ServiceError::not_found("Form template", id));
        }
        let mut active: form_template::ActiveModel = existing.into();
        active.is_active = Set(false);
        active.updated_at = Set(Utc::now());
        active.update(&txn).await?;
        txn.commit().await?;
        Ok(())
    }

    /// Validates a submission against the current version of a template
    #[instrument(skip(self, ctx, submission), fields(tenant_id = %ctx.tenant_id))]
    pub async fn validate_submission(
        &self,
        ctx: &TenantContext,
        id: Uuid,
        submission: FormSubmission,
    ) -> Result<SubmissionResult, ServiceError> {
        let template = self.get_template(ctx, id).await?;
        if !template.template.is_active {
            return Err(ServiceError::not_found("Form template", id));
        }
        let errors = validate_submission(&template.fields, &submission.values);
        Ok(SubmissionResult {
            valid: errors.is_empty(),
            errors,
        })
    }
}

async fn find_template<C: ConnectionTrait>(
    conn: &C,
    tenant_id: Uuid,
    id: Uuid,
) -> Result<form_template::Model, ServiceError> {
    form_template::Entity::find_by_id(id)
        .filter(form_template::Column::TenantId.eq(tenant_id))
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::not_found("Form template", id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn field(key: &str, field_type: FieldType, required: bool) -> TemplateField {
        TemplateField {
            key: key.to_string(),
            label: key.replace('_', " "),
            field_type,
            required,
            options: None,
            placeholder: None,
        }
    }

    fn select(key: &str, options: &[&str]) -> TemplateField {
        TemplateField {
            options: Some(options.iter().map(|o| o.to_string()).collect()),
            ..field(key, FieldType::Select, true)
        }
    }

    fn values(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn builder_output_is_checked() {
        assert!(validate_fields(&[]).is_err());
        assert!(validate_fields(&[field("Bad Key", FieldType::Text, false)]).is_err());
        assert!(validate_fields(&[
            field("serial", FieldType::Text, false),
            field("serial", FieldType::Number, false)
        ])
        .is_err());
        assert!(validate_fields(&[field("outcome", FieldType::Select, false)]).is_err());
        assert!(validate_fields(&[select("outcome", &["fixed"])]).is_ok());
    }

    #[test]
    fn submissions_report_each_failing_field() {
        let fields = vec![
            field("visit_date", FieldType::Date, true),
            field("hours", FieldType::Number, false),
            field("contact", FieldType::Email, false),
            select("outcome", &["fixed", "pending"]),
        ];
        let errors = validate_submission(
            &fields,
            &values(json!({
                "hours": "two",
                "contact": "ops@example.com",
                "outcome": "unknown",
                "extra": 1
            })),
        );
        let failing: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(failing, vec!["visit_date", "hours", "outcome", "extra"]);
        assert_eq!(errors[0].message, "is required");
    }

    #[rstest]
    #[case(json!(2.5), true)]
    #[case(json!(-4), true)]
    #[case(json!(" 12 "), true)]
    #[case(json!("1e3"), true)]
    #[case(json!("NaN"), false)]
    #[case(json!("inf"), false)]
    #[case(json!("-infinity"), false)]
    #[case(json!("1e400"), false)]
    #[case(json!(true), false)]
    fn numbers_must_be_finite(#[case] value: Value, #[case] ok: bool) {
        let hours = field("hours", FieldType::Number, false);
        assert_eq!(check_value(&hours, &value).is_none(), ok, "{}", value);
    }

    #[test]
    fn valid_submission_has_no_errors() {
        let mut multi = select("parts", &["filter", "belt"]);
        multi.field_type = FieldType::Multiselect;
        let fields = vec![
            field("visit_date", FieldType::Date, true),
            field("done", FieldType::Checkbox, true),
            multi,
        ];
        let errors = validate_submission(
            &fields,
            &values(json!({"visit_date": "2024-05-02", "done": false, "parts": ["belt"]})),
        );
        assert!(errors.is_empty(), "{:?}", errors);
    }
}
