//! Field validators shared by request inputs.

use once_cell::sync::Lazy;
use regex::Regex;
use validator::ValidationError;

static HEX_COLOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#[0-9a-fA-F]{6}$").expect("hex color pattern"));
static SLUG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?$").expect("slug pattern"));
static FIELD_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9_]{1,64}$").expect("field key pattern"));
static CURRENCY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z]{3}$").expect("currency pattern"));

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

/// Rejects values made only of whitespace.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(invalid("blank", "Value cannot be blank"))
    } else {
        Ok(())
    }
}

pub fn validate_hex_color(value: &str) -> Result<(), ValidationError> {
    if HEX_COLOR.is_match(value) {
        Ok(())
    } else {
        Err(invalid("hex_color", "Color must be a #RRGGBB value"))
    }
}

/// Lowercase DNS label, used for tenant subdomains.
pub fn validate_slug(value: &str) -> Result<(), ValidationError> {
    if SLUG.is_match(value) {
        Ok(())
    } else {
        Err(invalid(
            "slug",
            "Use lowercase letters, digits and inner dashes (max 63 chars)",
        ))
    }
}

pub fn is_valid_field_key(value: &str) -> bool {
    FIELD_KEY.is_match(value)
}

pub fn validate_currency(value: &str) -> Result<(), ValidationError> {
    if CURRENCY.is_match(value) {
        Ok(())
    } else {
        Err(invalid("currency", "Currency must be an ISO 4217 code"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("acme", true)]
    #[case("acme-support", true)]
    #[case("a1", true)]
    #[case("-acme", false)]
    #[case("acme-", false)]
    #[case("Acme", false)]
    #[case("acme_support", false)]
    #[case("", false)]
    fn slugs(#[case] input: &str, #[case] ok: bool) {
        assert_eq!(validate_slug(input).is_ok(), ok);
    }

    #[rstest]
    #[case("Printer offline", true)]
    #[case(" padded ", true)]
    #[case("", false)]
    #[case("   ", false)]
    #[case("\t\n", false)]
    fn blank_values(#[case] input: &str, #[case] ok: bool) {
        assert_eq!(validate_not_blank(input).is_ok(), ok);
    }

    #[test]
    fn colors_keys_and_currencies() {
        assert!(validate_hex_color("#1A2b3C").is_ok());
        assert!(validate_hex_color("red").is_err());
        assert!(is_valid_field_key("serial_number_2"));
        assert!(!is_valid_field_key("Serial Number"));
        assert!(validate_currency("BRL").is_ok());
        assert!(validate_currency("usd").is_err());
    }
}
