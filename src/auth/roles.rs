/*!
 * # Roles
 *
 * Tokens carry exactly one role. `saas_admin` operates the platform and is
 * accepted by every role gate; the other roles are tenant scoped.
 */

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
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
pub enum Role {
    SaasAdmin,
    TenantAdmin,
    Agent,
    Customer,
}

impl Role {
    /// Whether a holder of `self` may pass a gate that requires `required`.
    pub fn satisfies(self, required: Role) -> bool {
        self == Role::SaasAdmin || self == required
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn role_names_round_trip_through_strings() {
        for role in Role::iter() {
            assert_eq!(Role::from_str(role.as_ref()).unwrap(), role);
        }
        assert_eq!(Role::SaasAdmin.to_string(), "saas_admin");
        assert_eq!(Role::TenantAdmin.as_ref(), "tenant_admin");
        assert!(Role::from_str("root").is_err());
    }

    #[test]
    fn saas_admin_satisfies_every_gate() {
        for required in Role::iter() {
            assert!(Role::SaasAdmin.satisfies(required));
        }
        assert!(Role::Agent.satisfies(Role::Agent));
        assert!(!Role::Agent.satisfies(Role::TenantAdmin));
        assert!(!Role::Customer.satisfies(Role::Agent));
    }
}
