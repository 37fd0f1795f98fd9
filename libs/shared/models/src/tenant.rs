use uuid::Uuid;

use crate::auth::User;

/// The authenticated tenant a request acts on behalf of.
///
/// Built by the auth middleware from verified token claims; handlers never
/// construct it from request input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantContext {
    pub tenant_id: Uuid,
    pub user_id: String,
    pub role: Option<String>,
}

impl TenantContext {
    pub fn from_user(user: &User) -> Option<Self> {
        user.tenant_id.map(|tenant_id| Self {
            tenant_id,
            user_id: user.id.clone(),
            role: user.role.clone(),
        })
    }
}
