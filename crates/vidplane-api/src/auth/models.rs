use uuid::Uuid;
use vidplane_core::models::Organization;

/// How the caller authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    ApiKey,
    Jwt,
}

/// Resolved caller identity, attached as a request extension by the auth
/// middleware. Every protected handler scopes its queries to
/// `organization_id`.
#[derive(Clone)]
pub struct OrgContext {
    pub organization_id: Uuid,
    pub organization: Organization,
    /// owner, admin, or member. API keys act as admin.
    pub role: String,
    pub auth_method: AuthMethod,
}

impl OrgContext {
    pub fn is_owner(&self) -> bool {
        self.role == "owner"
    }

    pub fn can_manage_keys(&self) -> bool {
        self.role == "owner" || self.role == "admin"
    }
}
