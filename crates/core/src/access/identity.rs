use crate::types::CompanyId;
use std::collections::HashMap;

/// Attribute key carrying the acting company of a subject
pub const COMPANY_ID_ATTRIBUTE: &str = "company_id";

/// Identity of the subject performing an action
#[derive(Debug, Clone)]
pub struct SubjectIdentity<C: IdentityContext> {
    pub id: String,
    pub source: String,
    pub context: C,
}

impl<C: IdentityContext> SubjectIdentity<C> {
    pub fn new(id: impl Into<String>, source: impl Into<String>, context: C) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            context,
        }
    }

    /// The company this subject acts for, if any
    pub fn company_id(&self) -> Option<CompanyId> {
        self.context
            .get(COMPANY_ID_ATTRIBUTE)
            .and_then(|raw| raw.trim().parse().ok())
    }
}

/// Context information for an identity
pub trait IdentityContext: Send + Sync + Clone + std::fmt::Debug {
    /// Serialize context to key-value pairs
    fn to_attributes(&self) -> HashMap<String, String>;

    /// Get a specific attribute value
    fn get(&self, key: &str) -> Option<&str>;
}

impl IdentityContext for HashMap<String, String> {
    fn to_attributes(&self) -> HashMap<String, String> {
        self.clone()
    }

    fn get(&self, key: &str) -> Option<&str> {
        HashMap::get(self, key).map(String::as_str)
    }
}
