use std::fmt;

use serde::{Deserialize, Serialize};

/// Tenant partition selector applied to every API call.
///
/// `None` addresses the parent tenant; `Some(id)` narrows the call to one
/// microtenant.
#[derive(Debug, Clone, Default, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    pub microtenant_id: Option<String>,
}

impl Scope {
    pub fn tenant() -> Self {
        Self::default()
    }

    /// Blank or whitespace-only ids fall back to the parent tenant.
    pub fn microtenant(id: impl AsRef<str>) -> Self {
        let trimmed = id.as_ref().trim();
        Self {
            microtenant_id: (!trimmed.is_empty()).then(|| trimmed.to_string()),
        }
    }

    pub fn from_optional(id: Option<&str>) -> Self {
        id.map(Self::microtenant).unwrap_or_default()
    }

    pub fn microtenant_id(&self) -> Option<&str> {
        self.microtenant_id.as_deref()
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.microtenant_id {
            Some(id) => write!(f, "microtenant:{id}"),
            None => f.write_str("tenant"),
        }
    }
}
