use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Structured customer fields the backend may attach to a reply.
///
/// All fields are optional on the wire; completeness is judged by
/// [`ExtractedLead::from_customer_info`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
}

impl CustomerInfo {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.phone.is_none() && self.service.is_none()
    }

    /// Compact JSON block appended to the assistant turn for audit, so the
    /// backend sees captured fields on later requests even when the lead was
    /// rejected for forwarding.
    pub fn audit_block(&self) -> Option<String> {
        if self.is_empty() {
            return None;
        }
        serde_json::to_string(self).ok()
    }
}

/// A complete lead ready for CRM forwarding. Name and phone are mandatory;
/// a lead with only one of the two is incomplete and must not be forwarded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtractedLead {
    pub name: String,
    pub phone: String,
    pub service: Option<String>,
}

impl ExtractedLead {
    pub fn from_customer_info(info: &CustomerInfo) -> Option<Self> {
        let name = info.name.as_deref().map(str::trim).filter(|value| !value.is_empty())?;
        let phone = info.phone.as_deref().map(str::trim).filter(|value| !value.is_empty())?;
        let service =
            info.service.as_deref().map(str::trim).filter(|value| !value.is_empty());

        Some(Self {
            name: name.to_string(),
            phone: phone.to_string(),
            service: service.map(str::to_string),
        })
    }

    /// Content hash used as half of the CRM dedup key. Fields are joined
    /// with a separator that cannot appear in them, so distinct leads never
    /// collide by concatenation.
    pub fn content_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.name.as_bytes());
        hasher.update([0x1f]);
        hasher.update(self.phone.as_bytes());
        hasher.update([0x1f]);
        hasher.update(self.service.as_deref().unwrap_or("").as_bytes());
        let digest = hasher.finalize();
        digest.iter().map(|byte| format!("{byte:02x}")).collect()
    }
}
