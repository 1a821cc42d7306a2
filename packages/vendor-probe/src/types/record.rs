//! Extracted and inflated vendor records.

use indexmap::IndexSet;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::chunk::ChunkId;
use super::link::{BusinessListing, Link};

/// Contact details for one vendor. Each field is a single string; an empty
/// string means "not found".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Contacts {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
}

impl Contacts {
    pub fn is_empty(&self) -> bool {
        self.email.trim().is_empty() && self.phone.trim().is_empty() && self.address.trim().is_empty()
    }

    /// Identity used for cross-chunk dedup.
    ///
    /// Lower-cased email when present, otherwise the phone's digits. Records
    /// with only an address have no identity and are never merged.
    pub fn identity(&self) -> Option<String> {
        let email = self.email.trim();
        if !email.is_empty() {
            return Some(format!("email:{}", email.to_lowercase()));
        }
        let digits: String = self.phone.chars().filter(|c| c.is_ascii_digit()).collect();
        if !digits.is_empty() {
            return Some(format!("phone:{digits}"));
        }
        None
    }
}

/// One vendor/contact candidate as returned by the extractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedRecord {
    pub chunk_id: ChunkId,
    pub name: String,
    /// Which of the plan's targets this vendor matches
    pub target: String,
    pub info: String,
    pub contacts: Contacts,
}

impl ExtractedRecord {
    pub fn new(chunk_id: ChunkId, name: impl Into<String>, contacts: Contacts) -> Self {
        Self {
            chunk_id,
            name: name.into(),
            target: String::new(),
            info: String::new(),
            contacts,
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    pub fn with_info(mut self, info: impl Into<String>) -> Self {
        self.info = info.into();
        self
    }
}

/// A record joined back to the link it was extracted from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorRecord {
    /// Dense 1-based rank in aggregation order
    pub rank: usize,
    pub name: String,
    pub target: String,
    pub info: String,
    pub contacts: Contacts,
    pub url: String,
    pub title: String,
    pub source_providers: IndexSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listing: Option<BusinessListing>,
}

impl VendorRecord {
    /// Inflate an extracted record with its source link. Rank is assigned
    /// later by the aggregator.
    pub fn inflate(record: ExtractedRecord, link: &Link) -> Self {
        Self {
            rank: 0,
            name: record.name,
            target: record.target,
            info: record.info,
            contacts: record.contacts,
            url: link.url.clone(),
            title: link.title.clone(),
            source_providers: link.source_providers.clone(),
            base_url: link.base_url.clone(),
            listing: link.listing.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contacts_empty_ignores_whitespace() {
        let contacts = Contacts {
            email: " ".into(),
            phone: String::new(),
            address: "\t".into(),
        };
        assert!(contacts.is_empty());
    }

    #[test]
    fn test_identity_prefers_email_then_phone_digits() {
        let with_email = Contacts {
            email: "Chef@Kochi.IN".into(),
            phone: "+91 98470 12345".into(),
            address: String::new(),
        };
        assert_eq!(with_email.identity().as_deref(), Some("email:chef@kochi.in"));

        let phone_only = Contacts {
            phone: "+91 98470-12345".into(),
            ..Default::default()
        };
        assert_eq!(phone_only.identity().as_deref(), Some("phone:919847012345"));

        let address_only = Contacts {
            address: "MG Road".into(),
            ..Default::default()
        };
        assert_eq!(address_only.identity(), None);
    }
}
