//! Facts claimed by users and facts extracted from their documents.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Opaque handle into the blob store for a submitted document.
///
/// The pipeline never reads document bytes itself; it only passes this
/// handle along to the analysis gateway.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(transparent)]
pub struct DocumentRef(String);

impl DocumentRef {
    /// Wrap a blob-store handle.
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    /// The raw handle.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DocumentRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Facts a user asserts at submission time.
///
/// Which fields are meaningful depends on the track; unused fields are left
/// unset.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize, Validate)]
pub struct ClaimedFacts {
    /// Email address (email track; must match the account email)
    #[validate(email)]
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub email: Option<String>,
    /// Phone number the confirmation code is sent to
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub phone_number: Option<String>,
    /// Legal name as the user states it
    #[validate(length(max = 200))]
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub full_name: Option<String>,
    /// Residential address as the user states it
    #[validate(length(max = 500))]
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub address: Option<String>,
    /// Monthly rent of the listing the user is applying for, used by the
    /// income-coverage rule
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub monthly_rent: Option<u32>,
}

/// Structured facts the analysis gateway extracted from a document.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct ExtractedFacts {
    /// Full name as printed on the document
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub full_name: Option<String>,
    /// Address as printed on the document
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub address: Option<String>,
    /// Date of birth, when the document carries one
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub date_of_birth: Option<NaiveDate>,
    /// Document serial/reference number
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub document_number: Option<String>,
    /// Document expiry date, when the document carries one
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub expires_on: Option<NaiveDate>,
    /// Monthly income figure (income documents)
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub monthly_income: Option<u32>,
}

impl ExtractedFacts {
    /// True when analysis extracted nothing at all.
    pub fn is_empty(&self) -> bool {
        self == &ExtractedFacts::default()
    }
}
