//! Startup-time settings shared by the accessors.
//!
//! Loaded once from the `[catalog]` and `[section]` tables of the service
//! configuration, validated, and then shared read-only behind an `Arc`.
//! Table and column names here end up in statement text, so every one must be
//! a plain identifier.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use bitrix_query::sql::is_plain_identifier;

/// Offer-linkage table in the stock catalog install.
pub const DEFAULT_OFFERS_TABLE: &str = "b_iblock_element_prop_s4";

/// `CML2_LINK` property id in the stock catalog install.
pub const DEFAULT_OFFERS_LINK_PROPERTY: u32 = 3451;

/// Section user fields exposed by default.
pub const DEFAULT_SECTION_USER_FIELDS: &[&str] = &[
    "UF_ALT_LINK",
    "UF_BANNER",
    "UF_CODE",
    "UF_COMBUSTION",
    "UF_DESCRIPTION_ARCH",
    "UF_DESCRIPTION_B2B",
    "UF_EMAIL_TO",
    "UF_H1_ARCH",
    "UF_H1_B2B",
    "UF_KEYWORDS_ARCH",
    "UF_KEYWORDS_B2B",
    "UF_MAKE_OFFER_BETTER",
    "UF_PROMO_END",
    "UF_PROMO_START",
    "UF_PROPERTY_CODE",
    "UF_RULES_FILE",
    "UF_TITLE_ARCH",
    "UF_TITLE_B2B",
];

/// A setting that cannot be used safely.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    /// A table or column name is not a plain identifier.
    #[error("{setting}: '{value}' is not a plain identifier")]
    NotAnIdentifier {
        /// Setting path.
        setting: &'static str,
        /// Offending value.
        value: String,
    },
}

/// Offer linkage for catalog products.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CatalogSettings {
    /// Property table of the offers info block.
    pub offers_table: String,
    /// Id of the property linking an offer to its parent product.
    pub offers_link_property: u32,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            offers_table: DEFAULT_OFFERS_TABLE.to_string(),
            offers_link_property: DEFAULT_OFFERS_LINK_PROPERTY,
        }
    }
}

/// Section user-field projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SectionSettings {
    /// `UF_*` columns read from `b_uts_iblock_{IBLOCK_ID}_section`.
    pub user_fields: Vec<String>,
}

impl Default for SectionSettings {
    fn default() -> Self {
        Self {
            user_fields: DEFAULT_SECTION_USER_FIELDS
                .iter()
                .map(|f| f.to_string())
                .collect(),
        }
    }
}

/// Everything the accessors read from configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResourceSettings {
    /// Catalog settings.
    pub catalog: CatalogSettings,
    /// Section settings.
    pub section: SectionSettings,
}

impl ResourceSettings {
    /// Check that every name spliced into SQL is a plain identifier.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if !is_plain_identifier(&self.catalog.offers_table) {
            return Err(SettingsError::NotAnIdentifier {
                setting: "catalog.offers_table",
                value: self.catalog.offers_table.clone(),
            });
        }
        if let Some(field) = self
            .section
            .user_fields
            .iter()
            .find(|f| !is_plain_identifier(f))
        {
            return Err(SettingsError::NotAnIdentifier {
                setting: "section.user_fields",
                value: field.clone(),
            });
        }
        Ok(())
    }
}

/// The JSON key for a user field: lower-cased, without the `UF_` prefix.
pub fn user_field_key(field: &str) -> String {
    field.strip_prefix("UF_").unwrap_or(field).to_lowercase()
}
