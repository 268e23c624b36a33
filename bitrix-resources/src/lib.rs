//! # bitrix-resources
//!
//! Typed read accessors for the Bitrix catalog schema:
//!
//! - [`BasketAccessor`]: basket lines of a fuser, with count/cost/weight aggregates
//! - [`CatalogAccessor`]: catalog products with their trade offers
//! - [`ElementAccessor`]: info-block elements, their SEO meta and property values
//! - [`SectionAccessor`]: info-block sections with bound elements, meta and user fields
//!
//! Every public call acquires one connection from the engine, runs the primary
//! statement and its dependent statements on it, and releases it on return.
//!
//! ```rust,ignore
//! use bitrix_resources::{ResourceSettings, Resources};
//!
//! let resources = Resources::new(engine, ResourceSettings::default());
//! let cost = resources.basket().total_cost(42).await?;
//! println!("{}", bitrix_resources::basket::format_amount(cost));
//! ```

pub mod basket;
pub mod catalog;
pub mod element;
mod meta;
pub mod section;
pub mod settings;

use std::sync::Arc;

use bitrix_query::QueryEngine;

pub use basket::{BasketAccessor, BasketItem};
pub use catalog::{CatalogAccessor, CatalogProduct};
pub use element::{ContentElement, ElementAccessor, ElementProperty};
pub use section::{ContentSection, SectionAccessor};
pub use settings::{CatalogSettings, ResourceSettings, SectionSettings, SettingsError};

/// All accessors over one engine, sharing immutable settings.
///
/// Cheap to clone; clones share the engine and the settings.
#[derive(Debug, Clone)]
pub struct Resources<E: QueryEngine> {
    basket: BasketAccessor<E>,
    catalog: CatalogAccessor<E>,
    element: ElementAccessor<E>,
    section: SectionAccessor<E>,
}

impl<E: QueryEngine> Resources<E> {
    /// Build the accessors. `settings` must already be validated.
    pub fn new(engine: E, settings: ResourceSettings) -> Self {
        let ResourceSettings { catalog, section } = settings;
        Self {
            basket: BasketAccessor::new(engine.clone()),
            catalog: CatalogAccessor::new(engine.clone(), &catalog),
            element: ElementAccessor::new(engine.clone()),
            section: SectionAccessor::new(engine, Arc::new(section)),
        }
    }

    /// Basket lines.
    pub fn basket(&self) -> &BasketAccessor<E> {
        &self.basket
    }

    /// Catalog products.
    pub fn catalog(&self) -> &CatalogAccessor<E> {
        &self.catalog
    }

    /// Content elements.
    pub fn element(&self) -> &ElementAccessor<E> {
        &self.element
    }

    /// Content sections.
    pub fn section(&self) -> &SectionAccessor<E> {
        &self.section
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitrix_query::testing::MockEngine;

    #[tokio::test]
    async fn test_accessors_share_engine() {
        let engine = MockEngine::new();
        let resources = Resources::new(engine.clone(), ResourceSettings::default());

        assert_eq!(resources.basket().count(1).await.unwrap(), 0);
        assert!(resources.element().by_id(1).await.is_err());
        assert!(resources.clone().section().by_code("x").await.is_err());

        assert_eq!(engine.executed().len(), 3);
        assert_eq!(engine.acquired(), 3);
        assert_eq!(engine.released(), 3);
    }

    #[tokio::test]
    async fn test_refused_connection_runs_nothing() {
        let engine = MockEngine::new().refuse_connections("Connection refused (os error 111)");
        let resources = Resources::new(engine.clone(), ResourceSettings::default());

        let err = resources.catalog().info(5).await.unwrap_err();
        assert!(err.is_connection_error());
        assert!(engine.executed().is_empty());
    }
}
