//! Menu listing.

use serde::Deserialize;
use tracing::instrument;

use feastly_core::{MenuCategory, MenuItem, group_by_category};

use crate::client::StorefrontClient;
use crate::error::Result;
use crate::transport::{ApiRequest, Transport};

pub const MENU_PATH: &str = "/products";
pub const BEST_SELLERS_PATH: &str = "/products/best-sellers";

/// List endpoints wrap their items in `{ "data": [...] }`.
#[derive(Deserialize)]
struct Listing<T> {
    data: Vec<T>,
}

impl<T: Transport> StorefrontClient<T> {
    /// Every product on the menu, in service order.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Session` if the request fails and
    /// `ClientError::Decode` if the listing is malformed.
    #[instrument(skip(self))]
    pub async fn menu(&self) -> Result<Vec<MenuItem>> {
        let listing: Listing<MenuItem> = self.fetch(ApiRequest::get(MENU_PATH)).await?;
        tracing::debug!(items = listing.data.len(), "Menu loaded");
        Ok(listing.data)
    }

    /// The menu grouped by category, categories in first-seen order.
    ///
    /// # Errors
    ///
    /// As [`menu`](Self::menu).
    pub async fn menu_by_category(&self) -> Result<Vec<MenuCategory>> {
        Ok(group_by_category(self.menu().await?))
    }

    /// The products the service ranks as most ordered.
    ///
    /// # Errors
    ///
    /// As [`menu`](Self::menu).
    #[instrument(skip(self))]
    pub async fn best_sellers(&self) -> Result<Vec<MenuItem>> {
        let listing: Listing<MenuItem> = self.fetch(ApiRequest::get(BEST_SELLERS_PATH)).await?;
        Ok(listing.data)
    }
}
