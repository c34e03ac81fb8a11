//! Menu listing.

use feastly_core::MenuItem;
use feastly_storefront::{Result, StorefrontClient};

/// Print the menu, grouped by category, or the best sellers.
///
/// # Errors
///
/// Returns an error if the listing cannot be fetched.
#[allow(clippy::print_stdout)]
pub async fn list(client: &StorefrontClient, best_sellers: bool) -> Result<()> {
    if best_sellers {
        println!("Best sellers");
        for item in client.best_sellers().await? {
            print_item(&item);
        }
        return Ok(());
    }

    for category in client.menu_by_category().await? {
        println!("{}", category.name);
        for item in &category.items {
            print_item(item);
        }
        println!();
    }
    Ok(())
}

#[allow(clippy::print_stdout)]
fn print_item(item: &MenuItem) {
    println!("  {:<24} {:>8}  [{}]", item.name, item.base_price, item.id);
    for size in &item.sizes {
        println!("      size  {:<14} +{}  [{}]", size.name, size.price, size.id);
    }
    for extra in &item.extras {
        println!("      extra {:<14} +{}", extra.name, extra.price);
    }
}
