//! Catalog management.

use std::collections::BTreeSet;

use pyrowarden_core::{ProductId, ProductStatus};
use serde::Deserialize;
use tracing::instrument;

use super::{is_all, matches_search};
use crate::models::Notice;
use crate::services::forms::{self, FormError};
use crate::supabase::{AccessToken, CatalogBackend, Product, ProductInput};

/// Query string of the products page.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProductFilter {
    pub q: String,
    pub status: String,
    pub category: String,
}

impl ProductFilter {
    /// Rows matching search (name, description, sku), status and category.
    #[must_use]
    pub fn apply<'a>(&self, products: &'a [Product]) -> Vec<&'a Product> {
        let status = (!is_all(&self.status))
            .then(|| self.status.trim().parse::<ProductStatus>().ok())
            .flatten();
        let category = (!is_all(&self.category)).then(|| self.category.trim());

        products
            .iter()
            .filter(|product| {
                matches_search(
                    &self.q,
                    &[
                        Some(product.name.as_str()),
                        product.description.as_deref(),
                        product.sku.as_deref(),
                    ],
                )
            })
            .filter(|product| status.is_none_or(|s| product.status == s))
            .filter(|product| category.is_none_or(|c| product.category.as_deref() == Some(c)))
            .collect()
    }
}

/// Distinct non-empty categories, sorted.
#[must_use]
pub fn categories(products: &[Product]) -> Vec<String> {
    products
        .iter()
        .filter_map(|product| product.category.as_deref())
        .map(str::trim)
        .filter(|category| !category.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_owned)
        .collect()
}

/// The product create/edit form. Tags and images are comma-separated.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProductForm {
    pub name: String,
    pub description: String,
    pub price: String,
    pub compare_price: String,
    pub sku: String,
    pub stock_quantity: String,
    pub category: String,
    pub tags: String,
    pub status: String,
    pub featured: Option<String>,
    pub images: String,
}

impl Default for ProductForm {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: String::new(),
            price: String::new(),
            compare_price: String::new(),
            sku: String::new(),
            stock_quantity: String::new(),
            category: String::new(),
            tags: String::new(),
            status: ProductStatus::Active.as_str().to_string(),
            featured: None,
            images: String::new(),
        }
    }
}

impl ProductForm {
    /// Pre-fill from an existing product.
    #[must_use]
    pub fn from_product(product: &Product) -> Self {
        Self {
            name: product.name.clone(),
            description: product.description.clone().unwrap_or_default(),
            price: product.price.to_string(),
            compare_price: product
                .compare_price
                .map(|p| p.to_string())
                .unwrap_or_default(),
            sku: product.sku.clone().unwrap_or_default(),
            stock_quantity: product.stock_quantity.to_string(),
            category: product.category.clone().unwrap_or_default(),
            tags: product.tags.join(", "),
            status: product.status.as_str().to_string(),
            featured: product.featured.then(|| "on".to_string()),
            images: product.images.join(", "),
        }
    }

    #[must_use]
    pub fn is_featured(&self) -> bool {
        forms::checkbox(self.featured.as_deref())
    }

    /// Build the insert/update payload.
    ///
    /// # Errors
    ///
    /// Returns a `FormError` for a blank name, a bad price or stock count,
    /// or an unknown status.
    pub fn parse(&self) -> Result<ProductInput, FormError> {
        Ok(ProductInput {
            name: forms::required(&self.name, "Name")?,
            description: forms::non_blank(&self.description),
            price: forms::decimal(&self.price, "Price")?,
            compare_price: forms::optional_decimal(&self.compare_price, "Compare price")?,
            sku: forms::non_blank(&self.sku),
            stock_quantity: forms::integer_or(&self.stock_quantity, 0, "Stock quantity")?,
            images: forms::split_list(&self.images),
            category: forms::non_blank(&self.category),
            tags: forms::split_list(&self.tags),
            status: forms::choice(&self.status, "Status")?,
            featured: self.is_featured(),
        })
    }
}

/// Insert a product.
#[instrument(skip(backend, caller, input), fields(name = %input.name))]
pub async fn create<B: CatalogBackend>(
    backend: &B,
    caller: &AccessToken,
    input: &ProductInput,
) -> Notice {
    match backend.create_product(caller, input).await {
        Ok(product) => {
            tracing::info!(product_id = %product.id, "Product created");
            Notice::success("Success", "Product created successfully")
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to create product");
            Notice::error("Error", "Failed to create product")
        }
    }
}

/// Overwrite a product.
#[instrument(skip(backend, caller, input))]
pub async fn update<B: CatalogBackend>(
    backend: &B,
    caller: &AccessToken,
    id: ProductId,
    input: &ProductInput,
) -> Notice {
    match backend.update_product(caller, id, input).await {
        Ok(()) => Notice::success("Success", "Product updated successfully"),
        Err(e) => {
            tracing::error!(error = %e, "Failed to update product");
            Notice::error("Error", "Failed to update product")
        }
    }
}

/// Delete a product.
#[instrument(skip(backend, caller))]
pub async fn delete<B: CatalogBackend>(backend: &B, caller: &AccessToken, id: ProductId) -> Notice {
    match backend.delete_product(caller, id).await {
        Ok(()) => {
            tracing::info!(product_id = %id, "Product deleted");
            Notice::success("Success", "Product deleted successfully")
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to delete product");
            Notice::error("Error", "Failed to delete product")
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::supabase::{MemoryBackend, ProductQuery};

    fn input(name: &str, category: Option<&str>, status: ProductStatus) -> ProductInput {
        ProductInput {
            name: name.to_string(),
            description: Some(format!("{name} for the field")),
            price: Decimal::new(2500, 2),
            compare_price: None,
            sku: Some(format!("SKU-{}", name.len())),
            stock_quantity: 4,
            images: vec![],
            category: category.map(str::to_owned),
            tags: vec![],
            status,
            featured: false,
        }
    }

    #[test]
    fn test_form_parses_lists_and_defaults() {
        let form = ProductForm {
            name: "Smoke Hood".to_string(),
            price: "49.5".to_string(),
            tags: "safety, , hood ".to_string(),
            images: "https://img.example/a.jpg,https://img.example/b.jpg".to_string(),
            status: "out_of_stock".to_string(),
            featured: Some("on".to_string()),
            ..ProductForm::default()
        };
        let input = form.parse().unwrap();
        assert_eq!(input.tags, ["safety", "hood"]);
        assert_eq!(input.images.len(), 2);
        assert_eq!(input.stock_quantity, 0);
        assert_eq!(input.status, ProductStatus::OutOfStock);
        assert_eq!(input.compare_price, None);
        assert!(input.featured);
    }

    #[test]
    fn test_form_rejects_bad_price() {
        let form = ProductForm {
            name: "Smoke Hood".to_string(),
            price: "cheap".to_string(),
            ..ProductForm::default()
        };
        assert_eq!(
            form.parse().unwrap_err(),
            FormError::InvalidNumber { field: "Price" }
        );
    }

    #[tokio::test]
    async fn test_filters_and_categories() {
        let backend = MemoryBackend::new();
        backend.seed_product(input("Ember Jacket", Some("Apparel"), ProductStatus::Active));
        backend.seed_product(input("Flint", Some("Tools"), ProductStatus::Inactive));
        backend.seed_product(input("Ash Gloves", Some("Apparel"), ProductStatus::Active));
        backend.seed_product(input("Mystery", None, ProductStatus::Active));
        let products = backend
            .list_products(Some(&backend.service_token()), ProductQuery::all())
            .await
            .unwrap();

        assert_eq!(categories(&products), ["Apparel", "Tools"]);

        let filter = ProductFilter {
            category: "Apparel".to_string(),
            status: "all".to_string(),
            ..ProductFilter::default()
        };
        assert_eq!(filter.apply(&products).len(), 2);

        let filter = ProductFilter {
            status: "inactive".to_string(),
            ..ProductFilter::default()
        };
        assert_eq!(filter.apply(&products).len(), 1);

        let filter = ProductFilter {
            q: "field".to_string(),
            ..ProductFilter::default()
        };
        assert_eq!(filter.apply(&products).len(), 4);
    }

    #[tokio::test]
    async fn test_create_update_delete() {
        let backend = MemoryBackend::new();
        let token = backend.service_token();

        let notice = create(&backend, &token, &input("Beacon", None, ProductStatus::Active)).await;
        assert!(!notice.is_error());
        let products = backend
            .list_products(Some(&token), ProductQuery::all())
            .await
            .unwrap();
        let id = products[0].id;

        let mut changed = input("Beacon II", None, ProductStatus::Inactive);
        changed.stock_quantity = 0;
        assert!(!update(&backend, &token, id, &changed).await.is_error());
        let product = backend.get_product(Some(&token), id, false).await.unwrap().unwrap();
        assert_eq!(product.name, "Beacon II");

        assert!(!delete(&backend, &token, id).await.is_error());
        assert!(backend.get_product(Some(&token), id, false).await.unwrap().is_none());
    }
}
