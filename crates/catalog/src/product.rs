use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use mercato_core::{CategoryId, DomainError, DomainResult, Entity, ProductId};

/// A catalog product.
///
/// The price is the *current* unit price. Orders never reference it live; they
/// copy it into their line totals when priced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    id: ProductId,
    name: String,
    price: Decimal,
    category_id: CategoryId,
}

impl Product {
    /// Rehydrate a stored product. Adapters use this after reading a row.
    pub fn from_parts(id: ProductId, name: String, price: Decimal, category_id: CategoryId) -> Self {
        Self {
            id,
            name,
            price,
            category_id,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn price(&self) -> Decimal {
        self.price
    }

    pub fn category_id(&self) -> CategoryId {
        self.category_id
    }

    /// Apply a partial update, validating the resulting state.
    ///
    /// Nothing is changed if any field is invalid.
    pub fn apply_changes(&mut self, changes: ProductChanges) -> DomainResult<()> {
        let name = match changes.name {
            Some(name) => validate_name(&name)?,
            None => self.name.clone(),
        };
        let price = match changes.price {
            Some(price) => validate_price(price)?,
            None => self.price,
        };

        self.name = name;
        self.price = price;
        if let Some(category_id) = changes.category_id {
            self.category_id = category_id;
        }
        Ok(())
    }
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// A product that has not been stored yet (no identifier assigned).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub price: Decimal,
    pub category_id: CategoryId,
}

impl NewProduct {
    pub fn new(name: impl Into<String>, price: Decimal, category_id: CategoryId) -> DomainResult<Self> {
        let name = validate_name(&name.into())?;
        let price = validate_price(price)?;
        Ok(Self {
            name,
            price,
            category_id,
        })
    }

    /// Re-run validation on a value built field by field (e.g. deserialized).
    pub fn validated(self) -> DomainResult<Self> {
        Self::new(self.name, self.price, self.category_id)
    }
}

/// Partial update of a product. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductChanges {
    pub name: Option<String>,
    pub price: Option<Decimal>,
    pub category_id: Option<CategoryId>,
}

impl ProductChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.price.is_none() && self.category_id.is_none()
    }
}

fn validate_name(name: &str) -> DomainResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DomainError::validation("product name cannot be empty"));
    }
    Ok(name.to_string())
}

fn validate_price(price: Decimal) -> DomainResult<Decimal> {
    if price < Decimal::ZERO {
        return Err(DomainError::validation("product price cannot be negative"));
    }
    Ok(price)
}
