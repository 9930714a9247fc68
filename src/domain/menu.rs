use super::money::Money;
use crate::error::{PosError, Result};
use chrono::{DateTime, Utc};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_ICON: &str = "🍴";
/// Highest accepted menu price, in Rupiah.
pub const MAX_PRICE: u64 = 1_000_000_000;

/// Categories created on first start when missing.
pub fn default_categories() -> Vec<NewCategory> {
    [
        ("makanan", &[][..]),
        ("minuman", &["bersoda", "biasa", "kafein"][..]),
        ("dessert", &[][..]),
        ("starter/snack", &[][..]),
        ("paket", &[][..]),
    ]
    .into_iter()
    .map(|(name, subs)| NewCategory {
        name: name.to_string(),
        subcategories: subs.iter().map(|s| s.to_string()).collect(),
        icon: DEFAULT_ICON.to_string(),
    })
    .collect()
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Category {
    pub id: u64,
    pub name: String,
    pub subcategories: Vec<String>,
    pub icon: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewCategory {
    pub name: String,
    pub subcategories: Vec<String>,
    pub icon: String,
}

impl Category {
    pub fn has_subcategory(&self, sub: &str) -> bool {
        self.subcategories.iter().any(|s| s == sub)
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct MenuItem {
    pub id: u64,
    pub name: String,
    pub price: Money,
    pub category: String,
    #[serde(default)]
    pub subcategory: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_url: String,
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload for creating a menu item. Accepts `isAvailable` as an alias.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct NewMenuItem {
    pub name: String,
    pub price: Money,
    pub category: String,
    #[serde(default)]
    pub subcategory: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default = "default_available", alias = "isAvailable")]
    pub is_available: bool,
}

fn default_available() -> bool {
    true
}

/// Partial update of a menu item; absent fields are left unchanged.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct MenuItemPatch {
    pub name: Option<String>,
    pub price: Option<Money>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    #[serde(alias = "isAvailable")]
    pub is_available: Option<bool>,
}

impl MenuItem {
    pub fn apply(&mut self, patch: MenuItemPatch, now: DateTime<Utc>) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(price) = patch.price {
            self.price = price;
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(subcategory) = patch.subcategory {
            self.subcategory = subcategory;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(image_url) = patch.image_url {
            self.image_url = image_url;
        }
        if let Some(is_available) = patch.is_available {
            self.is_available = is_available;
        }
        self.updated_at = now;
    }
}

/// Query filters for listing the menu.
#[derive(Debug, Deserialize, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct MenuFilter {
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub min_price: Option<rust_decimal::Decimal>,
    pub max_price: Option<rust_decimal::Decimal>,
    pub q: Option<String>,
}

impl MenuFilter {
    pub fn matches(&self, item: &MenuItem) -> bool {
        if let Some(category) = &self.category
            && &item.category != category
        {
            return false;
        }
        if let Some(subcategory) = &self.subcategory
            && &item.subcategory != subcategory
        {
            return false;
        }
        if let Some(min) = self.min_price
            && item.price.value() < min
        {
            return false;
        }
        if let Some(max) = self.max_price
            && item.price.value() > max
        {
            return false;
        }
        if let Some(q) = &self.q {
            let needle = q.trim().to_lowercase();
            if !needle.is_empty()
                && !item.name.to_lowercase().contains(&needle)
                && !item.description.to_lowercase().contains(&needle)
            {
                return false;
            }
        }
        true
    }
}

/// Category names plus the non-empty subcategory lists, for the menu sidebar.
#[derive(Debug, Serialize, PartialEq)]
pub struct MenuFilters {
    pub categories: Vec<String>,
    pub subcategories: BTreeMap<String, Vec<String>>,
}

impl MenuFilters {
    pub fn from_categories(categories: &[Category]) -> Self {
        let mut names: Vec<String> = categories.iter().map(|c| c.name.clone()).collect();
        names.sort();
        let subcategories = categories
            .iter()
            .filter(|c| !c.subcategories.is_empty())
            .map(|c| (c.name.clone(), c.subcategories.clone()))
            .collect();
        Self {
            categories: names,
            subcategories,
        }
    }
}

pub fn validate_image_url(url: &str) -> Result<()> {
    if url.is_empty() {
        return Ok(());
    }
    let parsed = Url::parse(url).map_err(|_| {
        PosError::validation("Invalid Image URL format. Must start with http:// or https://")
    })?;
    if (url.starts_with("http://") || url.starts_with("https://")) && parsed.host().is_some() {
        Ok(())
    } else {
        Err(PosError::validation(
            "Invalid Image URL format. Must start with http:// or https://",
        ))
    }
}

pub fn validate_price(price: Money) -> Result<()> {
    if price.value() > rust_decimal::Decimal::from(MAX_PRICE) {
        return Err(PosError::validation(format!(
            "Price must not exceed {MAX_PRICE}"
        )));
    }
    Ok(())
}

/// Checks a menu item's fields against its category.
pub fn validate_item_fields(
    name: &str,
    subcategory: &str,
    image_url: &str,
    category: Option<&Category>,
) -> Result<()> {
    if name.trim().is_empty() {
        return Err(PosError::validation("Name is required"));
    }
    let category = category.ok_or_else(|| {
        PosError::validation("Invalid category. Please create the category first.")
    })?;
    if !subcategory.is_empty() && !category.has_subcategory(subcategory) {
        return Err(PosError::validation("Invalid subcategory for this category."));
    }
    validate_image_url(image_url)
}
