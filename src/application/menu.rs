use crate::domain::menu::{
    Category, DEFAULT_ICON, MenuFilter, MenuFilters, MenuItem, MenuItemPatch, NewCategory,
    NewMenuItem, default_categories, validate_item_fields, validate_price,
};
use crate::domain::ports::{CategoryStoreRef, MenuStoreRef};
use crate::error::{PosError, Result};
use chrono::Utc;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct CategoryInput {
    pub name: String,
    #[serde(default)]
    pub subcategories: Vec<String>,
    pub icon: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct CategoryPatch {
    pub name: Option<String>,
    pub subcategories: Option<Vec<String>>,
    pub icon: Option<String>,
}

/// Menu items and the categories they are filed under.
#[derive(Clone)]
pub struct MenuService {
    categories: CategoryStoreRef,
    menu: MenuStoreRef,
}

fn clean_name(raw: &str, what: &str) -> Result<String> {
    let name = raw.trim();
    if name.is_empty() {
        Err(PosError::validation(format!("{what} name is required")))
    } else {
        Ok(name.to_string())
    }
}

fn clean_subcategories(raw: Vec<String>) -> Vec<String> {
    let mut subs: Vec<String> = Vec::with_capacity(raw.len());
    for sub in raw {
        let sub = sub.trim();
        if !sub.is_empty() && !subs.iter().any(|s| s == sub) {
            subs.push(sub.to_string());
        }
    }
    subs
}

impl MenuService {
    pub fn new(categories: CategoryStoreRef, menu: MenuStoreRef) -> Self {
        Self { categories, menu }
    }

    /// Creates the stock categories that are missing. Returns how many were added.
    pub async fn ensure_default_categories(&self) -> Result<usize> {
        let mut created = 0;
        for category in default_categories() {
            if self.categories.find_by_name(&category.name).await?.is_none() {
                self.categories.create(category).await?;
                created += 1;
            }
        }
        if created > 0 {
            tracing::info!(created, "seeded default categories");
        }
        Ok(created)
    }

    pub async fn list_items(&self, filter: &MenuFilter) -> Result<Vec<MenuItem>> {
        Ok(self
            .menu
            .list()
            .await?
            .into_iter()
            .filter(|item| filter.matches(item))
            .collect())
    }

    pub async fn get_item(&self, id: u64) -> Result<MenuItem> {
        self.menu
            .get(id)
            .await?
            .ok_or_else(|| PosError::not_found("Menu item not found"))
    }

    pub async fn create_item(&self, mut item: NewMenuItem) -> Result<MenuItem> {
        item.name = item.name.trim().to_string();
        item.subcategory = item.subcategory.trim().to_string();
        item.image_url = item.image_url.trim().to_string();
        let category = self.categories.find_by_name(&item.category).await?;
        validate_item_fields(&item.name, &item.subcategory, &item.image_url, category.as_ref())?;
        validate_price(item.price)?;

        let created = self.menu.create(item).await?;
        tracing::info!(menu_id = created.id, category = %created.category, "menu item created");
        Ok(created)
    }

    pub async fn update_item(&self, id: u64, patch: MenuItemPatch) -> Result<MenuItem> {
        let mut item = self.get_item(id).await?;
        item.apply(patch, Utc::now());
        item.name = item.name.trim().to_string();

        let category = self.categories.find_by_name(&item.category).await?;
        validate_item_fields(&item.name, &item.subcategory, &item.image_url, category.as_ref())?;
        validate_price(item.price)?;

        self.menu.update(item.clone()).await?;
        Ok(item)
    }

    pub async fn delete_item(&self, id: u64) -> Result<()> {
        if self.menu.delete(id).await? {
            Ok(())
        } else {
            Err(PosError::not_found("Menu item not found"))
        }
    }

    pub async fn filters(&self) -> Result<MenuFilters> {
        Ok(MenuFilters::from_categories(&self.categories.list().await?))
    }

    pub async fn list_categories(&self) -> Result<Vec<Category>> {
        self.categories.list().await
    }

    async fn get_category(&self, id: u64) -> Result<Category> {
        self.categories
            .get(id)
            .await?
            .ok_or_else(|| PosError::not_found("Category not found"))
    }

    pub async fn create_category(&self, input: CategoryInput) -> Result<Category> {
        let name = clean_name(&input.name, "Category")?;
        if self.categories.find_by_name(&name).await?.is_some() {
            return Err(PosError::validation("Category already exists"));
        }
        self.categories
            .create(NewCategory {
                name,
                subcategories: clean_subcategories(input.subcategories),
                icon: input
                    .icon
                    .filter(|i| !i.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_ICON.to_string()),
            })
            .await
    }

    /// Renaming a category moves its menu items along with it.
    pub async fn update_category(&self, id: u64, patch: CategoryPatch) -> Result<Category> {
        let mut category = self.get_category(id).await?;

        if let Some(raw) = patch.name {
            let name = clean_name(&raw, "Category")?;
            if name != category.name {
                if self.categories.find_by_name(&name).await?.is_some() {
                    return Err(PosError::validation("Category already exists"));
                }
                let moved = self.menu.rename_category(&category.name, &name).await?;
                tracing::info!(from = %category.name, to = %name, moved, "category renamed");
                category.name = name;
            }
        }
        if let Some(subs) = patch.subcategories {
            category.subcategories = clean_subcategories(subs);
        }
        if let Some(icon) = patch.icon.filter(|i| !i.trim().is_empty()) {
            category.icon = icon;
        }

        self.categories.update(category.clone()).await?;
        Ok(category)
    }

    /// Deletes the category and every menu item filed under it.
    pub async fn delete_category(&self, id: u64) -> Result<u64> {
        let category = self.get_category(id).await?;
        let removed = self.menu.delete_by_category(&category.name, None).await?;
        self.categories.delete(id).await?;
        tracing::info!(category = %category.name, removed, "category deleted");
        Ok(removed)
    }

    pub async fn add_subcategory(&self, id: u64, name: &str) -> Result<Category> {
        let mut category = self.get_category(id).await?;
        let name = clean_name(name, "Subcategory")?;
        if category.has_subcategory(&name) {
            return Err(PosError::validation("Subcategory already exists"));
        }
        category.subcategories.push(name);
        self.categories.update(category.clone()).await?;
        Ok(category)
    }

    /// Removes the subcategory and the menu items filed under it.
    pub async fn remove_subcategory(&self, id: u64, name: &str) -> Result<Category> {
        let mut category = self.get_category(id).await?;
        if !category.has_subcategory(name) {
            return Err(PosError::not_found("Subcategory not found"));
        }
        let removed = self
            .menu
            .delete_by_category(&category.name, Some(name))
            .await?;
        category.subcategories.retain(|s| s != name);
        self.categories.update(category.clone()).await?;
        tracing::info!(category = %category.name, subcategory = name, removed, "subcategory removed");
        Ok(category)
    }
}
