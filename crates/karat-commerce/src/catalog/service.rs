//! Catalog operations: validate, persist, then notify subscribers.

use crate::catalog::{
    Category, CategoryIndex, CategoryNode, CategoryPatch, Item, ItemDetail, ItemPatch,
    ItemSuggestion, ItemView, Material, NewCategory, NewItem, NewMaterial,
};
use crate::error::CommerceError;
use crate::events::{ChangeEvent, EventBus};
use crate::ids::{CategoryId, ItemId, MaterialId};
use crate::money::Currency;
use crate::search::{ItemQuery, SortOption, AUTOCOMPLETE_LIMIT};
use crate::storage::Store;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

/// Category, material and item operations over a [`Store`].
///
/// Every successful write publishes the rebuilt category tree or the full
/// item listing on the [`EventBus`].
#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn Store>,
    events: EventBus,
    currency: Currency,
}

impl std::fmt::Debug for CatalogService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogService")
            .field("backend", &self.store.backend())
            .field("currency", &self.currency)
            .finish()
    }
}

impl CatalogService {
    pub fn new(store: Arc<dyn Store>, events: EventBus) -> Self {
        Self {
            store,
            events,
            currency: Currency::default(),
        }
    }

    pub fn with_currency(mut self, currency: Currency) -> Self {
        self.currency = currency;
        self
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    // ---- categories ----

    pub async fn add_category(&self, input: NewCategory) -> Result<Category, CommerceError> {
        input.validate()?;
        if let Some(parent_id) = &input.parent_id {
            if self.store.get_category(parent_id).await?.is_none() {
                return Err(CommerceError::validation(format!(
                    "Parent category {parent_id} does not exist"
                )));
            }
        }

        let category = input.into_category();
        self.store.insert_category(&category).await?;
        info!(category_id = %category.id, name = %category.name, "category added");

        self.broadcast_tree().await;
        Ok(category)
    }

    /// Apply a partial update. Moving a category under itself or one of its
    /// descendants is rejected.
    pub async fn update_category(
        &self,
        id: &CategoryId,
        patch: CategoryPatch,
    ) -> Result<Category, CommerceError> {
        patch.validate()?;
        let categories = self.store.list_categories().await?;
        let index = CategoryIndex::new(&categories);
        let mut category = index
            .get(id)
            .cloned()
            .ok_or_else(|| CommerceError::CategoryNotFound(id.to_string()))?;

        if let Some(Some(parent_id)) = &patch.parent_id {
            if !index.contains(parent_id) {
                return Err(CommerceError::validation(format!(
                    "Parent category {parent_id} does not exist"
                )));
            }
            if index.would_cycle(id, parent_id) {
                return Err(CommerceError::CategoryCycle(id.to_string()));
            }
        }

        category.apply(patch);
        if !self.store.update_category(&category).await? {
            return Err(CommerceError::CategoryNotFound(id.to_string()));
        }
        info!(category_id = %id, "category updated");

        self.broadcast_tree().await;
        Ok(category)
    }

    /// Delete a category and every transitive descendant in one operation.
    /// Returns how many categories were removed.
    pub async fn delete_category(&self, id: &CategoryId) -> Result<u64, CommerceError> {
        let categories = self.store.list_categories().await?;
        let index = CategoryIndex::new(&categories);
        if !index.contains(id) {
            return Err(CommerceError::CategoryNotFound(id.to_string()));
        }

        let doomed = index.descendants(id);
        let removed = self.store.delete_categories(&doomed).await?;
        info!(category_id = %id, removed, "category subtree deleted");

        self.broadcast_tree().await;
        Ok(removed)
    }

    pub async fn category_tree(&self) -> Result<Vec<CategoryNode>, CommerceError> {
        let categories = self.store.list_categories().await?;
        Ok(CategoryIndex::new(&categories).tree())
    }

    /// Names from the root down to `id`. Unknown ids give an empty path.
    pub async fn category_path(&self, id: &CategoryId) -> Result<Vec<String>, CommerceError> {
        let categories = self.store.list_categories().await?;
        Ok(CategoryIndex::new(&categories).path(id))
    }

    // ---- materials ----

    pub async fn list_materials(&self) -> Result<Vec<Material>, CommerceError> {
        self.store.list_materials().await
    }

    pub async fn get_material(&self, id: &MaterialId) -> Result<Material, CommerceError> {
        self.store
            .get_material(id)
            .await?
            .ok_or_else(|| CommerceError::MaterialNotFound(id.to_string()))
    }

    pub async fn add_material(&self, input: NewMaterial) -> Result<Material, CommerceError> {
        let material = input.into_material()?;
        self.store.insert_material(&material).await?;
        info!(material_id = %material.id, name = %material.name, "material added");
        Ok(material)
    }

    // ---- item queries ----

    pub async fn list_items(&self, sort: SortOption) -> Result<Vec<ItemView>, CommerceError> {
        self.query(ItemQuery::new().with_sort(sort)).await
    }

    /// Case-insensitive match on name or SKU. A blank query lists everything.
    pub async fn search(&self, text: &str) -> Result<Vec<ItemView>, CommerceError> {
        self.query(ItemQuery::new().with_text(text)).await
    }

    pub async fn query(&self, query: ItemQuery) -> Result<Vec<ItemView>, CommerceError> {
        let items = self.store.list_items().await?;
        Ok(query.apply(items).iter().map(ItemView::from).collect())
    }

    /// Up to ten items whose name contains `text`.
    pub async fn autocomplete(&self, text: &str) -> Result<Vec<ItemSuggestion>, CommerceError> {
        let needle = text.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }
        let items = self.store.list_items().await?;
        Ok(items
            .iter()
            .filter(|i| i.name.to_lowercase().contains(&needle))
            .take(AUTOCOMPLETE_LIMIT)
            .map(ItemSuggestion::from)
            .collect())
    }

    /// Items filed under `id` or any of its descendants.
    pub async fn items_by_category(
        &self,
        id: &CategoryId,
        sort: SortOption,
    ) -> Result<Vec<ItemView>, CommerceError> {
        let categories = self.store.list_categories().await?;
        let index = CategoryIndex::new(&categories);
        if !index.contains(id) {
            return Err(CommerceError::CategoryNotFound(id.to_string()));
        }
        let scope: HashSet<CategoryId> = index.descendants(id).into_iter().collect();

        let items: Vec<Item> = self
            .store
            .list_items()
            .await?
            .into_iter()
            .filter(|i| scope.contains(&i.category_id))
            .collect();
        Ok(ItemQuery::new()
            .with_sort(sort)
            .apply(items)
            .iter()
            .map(ItemView::from)
            .collect())
    }

    pub async fn get_item(&self, id: &ItemId) -> Result<Item, CommerceError> {
        self.store
            .get_item(id)
            .await?
            .ok_or_else(|| CommerceError::ItemNotFound(id.to_string()))
    }

    /// Item with its category name, parent and full path.
    pub async fn get_item_detail(&self, id: &ItemId) -> Result<ItemDetail, CommerceError> {
        let item = self.get_item(id).await?;
        let categories = self.store.list_categories().await?;
        let index = CategoryIndex::new(&categories);
        let category = index.get(&item.category_id);

        Ok(ItemDetail {
            item: ItemView::from(&item),
            category_name: category.map(|c| c.name.clone()),
            parent_id: category
                .and_then(|c| c.parent_id.as_ref())
                .map(|p| p.to_string()),
            full_category_path: index.path(&item.category_id),
        })
    }

    // ---- item writes ----

    pub async fn add_item(&self, input: NewItem) -> Result<Item, CommerceError> {
        let item = input.into_item(self.currency)?;
        self.check_references(&item.category_id, &item.material_id)
            .await?;

        self.store.insert_item(&item).await?;
        info!(item_id = %item.id, unique_id = %item.unique_id, "item added");

        self.broadcast_items().await;
        Ok(item)
    }

    pub async fn update_item(&self, id: &ItemId, patch: ItemPatch) -> Result<Item, CommerceError> {
        if patch.is_empty() {
            return Err(CommerceError::validation("No valid fields to update"));
        }
        let mut item = self.get_item(id).await?;
        item.apply(patch)?;
        self.check_references(&item.category_id, &item.material_id)
            .await?;

        if !self.store.update_item(&item).await? {
            return Err(CommerceError::ItemNotFound(id.to_string()));
        }
        info!(item_id = %id, "item updated");

        self.broadcast_items().await;
        Ok(item)
    }

    pub async fn delete_item(&self, id: &ItemId) -> Result<(), CommerceError> {
        if !self.store.delete_item(id).await? {
            return Err(CommerceError::ItemNotFound(id.to_string()));
        }
        info!(item_id = %id, "item deleted");

        self.broadcast_items().await;
        Ok(())
    }

    async fn check_references(
        &self,
        category_id: &CategoryId,
        material_id: &MaterialId,
    ) -> Result<(), CommerceError> {
        if self.store.get_category(category_id).await?.is_none() {
            return Err(CommerceError::validation(format!(
                "Invalid category_id: {category_id}"
            )));
        }
        if self.store.get_material(material_id).await?.is_none() {
            return Err(CommerceError::validation(format!(
                "Invalid material_id: {material_id}"
            )));
        }
        Ok(())
    }

    // ---- notifications ----

    /// Publish the current category tree. Load failures are logged, not returned.
    pub async fn broadcast_tree(&self) {
        match self.category_tree().await {
            Ok(tree) => {
                self.events.publish(ChangeEvent::CategoriesUpdated(tree));
            }
            Err(e) => warn!(error = %e, "could not load category tree for broadcast"),
        }
    }

    /// Publish the current item listing. Load failures are logged, not returned.
    pub async fn broadcast_items(&self) {
        match self.list_items(SortOption::Default).await {
            Ok(items) => {
                self.events.publish(ChangeEvent::ItemsUpdated(items));
            }
            Err(e) => warn!(error = %e, "could not load items for broadcast"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::FieldValue;
    use crate::storage::MemoryStore;

    fn service() -> CatalogService {
        CatalogService::new(Arc::new(MemoryStore::new()), EventBus::new(16))
    }

    async fn category(svc: &CatalogService, name: &str, parent: Option<&Category>) -> Category {
        let mut input = NewCategory::new(name);
        if let Some(parent) = parent {
            input = input.under(parent.id.clone());
        }
        svc.add_category(input).await.unwrap()
    }

    fn new_item(sku: &str, category: &Category, material: &Material) -> NewItem {
        NewItem {
            unique_id: Some(sku.to_string()),
            name: Some(format!("{sku} piece")),
            category_id: Some(category.id.clone()),
            material_id: Some(material.id.clone()),
            price: Some(FieldValue::from("100")),
            stock: Some(FieldValue::from(3)),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_add_category_requires_existing_parent() {
        let svc = service();
        let err = svc
            .add_category(NewCategory::new("Rings").under(CategoryId::new("nope")))
            .await
            .unwrap_err();
        assert!(matches!(err, CommerceError::ValidationError(_)));
    }

    #[tokio::test]
    async fn test_add_category_broadcasts_tree() {
        let svc = service();
        let mut rx = svc.events().subscribe();
        category(&svc, "Rings", None).await;

        match rx.recv().await.unwrap() {
            ChangeEvent::CategoriesUpdated(tree) => assert_eq!(tree.len(), 1),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_update_category_rejects_cycle() {
        let svc = service();
        let root = category(&svc, "Jewelry", None).await;
        let child = category(&svc, "Rings", Some(&root)).await;

        let patch = CategoryPatch {
            parent_id: Some(Some(child.id.clone())),
            ..Default::default()
        };
        let err = svc.update_category(&root.id, patch).await.unwrap_err();
        assert!(matches!(err, CommerceError::CategoryCycle(_)));

        let missing = svc
            .update_category(
                &CategoryId::new("ghost"),
                CategoryPatch {
                    name: Some("X".into()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(missing, Err(CommerceError::CategoryNotFound(_))));
    }

    #[tokio::test]
    async fn test_update_category_moves_to_root() {
        let svc = service();
        let root = category(&svc, "Jewelry", None).await;
        let child = category(&svc, "Rings", Some(&root)).await;

        let updated = svc
            .update_category(
                &child.id,
                CategoryPatch {
                    parent_id: Some(None),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(updated.is_root());
        assert_eq!(svc.category_tree().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_delete_category_removes_subtree_only() {
        let svc = service();
        let root = category(&svc, "Jewelry", None).await;
        let rings = category(&svc, "Rings", Some(&root)).await;
        category(&svc, "Bands", Some(&rings)).await;
        let watches = category(&svc, "Watches", None).await;

        assert_eq!(svc.delete_category(&root.id).await.unwrap(), 3);

        let tree = svc.category_tree().await.unwrap();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].id, watches.id);

        assert!(svc.delete_category(&root.id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_items_by_category_includes_descendants() {
        let svc = service();
        let gold = svc.add_material(NewMaterial::new("Gold")).await.unwrap();
        let root = category(&svc, "Jewelry", None).await;
        let rings = category(&svc, "Rings", Some(&root)).await;
        let watches = category(&svc, "Watches", None).await;

        svc.add_item(new_item("R-1", &rings, &gold)).await.unwrap();
        svc.add_item(new_item("J-1", &root, &gold)).await.unwrap();
        svc.add_item(new_item("W-1", &watches, &gold)).await.unwrap();

        let mut skus: Vec<String> = svc
            .items_by_category(&root.id, SortOption::Default)
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.unique_id)
            .collect();
        skus.sort();
        assert_eq!(skus, ["J-1", "R-1"]);

        let missing = svc
            .items_by_category(&CategoryId::new("ghost"), SortOption::Default)
            .await;
        assert!(matches!(missing, Err(CommerceError::CategoryNotFound(_))));
    }

    #[tokio::test]
    async fn test_add_item_checks_references() {
        let svc = service();
        let rings = category(&svc, "Rings", None).await;
        let ghost_material = Material {
            id: MaterialId::new("ghost"),
            name: "Ghost".into(),
        };
        let err = svc
            .add_item(new_item("R-1", &rings, &ghost_material))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid material_id: ghost");
    }

    #[tokio::test]
    async fn test_item_detail_carries_path() {
        let svc = service();
        let silver = svc.add_material(NewMaterial::new("Silver")).await.unwrap();
        let root = category(&svc, "Jewelry", None).await;
        let rings = category(&svc, "Rings", Some(&root)).await;
        let item = svc.add_item(new_item("R-1", &rings, &silver)).await.unwrap();

        let detail = svc.get_item_detail(&item.id).await.unwrap();
        assert_eq!(detail.category_name.as_deref(), Some("Rings"));
        assert_eq!(detail.parent_id, Some(root.id.to_string()));
        assert_eq!(detail.full_category_path, ["Jewelry", "Rings"]);
    }

    #[tokio::test]
    async fn test_update_and_delete_item() {
        let svc = service();
        let gold = svc.add_material(NewMaterial::new("Gold")).await.unwrap();
        let rings = category(&svc, "Rings", None).await;
        let item = svc.add_item(new_item("R-1", &rings, &gold)).await.unwrap();

        let patch: ItemPatch = serde_json::from_str(r#"{"price": "250.75", "stock": 9}"#).unwrap();
        let updated = svc.update_item(&item.id, patch).await.unwrap();
        assert_eq!(updated.price.amount_minor, 25_075);
        assert_eq!(updated.stock, 9);

        assert!(svc.update_item(&item.id, ItemPatch::default()).await.is_err());

        svc.delete_item(&item.id).await.unwrap();
        assert!(svc.delete_item(&item.id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_search_and_autocomplete() {
        let svc = service();
        let gold = svc.add_material(NewMaterial::new("Gold")).await.unwrap();
        let rings = category(&svc, "Rings", None).await;
        for n in 0..12 {
            svc.add_item(new_item(&format!("BAND-{n}"), &rings, &gold))
                .await
                .unwrap();
        }

        assert_eq!(svc.search("band-1").await.unwrap().len(), 3);
        assert_eq!(svc.search("").await.unwrap().len(), 12);
        assert_eq!(svc.autocomplete("piece").await.unwrap().len(), AUTOCOMPLETE_LIMIT);
        assert!(svc.autocomplete("  ").await.unwrap().is_empty());
    }
}
