//! In-process stores used when no database is configured, and by tests.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    auth::{
        repo::UserStore,
        repo_types::{NewUser, User},
    },
    error::StoreError,
    sweets::{
        repo::SweetStore,
        repo_types::{next_quantity, StockChange, Sweet, SweetFields},
    },
};

#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<Uuid, User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn count(&self) -> usize {
        self.users.read().await.len()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> anyhow::Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.username == username).cloned())
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.username == user.username) {
            return Err(StoreError::Conflict("username"));
        }
        if users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict("email"));
        }
        let created = User {
            id: Uuid::new_v4(),
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            is_staff: user.is_staff,
            date_joined: OffsetDateTime::now_utc(),
        };
        users.insert(created.id, created.clone());
        Ok(created)
    }
}

#[derive(Default)]
struct Catalog {
    last_id: i64,
    rows: BTreeMap<i64, Sweet>,
}

#[derive(Default)]
pub struct MemorySweetStore {
    catalog: RwLock<Catalog>,
}

impl MemorySweetStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn matches_term(sweet: &Sweet, term: &str) -> bool {
    let term = term.to_lowercase();
    sweet.name.to_lowercase().contains(&term)
        || sweet.category.to_lowercase().contains(&term)
        || sweet.price.to_string().contains(&term)
}

#[async_trait]
impl SweetStore for MemorySweetStore {
    async fn list(&self) -> anyhow::Result<Vec<Sweet>> {
        Ok(self.catalog.read().await.rows.values().cloned().collect())
    }

    async fn search(&self, terms: &[String]) -> anyhow::Result<Vec<Sweet>> {
        let catalog = self.catalog.read().await;
        Ok(catalog
            .rows
            .values()
            .filter(|s| terms.iter().all(|t| matches_term(s, t)))
            .cloned()
            .collect())
    }

    async fn get(&self, id: i64) -> anyhow::Result<Option<Sweet>> {
        Ok(self.catalog.read().await.rows.get(&id).cloned())
    }

    async fn create(&self, fields: SweetFields) -> anyhow::Result<Sweet> {
        let mut catalog = self.catalog.write().await;
        catalog.last_id += 1;
        let sweet = Sweet {
            id: catalog.last_id,
            name: fields.name,
            category: fields.category,
            price: fields.price,
            quantity_in_stock: fields.quantity_in_stock,
        };
        catalog.rows.insert(sweet.id, sweet.clone());
        Ok(sweet)
    }

    async fn update(&self, id: i64, fields: SweetFields) -> anyhow::Result<Option<Sweet>> {
        let mut catalog = self.catalog.write().await;
        let Some(row) = catalog.rows.get_mut(&id) else {
            return Ok(None);
        };
        row.name = fields.name;
        row.category = fields.category;
        row.price = fields.price;
        row.quantity_in_stock = fields.quantity_in_stock;
        Ok(Some(row.clone()))
    }

    async fn delete(&self, id: i64) -> anyhow::Result<bool> {
        Ok(self.catalog.write().await.rows.remove(&id).is_some())
    }

    async fn adjust_stock(&self, id: i64, delta: i32) -> anyhow::Result<StockChange> {
        // Check and write under one lock
        let mut catalog = self.catalog.write().await;
        let Some(row) = catalog.rows.get_mut(&id) else {
            return Ok(StockChange::NotFound);
        };
        match next_quantity(row.quantity_in_stock, delta) {
            Ok(quantity) => {
                row.quantity_in_stock = quantity;
                Ok(StockChange::Updated(row.clone()))
            }
            Err(rejected) => Ok(rejected),
        }
    }
}
