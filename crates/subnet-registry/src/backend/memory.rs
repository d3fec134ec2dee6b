//! In-memory backend for the subnet store

use super::{SubnetStore, SubnetUpdate};
use crate::{
    error::{Error, Result},
    models::SubnetRecord,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

/// In-memory subnet store
pub struct MemoryStore {
    /// Subnet records keyed by name
    subnets: RwLock<HashMap<String, SubnetRecord>>,
}

impl MemoryStore {
    /// Create a new in-memory store
    pub fn new() -> Self {
        Self {
            subnets: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SubnetStore for MemoryStore {
    async fn init(&self) -> Result<()> {
        // No initialization needed for in-memory store
        Ok(())
    }

    async fn insert(&self, record: &SubnetRecord) -> Result<()> {
        let mut subnets = self.subnets.write().unwrap();
        if subnets.contains_key(&record.name) {
            return Err(Error::SubnetExists(record.name.clone()));
        }
        subnets.insert(record.name.clone(), record.clone());
        Ok(())
    }

    async fn load_by_name(&self, name: &str) -> Result<Option<SubnetRecord>> {
        let subnets = self.subnets.read().unwrap();
        Ok(subnets.get(name).cloned())
    }

    async fn load_by_id(&self, id: &Uuid) -> Result<Option<SubnetRecord>> {
        let subnets = self.subnets.read().unwrap();
        Ok(subnets.values().find(|r| r.id == *id).cloned())
    }

    async fn update(&self, name: &str, update: &SubnetUpdate) -> Result<()> {
        let mut subnets = self.subnets.write().unwrap();
        let record = subnets
            .get_mut(name)
            .ok_or_else(|| Error::NotFound(format!("subnet '{name}' vanished before update")))?;
        update.apply_to(record);
        Ok(())
    }

    async fn remove(&self, name: &str) -> Result<Option<SubnetRecord>> {
        let mut subnets = self.subnets.write().unwrap();
        Ok(subnets.remove(name))
    }

    async fn list(&self) -> Result<Vec<SubnetRecord>> {
        let subnets = self.subnets.read().unwrap();
        Ok(subnets.values().cloned().collect())
    }
}
