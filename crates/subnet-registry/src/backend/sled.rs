//! Sled database backend for the subnet store

use super::{SubnetStore, SubnetUpdate};
use crate::{
    error::{Error, Result},
    models::SubnetRecord,
};
use async_trait::async_trait;
use std::path::Path;
use tracing::{debug, error, info};
use uuid::Uuid;

/// Sled-based subnet store
pub struct SledStore {
    /// Database instance
    db: sled::Db,
    /// Subnet records keyed by name
    subnets: sled::Tree,
    /// Secondary index: subnet id to name
    ids: sled::Tree,
}

impl SledStore {
    /// Create a new sled store
    pub async fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        // Ensure the directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        info!("Opening sled database at {:?}", path);

        let db = sled::open(path)?;
        let subnets = db.open_tree("subnets")?;
        let ids = db.open_tree("subnet_ids")?;

        Ok(Self { db, subnets, ids })
    }

    /// Create an in-memory sled store (for testing)
    pub async fn in_memory() -> Result<Self> {
        info!("Creating in-memory sled database");

        let db = sled::Config::new().temporary(true).open()?;
        let subnets = db.open_tree("subnets")?;
        let ids = db.open_tree("subnet_ids")?;

        Ok(Self { db, subnets, ids })
    }
}

#[async_trait]
impl SubnetStore for SledStore {
    async fn init(&self) -> Result<()> {
        // Flush to ensure database is ready
        self.db.flush_async().await?;
        Ok(())
    }

    async fn insert(&self, record: &SubnetRecord) -> Result<()> {
        debug!("Storing subnet: {}", record.name);

        if self.subnets.contains_key(record.name.as_bytes())? {
            return Err(Error::SubnetExists(record.name.clone()));
        }

        let value = serde_json::to_vec(record)?;
        self.subnets.insert(record.name.as_bytes(), value)?;
        self.ids
            .insert(record.id.as_bytes(), record.name.as_bytes())?;

        self.db.flush_async().await?;

        Ok(())
    }

    async fn load_by_name(&self, name: &str) -> Result<Option<SubnetRecord>> {
        debug!("Loading subnet: {}", name);

        match self.subnets.get(name.as_bytes())? {
            Some(bytes) => {
                let record: SubnetRecord = serde_json::from_slice(&bytes)?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    async fn load_by_id(&self, id: &Uuid) -> Result<Option<SubnetRecord>> {
        debug!("Loading subnet by id: {}", id);

        match self.ids.get(id.as_bytes())? {
            Some(name) => {
                let name = String::from_utf8_lossy(&name).into_owned();
                self.load_by_name(&name).await
            }
            None => Ok(None),
        }
    }

    async fn update(&self, name: &str, update: &SubnetUpdate) -> Result<()> {
        debug!("Updating subnet: {}", name);

        let mut record = self
            .load_by_name(name)
            .await?
            .ok_or_else(|| Error::NotFound(format!("subnet '{name}' vanished before update")))?;

        update.apply_to(&mut record);

        let value = serde_json::to_vec(&record)?;
        self.subnets.insert(name.as_bytes(), value)?;
        self.subnets.flush_async().await?;

        Ok(())
    }

    async fn remove(&self, name: &str) -> Result<Option<SubnetRecord>> {
        debug!("Removing subnet: {}", name);

        let existing = self.load_by_name(name).await?;

        if let Some(record) = &existing {
            self.subnets.remove(name.as_bytes())?;
            self.ids.remove(record.id.as_bytes())?;
            self.db.flush_async().await?;
        }

        Ok(existing)
    }

    async fn list(&self) -> Result<Vec<SubnetRecord>> {
        debug!("Listing all subnets");

        let mut subnets = Vec::new();

        for result in self.subnets.iter() {
            let (_, value) = result?;
            let record: SubnetRecord = serde_json::from_slice(&value)?;
            subnets.push(record);
        }

        Ok(subnets)
    }
}

impl Drop for SledStore {
    fn drop(&mut self) {
        // Attempt to flush on drop
        if let Err(e) = self.db.flush() {
            error!("Failed to flush database on drop: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::freelist::FreeList;
    use chrono::Utc;

    fn record(name: &str) -> SubnetRecord {
        SubnetRecord {
            id: Uuid::new_v4(),
            name: name.to_string(),
            base: u32::from(std::net::Ipv4Addr::new(10, 0, 0, 0)),
            prefix: 24,
            free_list: FreeList::with_range(1, 254).unwrap(),
            ns_hostname: "ns".to_string(),
            ns_offset: None,
            usage_links: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[smol_potat::test]
    async fn test_sled_store_basic() {
        let store = SledStore::in_memory().await.unwrap();
        store.init().await.unwrap();

        let subnet = record("cluster0");
        store.insert(&subnet).await.unwrap();

        // Duplicate names are rejected
        assert!(matches!(
            store.insert(&record("cluster0")).await,
            Err(Error::SubnetExists(_))
        ));

        let by_name = store.load_by_name("cluster0").await.unwrap().unwrap();
        assert_eq!(by_name.name, "cluster0");

        let by_id = store.load_by_id(&subnet.id).await.unwrap().unwrap();
        assert_eq!(by_id.name, "cluster0");

        let removed = store.remove("cluster0").await.unwrap();
        assert!(removed.is_some());
        assert!(store.load_by_name("cluster0").await.unwrap().is_none());
        assert!(store.load_by_id(&subnet.id).await.unwrap().is_none());
    }

    #[smol_potat::test]
    async fn test_sled_store_update() {
        let store = SledStore::in_memory().await.unwrap();
        store.init().await.unwrap();

        store.insert(&record("cluster0")).await.unwrap();

        let update = SubnetUpdate {
            ns_hostname: Some("controller".to_string()),
            ns_offset: Some(254),
            ..Default::default()
        };
        store.update("cluster0", &update).await.unwrap();

        let loaded = store.load_by_name("cluster0").await.unwrap().unwrap();
        assert_eq!(loaded.ns_hostname, "controller");
        assert_eq!(loaded.ns_offset, Some(254));
        // Untouched fields survive
        assert_eq!(loaded.prefix, 24);

        // Updating a vanished record is a distinct failure
        assert!(matches!(
            store.update("ghost", &update).await,
            Err(Error::NotFound(_))
        ));
    }

    #[smol_potat::test]
    async fn test_sled_store_persistence() {
        use tempfile::tempdir;

        let dir = tempdir().unwrap();
        let db_path = dir.path().join("subnets.db");

        {
            let store = SledStore::new(&db_path).await.unwrap();
            store.init().await.unwrap();

            for i in 0..3 {
                store.insert(&record(&format!("cluster{i}"))).await.unwrap();
            }
        }

        {
            let store = SledStore::new(&db_path).await.unwrap();
            store.init().await.unwrap();

            let subnets = store.list().await.unwrap();
            assert_eq!(subnets.len(), 3);

            let names: Vec<String> = subnets.iter().map(|s| s.name.clone()).collect();
            assert!(names.contains(&"cluster0".to_string()));
            assert!(names.contains(&"cluster2".to_string()));
        }
    }
}
