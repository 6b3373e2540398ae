use chrono::{DateTime, Utc};
use redb::ReadableTable;
use serde::{Serialize, Deserialize};

use crate::api::CampsiteState;

use super::DbError;

pub(super) const CAMPSITE_TABLE: redb::TableDefinition<&str, &[u8]> = redb::TableDefinition::new("campsites");

/// Last known state of a campsite, possibly stale
#[derive(Debug,Serialize,Deserialize,Clone,PartialEq)]
pub struct CachedCampsite {
    pub state: CampsiteState,
    pub cached_at: DateTime<Utc>
}

pub struct CampsiteTable<'a> {
    pub(crate) db: &'a redb::Database
}

impl<'a> CampsiteTable<'a> {
    pub fn new(db: &'a redb::Database) -> Self {
        Self { db: db }
    }

    pub fn get(&self, campsite_id: &str) -> Result<Option<CachedCampsite>, DbError> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(CAMPSITE_TABLE)?;
        let rec = match table.get(campsite_id)? {
            None => None,
            Some(cbor) => Some(serde_cbor::from_slice(cbor.value())?)
        };
        Ok(rec)
    }

    pub fn list(&self) -> Result<Vec<(String, CachedCampsite)>, DbError> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(CAMPSITE_TABLE)?;
        let mut results = Vec::new();
        for entry in table.iter()? {
            let (key, cbor) = entry?;
            results.push((key.value().to_string(), serde_cbor::from_slice(cbor.value())?));
        }
        Ok(results)
    }

    /// update or create the cached state
    pub fn update(&self, campsite_id: &str, state: &CampsiteState) -> Result<(), DbError> {
        let rec = CachedCampsite {
            state: state.clone(),
            cached_at: Utc::now()
        };

        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(CAMPSITE_TABLE)?;
            table.insert(campsite_id, serde_cbor::to_vec(&rec)?.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }
}
