use self::{campsite_table::{CampsiteTable, CAMPSITE_TABLE}, session_table::{SessionTable, SESSION_TABLE}};

pub mod campsite_table;
pub mod session_table;

pub type DbError = Box<dyn std::error::Error + Send + Sync>;

pub struct Database<'a> {
    pub(crate) inner_db: &'a redb::Database,
    pub session: SessionTable<'a>,
    pub campsites: CampsiteTable<'a>,
}

impl<'a> Database<'a> {
    pub fn new(re_db: &'a redb::Database) -> Self {
        Self {
            inner_db: re_db,
            session: SessionTable::new(re_db),
            campsites: CampsiteTable::new(re_db),
        }
    }

    /// Create missing tables, so that read transactions never hit an absent table
    pub fn init(&mut self) -> Result<(), DbError> {
        let txn = self.inner_db.begin_write()?;
        {
            let _session_table = txn.open_table(SESSION_TABLE)?;
            let _campsite_table = txn.open_table(CAMPSITE_TABLE)?;
        }
        txn.commit()?;

        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    pub fn temp_db() -> (tempfile::TempDir, redb::Database) {
        let dir = tempfile::tempdir().unwrap();
        let db = redb::Database::create(dir.path().join("campctl.redb")).unwrap();
        (dir, db)
    }
}
