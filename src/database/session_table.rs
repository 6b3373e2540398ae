use redb::ReadableTable;

use crate::auth::AuthSession;

use super::DbError;

pub(super) const SESSION_TABLE: redb::TableDefinition<&str, &[u8]> = redb::TableDefinition::new("session");

const CURRENT: &str = "current";

/// Persisted sign-in, at most one
pub struct SessionTable<'a> {
    pub(crate) db: &'a redb::Database
}

impl<'a> SessionTable<'a> {
    pub fn new(db: &'a redb::Database) -> Self {
        Self { db: db }
    }

    pub fn load(&self) -> Result<Option<AuthSession>, DbError> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(SESSION_TABLE)?;
        let session = match table.get(CURRENT)? {
            None => None,
            Some(cbor) => Some(serde_cbor::from_slice(cbor.value())?)
        };
        Ok(session)
    }

    pub fn store(&self, session: &AuthSession) -> Result<(), DbError> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(SESSION_TABLE)?;
            table.insert(CURRENT, serde_cbor::to_vec(session)?.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    /// Returns whether a session was present
    pub fn clear(&self) -> Result<bool, DbError> {
        let existed;
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(SESSION_TABLE)?;
            existed = table.remove(CURRENT)?.is_some();
        }
        txn.commit()?;
        Ok(existed)
    }
}

#[cfg(test)]
mod tests {
    use crate::api::{Role, User};
    use crate::database::{Database, test_support::temp_db};

    use super::*;

    #[test]
    fn store_load_clear() {
        let (_dir, re_db) = temp_db();
        let mut db = Database::new(&re_db);
        db.init().unwrap();

        assert!(db.session.load().unwrap().is_none());

        let session = AuthSession {
            token: "jwt".to_string(),
            user: User { id: "u1".to_string(), name: "Ivo".to_string(), email: "ivo@camp.hr".to_string(), role: Role::Admin }
        };
        db.session.store(&session).unwrap();
        assert_eq!(db.session.load().unwrap(), Some(session));

        assert!(db.session.clear().unwrap());
        assert!(!db.session.clear().unwrap());
        assert!(db.session.load().unwrap().is_none());
    }
}
