use super::{scoped_key, RegistryStore};
use crate::types::{ClaimMutation, CommitmentStatus, UtilityRecord};
use anonclaim_types::{ClaimError, ClaimResult, FieldBytes, UtilityId, UINT256_SIZE};
use serde::{Deserialize, Serialize};
use sled::transaction::{ConflictableTransactionError, TransactionError};
use sled::{Db, Transactional, Tree};
use std::path::Path;
use tracing::{debug, info, warn};

const CURRENT_SCHEMA_VERSION: u32 = 1;
const SCHEMA_KEY: &[u8] = b"__schema_version__";
const CONSUMED: &[u8] = &[1];

#[derive(Clone, Debug, Serialize, Deserialize)]
struct SchemaInfo {
    version: u32,
    created_at: i64,
}

/// Registry state in a sled database: one tree of utility records plus the
/// per-utility nullifier and commitment sets.
pub struct SledStore {
    db: Db,
    schema: Tree,
    utilities: Tree,
    nullifiers: Tree,
    commitments: Tree,
}

impl SledStore {
    pub fn open(path: impl AsRef<Path>) -> ClaimResult<Self> {
        let path = path.as_ref();
        info!("Opening registry store at {:?}", path);

        let db = sled::Config::new()
            .path(path)
            .open()
            .map_err(|e| ClaimError::Storage(format!("Failed to open database: {}", e)))?;

        let store = Self::create_from_db(db)?;
        store.ensure_schema()?;
        info!(
            "Registry store opened ({} utilities, schema version {})",
            store.utilities.len(),
            CURRENT_SCHEMA_VERSION
        );
        Ok(store)
    }

    pub fn in_memory() -> ClaimResult<Self> {
        let db = sled::Config::new()
            .temporary(true)
            .open()
            .map_err(|e| ClaimError::Storage(format!("Failed to open temp database: {}", e)))?;

        let store = Self::create_from_db(db)?;
        store.ensure_schema()?;
        Ok(store)
    }

    fn create_from_db(db: Db) -> ClaimResult<Self> {
        Ok(Self {
            schema: Self::open_tree(&db, "schema")?,
            utilities: Self::open_tree(&db, "utilities")?,
            nullifiers: Self::open_tree(&db, "nullifiers")?,
            commitments: Self::open_tree(&db, "commitments")?,
            db,
        })
    }

    fn open_tree(db: &Db, name: &str) -> ClaimResult<Tree> {
        db.open_tree(name)
            .map_err(|e| ClaimError::Storage(format!("Failed to open {} tree: {}", name, e)))
    }

    fn ensure_schema(&self) -> ClaimResult<()> {
        let stored = self
            .schema
            .get(SCHEMA_KEY)
            .map_err(|e| ClaimError::Storage(format!("Failed to read schema: {}", e)))?;

        match stored {
            None => self.initialize_schema(),
            Some(bytes) => {
                let info: SchemaInfo = bincode::deserialize(&bytes)
                    .map_err(|e| ClaimError::Storage(format!("Failed to deserialize schema: {}", e)))?;
                if info.version != CURRENT_SCHEMA_VERSION {
                    return Err(ClaimError::Storage(format!(
                        "Database schema version {} is not supported (expected {})",
                        info.version, CURRENT_SCHEMA_VERSION
                    )));
                }
                Ok(())
            }
        }
    }

    fn initialize_schema(&self) -> ClaimResult<()> {
        info!("Initializing registry store with schema version {}", CURRENT_SCHEMA_VERSION);
        let info = SchemaInfo {
            version: CURRENT_SCHEMA_VERSION,
            created_at: chrono::Utc::now().timestamp(),
        };
        let bytes = bincode::serialize(&info)
            .map_err(|e| ClaimError::Storage(format!("Failed to serialize schema: {}", e)))?;
        self.schema
            .insert(SCHEMA_KEY, bytes)
            .map_err(|e| ClaimError::Storage(format!("Failed to store schema: {}", e)))?;
        self.flush()
    }

    pub fn flush(&self) -> ClaimResult<()> {
        self.db
            .flush()
            .map_err(|e| ClaimError::Storage(format!("Failed to flush: {}", e)))?;
        Ok(())
    }
}

impl RegistryStore for SledStore {
    fn utility(&self, id: &UtilityId) -> ClaimResult<Option<UtilityRecord>> {
        let stored = self
            .utilities
            .get(id.as_bytes())
            .map_err(|e| ClaimError::Storage(format!("Failed to read utility: {}", e)))?;
        stored
            .map(|bytes| {
                bincode::deserialize(&bytes)
                    .map_err(|e| ClaimError::Storage(format!("Failed to deserialize utility: {}", e)))
            })
            .transpose()
    }

    fn utility_ids(&self) -> ClaimResult<Vec<UtilityId>> {
        self.utilities
            .iter()
            .keys()
            .map(|key| {
                let key = key.map_err(|e| ClaimError::Storage(format!("Failed to scan utilities: {}", e)))?;
                <[u8; UINT256_SIZE]>::try_from(key.as_ref())
                    .map(UtilityId::from_bytes)
                    .map_err(|_| ClaimError::Storage("malformed utility key".into()))
            })
            .collect()
    }

    fn is_nullifier_consumed(&self, id: &UtilityId, nullifier: &FieldBytes) -> ClaimResult<bool> {
        self.nullifiers
            .contains_key(scoped_key(id, nullifier))
            .map_err(|e| ClaimError::Storage(format!("Failed to read nullifier: {}", e)))
    }

    fn commitment_status(
        &self,
        id: &UtilityId,
        commitment: &FieldBytes,
    ) -> ClaimResult<Option<CommitmentStatus>> {
        let stored = self
            .commitments
            .get(scoped_key(id, commitment))
            .map_err(|e| ClaimError::Storage(format!("Failed to read commitment: {}", e)))?;
        stored
            .map(|bytes| {
                bincode::deserialize(&bytes)
                    .map_err(|e| ClaimError::Storage(format!("Failed to deserialize commitment: {}", e)))
            })
            .transpose()
    }

    fn commit(&mut self, mutation: ClaimMutation) -> ClaimResult<()> {
        let id = mutation.record.id;
        let record = bincode::serialize(&mutation.record)
            .map_err(|e| ClaimError::Storage(format!("Failed to serialize utility: {}", e)))?;
        let nullifier = mutation.nullifier.map(|n| scoped_key(&id, &n));
        let commitment = mutation
            .commitment
            .map(|(c, status)| {
                bincode::serialize(&status)
                    .map(|bytes| (scoped_key(&id, &c), bytes))
                    .map_err(|e| ClaimError::Storage(format!("Failed to serialize commitment: {}", e)))
            })
            .transpose()?;

        let result = (&self.utilities, &self.nullifiers, &self.commitments).transaction(
            |(utilities, nullifiers, commitments)| {
                if let Some(key) = &nullifier {
                    if nullifiers.get(&key[..])?.is_some() {
                        return Err(ConflictableTransactionError::Abort(ClaimError::Storage(
                            "nullifier already consumed".into(),
                        )));
                    }
                    nullifiers.insert(&key[..], CONSUMED)?;
                }
                if let Some((key, status)) = &commitment {
                    commitments.insert(&key[..], status.as_slice())?;
                }
                utilities.insert(&id.as_bytes()[..], record.as_slice())?;
                Ok(())
            },
        );

        match result {
            Ok(()) => {
                debug!("Committed registry mutation for utility {}", id);
                settle_applied(&id, self.flush())
            }
            Err(TransactionError::Abort(e)) => Err(e),
            Err(TransactionError::Storage(e)) => {
                Err(ClaimError::Storage(format!("Failed to commit mutation: {}", e)))
            }
        }
    }
}

/// Runs after the transaction has applied. A failed flush leaves the mutation
/// in place, so it is logged and the commit still succeeds.
fn settle_applied(id: &UtilityId, flushed: ClaimResult<()>) -> ClaimResult<()> {
    if let Err(e) = flushed {
        warn!("Mutation for utility {} applied but not flushed: {}", id, e);
    }
    Ok(())
}
