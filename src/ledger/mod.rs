/// Persistence layer for people and events
///
/// The ledger keeps two record collections:
///
/// - People: name, normalized email (unique business key), running point total
/// - Events: name, point delta, ordered participant ids, creation time
///
/// Events reference people; people hold no back-pointers. Participation is
/// answered through an index keyed by person id and event sequence, so the
/// newest events for a person come out of a reverse prefix scan.
///
/// ## Backends
///
/// - [`FjallStore`]: embedded LSM keyspace, the production backend
/// - [`MemoryStore`]: process-local maps for tests and throwaway sessions
///
/// Both implement [`LedgerStore`], the async boundary the engine is written
/// against.
///
/// ## Usage
///
/// ```rust,ignore
/// use scorekeeper::ledger::{FjallStore, LedgerStore};
///
/// let store = FjallStore::open("data/ledger")?;
/// let person = store.create_person("Alice", "alice@example.com").await?;
/// store.adjust_points(person.id, 5).await?;
/// ```

pub mod error;
pub mod memory;
pub mod models;
pub mod partitions;
pub mod store;
pub mod traits;

pub use error::{LedgerError, Result};
pub use memory::MemoryStore;
pub use models::{Event, EventId, Person, PersonId, normalize_email};
pub use store::{FjallStore, StoreStats};
pub use traits::LedgerStore;
