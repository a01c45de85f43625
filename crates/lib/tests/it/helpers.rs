use std::time::Duration;

use collab::{
    Store,
    codec::{BOOL, Codec, EnumCodec, FLOAT, INT, ListCodec, TEXT},
    composite_codec,
    shared::{ArrayId, MapId, MemoryDoc, Origin, Shared, SharedDoc, SharedTxn},
};
use tokio_stream::StreamExt;

// ==========================
// TEST MODEL
// ==========================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Genre {
    Action,
    Drama,
    Horror,
    Unknown,
}

pub const GENRE: EnumCodec<Genre> = EnumCodec::new(
    "Genre",
    &[Genre::Action, Genre::Drama, Genre::Horror, Genre::Unknown],
);

#[derive(Debug, Clone, PartialEq)]
pub struct Person {
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Movie {
    pub title: String,
    pub director: Person,
    pub actors: Vec<Person>,
    pub rating: f64,
    pub released: i64,
    pub genre: Genre,
    pub watched: bool,
}

composite_codec! {
    /// Codec for [`Person`], using the key names of JavaScript peers.
    pub struct PersonCodec for Person {
        first_name as "firstName": TEXT,
        last_name as "lastName": TEXT,
    }
}

pub const PERSON_LIST: ListCodec<PersonCodec> = ListCodec::new(PersonCodec);

composite_codec! {
    pub struct MovieCodec for Movie {
        title: TEXT,
        director: PersonCodec,
        actors: PERSON_LIST,
        rating: FLOAT,
        released: INT,
        genre: GENRE,
        watched: BOOL,
    }
}

pub fn person(first_name: &str, last_name: &str) -> Person {
    Person {
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
    }
}

pub fn alien() -> Movie {
    Movie {
        title: "Alien".to_string(),
        director: person("Ridley", "Scott"),
        actors: vec![
            person("Sigourney", "Weaver"),
            person("Tom", "Skerritt"),
            person("John", "Hurt"),
        ],
        rating: 8.5,
        released: 1979,
        genre: Genre::Horror,
        watched: false,
    }
}

// ==========================
// DOCUMENT HELPERS
// ==========================

pub type MemoryNode = Shared<MapId, ArrayId>;

/// Writes `value` as a new node under `key` of the root map "test".
pub fn materialize<T, C: Codec<T>>(doc: &MemoryDoc, codec: &C, key: &str, value: &T) -> MemoryNode {
    let root = doc.get_map("test").expect("Failed to get root map");
    let prelim = codec.create_shared(value).expect("Failed to create prelim");
    doc.transact(&Origin::default(), |txn| {
        txn.map_set(&root, key, prelim.into())
    })
    .expect("Failed to insert prelim")
    .into_node()
    .expect("Inserted prelim is not a node")
}

/// Reconciles `node` with `value` in its own transaction.
pub fn update<T, C: Codec<T>>(doc: &MemoryDoc, codec: &C, node: &MemoryNode, value: &T) {
    doc.transact(&Origin::default(), |txn| codec.update_shared(txn, node, value))
        .expect("Failed to update node");
}

pub fn decode<T, C: Codec<T>>(doc: &MemoryDoc, codec: &C, node: &MemoryNode) -> collab::Result<T> {
    doc.read(|txn| codec.decode_shared(txn, node))
}

// ==========================
// STORE HELPERS
// ==========================

/// Waits until the store publishes a value matching `predicate`.
pub async fn wait_for<D, P>(store: &Store<D>, predicate: P) -> D
where
    D: Clone + Send + Sync + 'static,
    P: Fn(&D) -> bool,
{
    let mut data = store.data();
    let found = tokio::time::timeout(Duration::from_secs(5), async {
        while let Some(value) = data.next().await {
            if predicate(&value) {
                return Some(value);
            }
        }
        None
    })
    .await
    .expect("Timed out waiting for store value");
    found.expect("Store closed while waiting for value")
}
