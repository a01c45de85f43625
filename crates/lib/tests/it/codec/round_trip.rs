use collab::{
    codec::{Codec, INT, TEXT},
    shared::{MemoryDoc, MemoryOp, Prelim, SharedDoc, SharedTxn},
};

use crate::helpers::*;

#[test]
fn test_movie_round_trip() {
    let doc = MemoryDoc::with_op_log();
    let node = materialize(&doc, &MovieCodec, "movie", &alien());

    let decoded = decode(&doc, &MovieCodec, &node).expect("Failed to decode movie");
    assert_eq!(decoded, alien());
}

#[test]
fn test_prelim_uses_renamed_keys() {
    let Prelim::Map(fields) = PersonCodec
        .create_shared(&person("Ellen", "Ripley"))
        .expect("Failed to create prelim")
    else {
        panic!("Person must be encoded as a map");
    };
    let keys: Vec<&str> = fields.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["firstName", "lastName"]);
}

#[test]
fn test_genre_stored_as_ordinal() {
    let doc = MemoryDoc::with_op_log();
    let node = materialize(&doc, &GENRE, "genre", &Genre::Horror);

    // The enum node is a scalar wrapper holding the ordinal
    let ordinal = decode(&doc, &INT, &node).expect("Ordinal must decode as int");
    assert_eq!(ordinal, 2);
    assert_eq!(decode(&doc, &GENRE, &node).unwrap(), Genre::Horror);
}

#[test]
fn test_update_fidelity() {
    let doc = MemoryDoc::with_op_log();
    let node = materialize(&doc, &MovieCodec, "movie", &alien());

    let mut aliens = alien();
    aliens.title = "Aliens".to_string();
    aliens.director = person("James", "Cameron");
    aliens.actors = vec![person("Sigourney", "Weaver"), person("Michael", "Biehn")];
    aliens.rating = 8.4;
    aliens.released = 1986;
    aliens.genre = Genre::Action;
    aliens.watched = true;

    update(&doc, &MovieCodec, &node, &aliens);
    assert_eq!(decode(&doc, &MovieCodec, &node).unwrap(), aliens);
}

#[test]
fn test_update_preserves_node_identity() {
    let doc = MemoryDoc::with_op_log();
    let node = materialize(&doc, &MovieCodec, "movie", &alien());
    let map = *node.as_map().unwrap();

    let before = doc
        .read(|txn| Ok((txn.map_get(&map, "director"), txn.map_get(&map, "actors"))))
        .unwrap();

    let mut watched = alien();
    watched.watched = true;
    watched.director.first_name = "Sir Ridley".to_string();
    watched.actors.push(person("Ian", "Holm"));
    update(&doc, &MovieCodec, &node, &watched);

    let after = doc
        .read(|txn| Ok((txn.map_get(&map, "director"), txn.map_get(&map, "actors"))))
        .unwrap();
    assert_eq!(before, after);
    assert_eq!(decode(&doc, &MovieCodec, &node).unwrap(), watched);
}

#[test]
fn test_identical_update_writes_nothing() {
    let doc = MemoryDoc::with_op_log();
    let node = materialize(&doc, &MovieCodec, "movie", &alien());
    doc.take_ops().unwrap();

    update(&doc, &MovieCodec, &node, &alien());
    assert!(doc.take_ops().unwrap().is_empty());
}

#[test]
fn test_leaf_change_is_a_single_write() {
    let doc = MemoryDoc::with_op_log();
    let node = materialize(&doc, &MovieCodec, "movie", &alien());
    doc.take_ops().unwrap();

    let mut renamed = alien();
    renamed.actors[1].last_name = "Skerrit".to_string();
    update(&doc, &MovieCodec, &node, &renamed);

    let ops = doc.take_ops().unwrap();
    assert_eq!(ops.len(), 1);
    assert!(matches!(&ops[0], MemoryOp::MapSet { key, .. } if key.is_empty()));
}

#[test]
fn test_scalar_codecs_share_layout() {
    let doc = MemoryDoc::with_op_log();
    let node = materialize(&doc, &TEXT, "text", &"hello".to_string());
    update(&doc, &TEXT, &node, &String::new());
    assert_eq!(decode(&doc, &TEXT, &node).unwrap(), "");
}

mod catalog {
    #[derive(Debug, Clone, PartialEq)]
    pub struct Album {
        pub name: String,
        pub year: i64,
    }

    pub mod shelf {
        #[derive(Debug, Clone, PartialEq)]
        pub struct Slot {
            pub position: i64,
            pub album: super::Album,
        }
    }
}

collab::composite_codec! {
    struct AlbumCodec for catalog::Album {
        name: TEXT,
        year as "releaseYear": INT,
    }
}

collab::composite_codec! {
    struct ShelfSlotCodec for catalog::shelf::Slot {
        position: INT,
        album: AlbumCodec,
    }
}

#[test]
fn test_records_declared_in_nested_modules() {
    let doc = MemoryDoc::new();
    let slot = catalog::shelf::Slot {
        position: 3,
        album: catalog::Album {
            name: "Oxygène".to_string(),
            year: 1976,
        },
    };
    let node = materialize(&doc, &ShelfSlotCodec, "slot", &slot);
    assert_eq!(decode(&doc, &ShelfSlotCodec, &node).unwrap(), slot);

    let mut moved = slot.clone();
    moved.position = 4;
    moved.album.year = 1977;
    update(&doc, &ShelfSlotCodec, &node, &moved);
    assert_eq!(decode(&doc, &ShelfSlotCodec, &node).unwrap(), moved);
}
