use collab::{
    Origin, SharedDoc,
    codec::{Codec, child_node},
    shared::{SharedTxn, YrsDoc},
};

use crate::helpers::*;

/// Writes `movie` as the root node "movie" of the map "movies".
fn publish_movie(doc: &YrsDoc, movie: &Movie) {
    let root = doc.get_map("movies").unwrap();
    let prelim = MovieCodec.create_shared(movie).unwrap();
    doc.transact(&Origin::new("writer"), |txn| {
        txn.map_set(&root, "movie", prelim.into())?;
        Ok(())
    })
    .unwrap();
}

fn read_movie(doc: &YrsDoc) -> collab::Result<Movie> {
    let root = doc.get_map("movies")?;
    doc.read(|txn| {
        let node = child_node(txn, &root, "movie")?;
        MovieCodec.decode_shared(txn, &node)
    })
}

fn edit_movie(doc: &YrsDoc, origin: &str, edit: impl FnOnce(&mut Movie)) {
    let mut movie = read_movie(doc).unwrap();
    edit(&mut movie);
    let root = doc.get_map("movies").unwrap();
    doc.transact(&Origin::new(origin), |txn| {
        let node = child_node(txn, &root, "movie")?;
        MovieCodec.update_shared(txn, &node, &movie)
    })
    .unwrap();
}

fn sync(from: &YrsDoc, to: &YrsDoc) {
    let state = from.encode_state().unwrap();
    to.apply_update(&Origin::new("sync"), &state).unwrap();
}

#[test]
fn test_full_state_replicates() {
    let writer = YrsDoc::new();
    let reader = YrsDoc::new();
    publish_movie(&writer, &alien());

    sync(&writer, &reader);
    assert_eq!(read_movie(&reader).unwrap(), alien());
}

#[test]
fn test_incremental_update_replicates() {
    let writer = YrsDoc::new();
    let reader = YrsDoc::new();
    publish_movie(&writer, &alien());
    sync(&writer, &reader);

    let mut updates = writer.subscribe();
    edit_movie(&writer, "writer", |movie| {
        movie.watched = true;
        movie.actors.push(person("Ian", "Holm"));
    });

    // One transaction publishes exactly one update
    let update = updates.try_recv().expect("Expected a document update");
    assert_eq!(update.origin.as_str(), "writer");
    assert!(updates.try_recv().is_err());

    reader
        .apply_update(&Origin::new("sync"), &update.update)
        .unwrap();
    let replicated = read_movie(&reader).unwrap();
    assert!(replicated.watched);
    assert_eq!(replicated.actors.len(), 4);
}

#[test]
fn test_concurrent_field_edits_merge() {
    let left = YrsDoc::new();
    let right = YrsDoc::new();
    publish_movie(&left, &alien());
    sync(&left, &right);

    edit_movie(&left, "left", |movie| movie.title = "Alien: Director's Cut".to_string());
    edit_movie(&right, "right", |movie| movie.rating = 9.0);

    sync(&left, &right);
    sync(&right, &left);

    let merged = read_movie(&left).unwrap();
    assert_eq!(merged, read_movie(&right).unwrap());
    assert_eq!(merged.title, "Alien: Director's Cut");
    assert_eq!(merged.rating, 9.0);
}

#[test]
fn test_unchanged_value_publishes_nothing() {
    let doc = YrsDoc::new();
    publish_movie(&doc, &alien());

    let mut updates = doc.subscribe();
    edit_movie(&doc, "writer", |_| {});
    assert!(updates.try_recv().is_err());
}
