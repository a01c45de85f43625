use collab::{
    CodecError, Error,
    codec::{Codec, INT, TEXT},
    shared::{Content, MemoryDoc, Prelim, Scalar, SharedDoc},
};

use crate::helpers::*;

/// Encodes `alien()` and replaces one field's prelim before writing it.
fn corrupted_movie(doc: &MemoryDoc, field: &str, content: Content) -> MemoryNode {
    let Prelim::Map(mut fields) = MovieCodec.create_shared(&alien()).unwrap() else {
        panic!("Movie must be encoded as a map");
    };
    fields.insert(field.to_string(), content);
    materialize(doc, &Raw(Prelim::Map(fields)), "movie", &())
}

/// Codec writing a fixed prelim, used to plant malformed documents
struct Raw(Prelim);

impl Codec<()> for Raw {
    fn create_shared(&self, _: &()) -> collab::Result<Prelim> {
        Ok(self.0.clone())
    }

    fn update_shared<X: collab::shared::SharedTxn>(
        &self,
        _: &mut X,
        _: &collab::shared::NodeOf<X>,
        _: &(),
    ) -> collab::Result<()> {
        Ok(())
    }

    fn decode_shared<X: collab::shared::SharedTxn>(
        &self,
        _: &X,
        _: &collab::shared::NodeOf<X>,
    ) -> collab::Result<()> {
        Ok(())
    }
}

#[test]
fn test_out_of_range_genre_ordinal() {
    let doc = MemoryDoc::new();
    let genre = INT.create_shared(&7).unwrap();
    let node = corrupted_movie(&doc, "genre", genre.into());

    let err = decode(&doc, &MovieCodec, &node).unwrap_err();
    assert!(err.is_decode_mismatch());
    assert!(matches!(
        err,
        Error::Codec(CodecError::OrdinalOutOfRange { ordinal: 7, len: 4, .. })
    ));
}

#[test]
fn test_wrong_scalar_kind() {
    let doc = MemoryDoc::new();
    let rating = TEXT.create_shared(&"excellent".to_string()).unwrap();
    let node = corrupted_movie(&doc, "rating", rating.into());

    let err = decode(&doc, &MovieCodec, &node).unwrap_err();
    assert!(matches!(
        err,
        Error::Codec(CodecError::ScalarMismatch { expected: "float", .. })
    ));
}

#[test]
fn test_map_where_list_expected() {
    let doc = MemoryDoc::new();
    let node = corrupted_movie(&doc, "actors", Prelim::map().into());

    let err = decode(&doc, &MovieCodec, &node).unwrap_err();
    assert!(err.is_decode_mismatch());
    assert!(matches!(err, Error::Codec(CodecError::NodeMismatch { .. })));
}

#[test]
fn test_bare_scalar_where_node_expected() {
    let doc = MemoryDoc::new();
    let node = corrupted_movie(&doc, "title", Scalar::Text("Alien".to_string()).into());

    let err = decode(&doc, &MovieCodec, &node).unwrap_err();
    assert!(err.is_decode_mismatch());
}

#[test]
fn test_missing_nested_field() {
    let doc = MemoryDoc::new();
    let director = Prelim::map().with_entry("firstName", TEXT.create_shared(&"Ridley".to_string()).unwrap());
    let node = corrupted_movie(&doc, "director", director.into());

    let err = decode(&doc, &MovieCodec, &node).unwrap_err();
    assert!(err.is_not_found());
    assert!(matches!(
        err,
        Error::Codec(CodecError::MissingKey { ref key }) if key == "lastName"
    ));
}

#[test]
fn test_update_of_malformed_document_fails() {
    let doc = MemoryDoc::new();
    let node = corrupted_movie(&doc, "actors", Prelim::map().into());

    let err = doc
        .transact(&collab::Origin::default(), |txn| {
            MovieCodec.update_shared(txn, &node, &alien())
        })
        .unwrap_err();
    assert!(err.is_decode_mismatch());
}
