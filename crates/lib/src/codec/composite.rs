//! Record codecs.
//!
//! A record is a shared map with one child node per field. Records are
//! declared with [`composite_codec!`](crate::composite_codec), which expands
//! to a unit struct implementing [`Codec`] by delegating every field to the
//! codec named next to it. The functions in this module are the expansion's
//! building blocks and are not meant to be called directly.

use std::collections::BTreeMap;

use super::{Codec, child_node};
use crate::{
    Result,
    shared::{Content, SharedTxn},
};

/// Declares a codec for a record type.
///
/// Each field is listed with the codec that encodes it. The shared map key
/// defaults to the field name and can be overridden with `as "key"`, which is
/// how documents shared with peers using other naming conventions are read.
///
/// The record is named by a plain path such as `Track` or `media::Track`;
/// generic records are not supported.
///
/// ```
/// use collab::{
///     codec::{Codec, INT, ListCodec, TEXT},
///     composite_codec,
/// };
///
/// #[derive(Debug, Clone, PartialEq)]
/// pub struct Track {
///     pub title: String,
///     pub length_secs: i64,
///     pub tags: Vec<String>,
/// }
///
/// composite_codec! {
///     /// Codec for [`Track`].
///     pub struct TrackCodec for Track {
///         title: TEXT,
///         length_secs as "lengthSecs": INT,
///         tags: ListCodec::new(TEXT),
///     }
/// }
///
/// let prelim = TrackCodec.create_shared(&Track {
///     title: "Intro".to_string(),
///     length_secs: 95,
///     tags: vec![],
/// })
/// .unwrap();
/// assert_eq!(prelim.kind(), collab::shared::NodeKind::Map);
/// ```
#[macro_export]
macro_rules! composite_codec {
    (@key $field:ident as $key:literal) => {
        $key
    };
    (@key $field:ident) => {
        ::core::stringify!($field)
    };
    (
        $(#[$meta:meta])*
        $vis:vis struct $codec:ident for $($record:ident)::+ {
            $( $field:ident $(as $key:literal)? : $field_codec:expr ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default)]
        $vis struct $codec;

        impl $crate::codec::Codec<$($record)::+> for $codec {
            fn create_shared(
                &self,
                value: &$($record)::+,
            ) -> $crate::Result<$crate::shared::Prelim> {
                let mut fields = ::std::collections::BTreeMap::new();
                $(
                    $crate::codec::composite::create_field(
                        &mut fields,
                        $crate::composite_codec!(@key $field $(as $key)?),
                        &$field_codec,
                        &value.$field,
                    )?;
                )+
                ::core::result::Result::Ok($crate::shared::Prelim::Map(fields))
            }

            fn update_shared<X: $crate::shared::SharedTxn>(
                &self,
                txn: &mut X,
                shared: &$crate::shared::NodeOf<X>,
                value: &$($record)::+,
            ) -> $crate::Result<()> {
                let map = $crate::codec::expect_map(shared)?;
                $(
                    $crate::codec::composite::update_field(
                        txn,
                        map,
                        $crate::composite_codec!(@key $field $(as $key)?),
                        &$field_codec,
                        &value.$field,
                    )?;
                )+
                ::core::result::Result::Ok(())
            }

            fn decode_shared<X: $crate::shared::SharedTxn>(
                &self,
                txn: &X,
                shared: &$crate::shared::NodeOf<X>,
            ) -> $crate::Result<$($record)::+> {
                let map = $crate::codec::expect_map(shared)?;
                ::core::result::Result::Ok($($record)::+ {
                    $(
                        $field: $crate::codec::composite::decode_field(
                            txn,
                            map,
                            $crate::composite_codec!(@key $field $(as $key)?),
                            &$field_codec,
                        )?,
                    )+
                })
            }
        }
    };
}

#[doc(hidden)]
pub fn create_field<T, C: Codec<T>>(
    fields: &mut BTreeMap<String, Content>,
    key: &str,
    codec: &C,
    value: &T,
) -> Result<()> {
    let prelim = codec.create_shared(value)?;
    fields.insert(key.to_string(), Content::Node(prelim));
    Ok(())
}

#[doc(hidden)]
pub fn update_field<X: SharedTxn, T, C: Codec<T>>(
    txn: &mut X,
    map: &X::Map,
    key: &str,
    codec: &C,
    value: &T,
) -> Result<()> {
    let child = child_node(txn, map, key)?;
    codec.update_shared(txn, &child, value)
}

#[doc(hidden)]
pub fn decode_field<X: SharedTxn, T, C: Codec<T>>(
    txn: &X,
    map: &X::Map,
    key: &str,
    codec: &C,
) -> Result<T> {
    let child = child_node(txn, map, key)?;
    codec.decode_shared(txn, &child)
}
