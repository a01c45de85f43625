use std::time::Duration;

use collab::{
    Store,
    codec::INT,
    shared::MemoryDoc,
    store::BoxError,
};
use tokio::sync::mpsc;

use crate::helpers::*;

#[tokio::test]
async fn test_handler_applies_events_in_order() {
    let store = Store::new(MemoryDoc::new(), INT, 0).unwrap();
    // Appends the event as a decimal digit; any reordering shows in the result
    let append = store.handle(|n: i64, digit: i64| async move { Ok(n * 10 + digit) });

    for digit in 1..=3 {
        append.call(digit).await.unwrap();
    }
    assert_eq!(wait_for(&store, |n| *n == 123).await, 123);
}

#[tokio::test]
async fn test_builtin_update_handler_replaces_value() {
    let store = Store::new(MemoryDoc::new(), MovieCodec, alien()).unwrap();

    let mut seen = alien();
    seen.watched = true;
    store.update().call(seen.clone()).await.unwrap();

    assert_eq!(wait_for(&store, |movie| movie.watched).await, seen);
}

#[tokio::test]
async fn test_failures_reach_error_handler_and_listener_continues() {
    let (errors, mut reported) = mpsc::unbounded_channel();
    let store = Store::builder(INT)
        .on_error(move |err| {
            let _ = errors.send((err.is_transformation_failure(), err.to_string()));
        })
        .create(MemoryDoc::new(), 0)
        .unwrap();

    let add = store.handle(|n: i64, by: i64| async move {
        if by < 0 {
            return Err::<i64, BoxError>(format!("cannot add {by}").into());
        }
        Ok(n + by)
    });

    add.call(-1).await.unwrap();
    add.call(5).await.unwrap();

    let (is_transformation, message) = tokio::time::timeout(Duration::from_secs(5), reported.recv())
        .await
        .expect("Timed out waiting for error report")
        .expect("Error handler dropped");
    assert!(is_transformation);
    assert!(message.contains("cannot add -1"));

    assert_eq!(wait_for(&store, |n| *n == 5).await, 5);
}

#[tokio::test]
async fn test_emitting_handler_publishes_events() {
    let store = Store::new(MemoryDoc::new(), MovieCodec, alien()).unwrap();
    let cast = store.handle_and_emit(|mut movie: Movie, actor: Person, emitter| async move {
        movie.actors.push(actor.clone());
        emitter.emit(format!("{} {} joined", actor.first_name, actor.last_name));
        Ok(movie)
    });
    let mut announcements = cast.subscribe();

    cast.call(person("Ian", "Holm")).await.unwrap();

    let announcement = tokio::time::timeout(Duration::from_secs(5), announcements.recv())
        .await
        .expect("Timed out waiting for emitted event")
        .unwrap();
    assert_eq!(announcement, "Ian Holm joined");

    let movie = wait_for(&store, |movie| movie.actors.len() == 4).await;
    assert_eq!(movie.actors[3], person("Ian", "Holm"));
}

#[tokio::test]
async fn test_listen_forwards_stream() {
    let store = Store::new(MemoryDoc::new(), INT, 0).unwrap();
    let add = store.handle(|n: i64, by: i64| async move { Ok(n + by) });

    let forwarder = add.listen(tokio_stream::iter(vec![1, 2, 3]));
    forwarder.await.unwrap();

    assert_eq!(wait_for(&store, |n| *n == 6).await, 6);
}

#[tokio::test]
async fn test_handler_stops_with_store() {
    let store = Store::new(MemoryDoc::new(), INT, 0).unwrap();
    let add = store.handle(|n: i64, by: i64| async move { Ok(n + by) });
    drop(store);

    // The listener notices the store is gone on the next event
    let _ = add.call(1).await;
    tokio::time::timeout(Duration::from_secs(5), async {
        while !add.is_closed() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("Handler listener did not stop");

    let err = add.call(2).await.unwrap_err();
    assert!(err.is_closed());
}
