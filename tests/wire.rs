//! Integration tests for the write acknowledgement protocol: batch
//! composition, write concern probes, and reply decoding, exercised over an
//! in-memory connection.

#[macro_use]
extern crate bson;
extern crate mango;

use mango::prelude::*;
use mango::wire::{ execute_write, Message, Reply, WriteAction };

/// An in-memory transport that records batches and plays back replies.
#[derive(Debug, Default)]
struct FakeConnection {
    /// Every batch sent, in order.
    sent: Vec<Vec<Message>>,
    /// Replies played back in reverse order of insertion.
    replies: Vec<Reply>,
}

impl Connection for FakeConnection {
    fn send(&mut self, batch: &[Message]) -> MangoResult<()> {
        self.sent.push(batch.to_vec());
        Ok(())
    }

    fn receive(&mut self) -> MangoResult<Reply> {
        self.replies.pop().ok_or_else(|| {
            MangoError::new(ErrorKind::CommandError, "no reply queued")
        })
    }
}

/// A deletion of everything matching `x > 1`, filter rendered for real.
fn delete_request() -> MangoResult<WriteRequest> {
    let selector = Filter::<()>::gt("x", 1)
        .render(&EmptySchema, &EncoderRegistry::new())?;

    Ok(WriteRequest {
        namespace: String::from("mango_test.items"),
        action: WriteAction::Delete { selector, limit: 0 },
    })
}

#[test]
fn unacknowledged_writes_send_one_message() -> MangoResult<()> {
    let mut connection = FakeConnection::default();

    let outcome = execute_write(&mut connection, delete_request()?, None)?;

    assert_eq!(outcome, None);
    assert_eq!(connection.sent.len(), 1);
    assert_eq!(connection.sent[0], vec![Message::Write(delete_request()?)]);

    Ok(())
}

#[test]
fn acknowledged_writes_batch_the_probe() -> MangoResult<()> {
    let mut connection = FakeConnection {
        sent: Vec::new(),
        replies: vec![Reply {
            query_failure: false,
            documents: vec![doc!{ "ok": 1, "err": null, "n": 3 }],
        }],
    };

    let concern = WriteConcern::new().w(W::Nodes(2)).wtimeout(1000);
    let outcome = execute_write(&mut connection, delete_request()?, Some(&concern))?;

    assert_eq!(outcome, Some(doc!{ "ok": 1, "err": null, "n": 3 }));
    assert_eq!(connection.sent.len(), 1);
    assert_eq!(connection.sent[0], vec![
        Message::Write(delete_request()?),
        Message::Probe(doc!{
            "getlasterror": 1,
            "w": 2,
            "wtimeout": 1000_i64,
        }),
    ]);

    Ok(())
}

#[test]
fn probe_components_appear_iff_set() -> MangoResult<()> {
    assert_eq!(WriteConcern::new().to_get_last_error(),
               doc!{ "getlasterror": 1 });
    assert_eq!(WriteConcern::new().journal(true).to_get_last_error(),
               doc!{ "getlasterror": 1, "j": true });
    assert_eq!(WriteConcern::new().fsync(true).wtimeout(250).to_get_last_error(),
               doc!{ "getlasterror": 1, "wtimeout": 250_i64, "fsync": true });
    assert_eq!(WriteConcern::new().w(W::Majority).to_get_last_error(),
               doc!{ "getlasterror": 1, "w": "majority" });
    assert_eq!(WriteConcern::new().w(W::Tagged(String::from("rack-1"))).to_get_last_error(),
               doc!{ "getlasterror": 1, "w": "rack-1" });

    Ok(())
}

#[test]
fn malformed_replies_are_command_errors() -> MangoResult<()> {
    let concern = WriteConcern::new().w(W::Nodes(1));

    // zero reply documents
    let mut connection = FakeConnection {
        sent: Vec::new(),
        replies: vec![Reply { query_failure: false, documents: Vec::new() }],
    };
    let error = execute_write(&mut connection, delete_request()?, Some(&concern))
        .map(|_| ())
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::CommandError);
    assert!(error.message().contains("getlasterror"));

    // more than one reply document
    let mut connection = FakeConnection {
        sent: Vec::new(),
        replies: vec![Reply {
            query_failure: false,
            documents: vec![doc!{ "ok": 1 }, doc!{ "ok": 1 }],
        }],
    };
    let error = execute_write(&mut connection, delete_request()?, Some(&concern))
        .map(|_| ())
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::CommandError);

    // the query failure flag
    let mut connection = FakeConnection {
        sent: Vec::new(),
        replies: vec![Reply {
            query_failure: true,
            documents: vec![doc!{ "$err": "cursor exhausted" }],
        }],
    };
    let error = execute_write(&mut connection, delete_request()?, Some(&concern))
        .map(|_| ())
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::CommandError);

    Ok(())
}

#[test]
fn non_writable_nodes_map_to_their_own_kind() -> MangoResult<()> {
    let concern = WriteConcern::new().w(W::Nodes(1));

    for reply in [
        doc!{ "ok": 1, "err": "not master" },
        doc!{ "ok": 1, "err": "node is recovering" },
        doc!{ "ok": 1, "err": "stepped down", "code": 189 },
    ] {
        let mut connection = FakeConnection {
            sent: Vec::new(),
            replies: vec![Reply { query_failure: false, documents: vec![reply] }],
        };
        let error = execute_write(&mut connection, delete_request()?, Some(&concern))
            .map(|_| ())
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::NotPrimaryOrRecovering);
    }

    Ok(())
}

#[test]
fn logical_write_errors_map_to_write_concern_errors() -> MangoResult<()> {
    let concern = WriteConcern::new().w(W::Nodes(2)).wtimeout(10);

    let mut connection = FakeConnection {
        sent: Vec::new(),
        replies: vec![Reply {
            query_failure: false,
            documents: vec![doc!{
                "ok": 1,
                "err": "waiting for replication timed out",
                "wtimeout": true,
            }],
        }],
    };

    let error = execute_write(&mut connection, delete_request()?, Some(&concern))
        .map(|_| ())
        .unwrap_err();

    assert_eq!(error.kind(), ErrorKind::WriteConcernError);
    assert!(error.message().contains("waiting for replication timed out"));

    Ok(())
}
