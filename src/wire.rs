//! The write acknowledgement protocol: pairing a write message with an
//! optional `getLastError` probe and decoding the probe's reply.
//!
//! This module owns no sockets. The transport (framing, connection
//! pooling, retry) lives behind the [`Connection`] seam; what this module
//! knows is *which* messages make up an acknowledged write and *how* the
//! probe reply maps to success or to the error taxonomy of
//! [`ErrorKind`](crate::error::ErrorKind): a malformed reply is a
//! [`CommandError`](crate::error::ErrorKind::CommandError), a non-writable
//! node is [`NotPrimaryOrRecovering`](crate::error::ErrorKind::NotPrimaryOrRecovering)
//! (retry elsewhere), and a logical write failure is a
//! [`WriteConcernError`](crate::error::ErrorKind::WriteConcernError).

use bson::{ Bson, Document };
use crate::error::{ Error, ErrorKind, Result };

/// The `w` component of a write concern: how many nodes (or which tagged
/// set of nodes) must acknowledge the write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum W {
    /// Acknowledgement by the given number of nodes.
    Nodes(i32),
    /// Acknowledgement by a majority of the replica set.
    Majority,
    /// Acknowledgement by nodes carrying the given custom write concern tag.
    Tagged(String),
}

impl From<&W> for Bson {
    fn from(w: &W) -> Self {
        match w {
            W::Nodes(nodes) => Bson::Int32(*nodes),
            W::Majority => Bson::String(String::from("majority")),
            W::Tagged(tag) => Bson::String(tag.clone()),
        }
    }
}

/// A write concern. Every component is optional; an unset component is
/// omitted from the probe and left to the server's defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteConcern {
    /// The acknowledgement requirement.
    pub w: Option<W>,
    /// Milliseconds to wait for the acknowledgement before timing out.
    pub wtimeout: Option<i64>,
    /// Whether to wait for the data to be flushed to disk.
    pub fsync: Option<bool>,
    /// Whether to wait for the journal commit.
    pub journal: Option<bool>,
}

impl WriteConcern {
    /// A write concern with every component unset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the acknowledgement requirement.
    pub fn w(mut self, w: W) -> Self {
        self.w = Some(w);
        self
    }

    /// Sets the acknowledgement timeout, in milliseconds.
    pub fn wtimeout(mut self, wtimeout: i64) -> Self {
        self.wtimeout = Some(wtimeout);
        self
    }

    /// Sets whether to wait for the filesystem sync.
    pub fn fsync(mut self, fsync: bool) -> Self {
        self.fsync = Some(fsync);
        self
    }

    /// Sets whether to wait for the journal commit.
    pub fn journal(mut self, journal: bool) -> Self {
        self.journal = Some(journal);
        self
    }

    /// Builds the `getLastError` probe command. Each write concern
    /// component appears in the command if and only if it was set.
    pub fn to_get_last_error(&self) -> Document {
        let mut command = doc!{ "getlasterror": 1 };

        if let Some(w) = &self.w {
            command.insert("w", w);
        }
        if let Some(wtimeout) = self.wtimeout {
            command.insert("wtimeout", wtimeout);
        }
        if let Some(fsync) = self.fsync {
            command.insert("fsync", fsync);
        }
        if let Some(journal) = self.journal {
            command.insert("j", journal);
        }

        command
    }
}

/// One logical write operation.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteAction {
    /// Insert the given documents.
    Insert {
        /// The documents to insert.
        documents: Vec<Document>,
    },
    /// Update documents matching a rendered filter.
    Update {
        /// The rendered filter selecting documents to update.
        selector: Document,
        /// The update specification.
        update: Document,
        /// Whether to insert if nothing matches.
        upsert: bool,
        /// Whether to update every match rather than the first one.
        multi: bool,
    },
    /// Delete documents matching a rendered filter.
    Delete {
        /// The rendered filter selecting documents to delete.
        selector: Document,
        /// 0 to delete every match, 1 to delete at most one document.
        limit: i32,
    },
}

/// A write operation addressed to a namespace.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteRequest {
    /// The `database.collection` namespace of the write.
    pub namespace: String,
    /// The operation itself.
    pub action: WriteAction,
}

/// One message of an outgoing batch.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// A write message.
    Write(WriteRequest),
    /// An acknowledgement probe query.
    Probe(Document),
}

/// The decoded reply to a probe query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reply {
    /// Whether the server flagged the query as failed.
    pub query_failure: bool,
    /// The returned documents.
    pub documents: Vec<Document>,
}

/// The transport seam: sends message batches and receives probe replies.
/// Implementations are free to be blocking sockets, in-memory fakes, or
/// adapters over an async runtime.
pub trait Connection {
    /// Sends a batch of messages over one connection, preserving order.
    fn send(&mut self, batch: &[Message]) -> Result<()>;

    /// Receives the reply to the most recently sent probe.
    fn receive(&mut self) -> Result<Reply>;
}

/// Executes one write, acknowledged if a write concern is given.
///
/// The write message and the conditional probe are sent as a single batch
/// on the connection. Without a write concern the call returns `Ok(None)`
/// as soon as the batch is sent; with one, it awaits exactly one reply
/// document and returns it after mapping the error conditions.
pub fn execute_write<C: Connection>(
    connection: &mut C,
    request: WriteRequest,
    concern: Option<&WriteConcern>,
) -> Result<Option<Document>> {
    let probe = concern.map(WriteConcern::to_get_last_error);
    let mut batch = vec![Message::Write(request)];

    if let Some(probe) = probe.clone() {
        batch.push(Message::Probe(probe));
    }

    connection.send(&batch)?;

    match probe {
        Some(probe) => process_probe_reply(connection.receive()?, &probe).map(Some),
        None => Ok(None),
    }
}

/// Maps a probe reply to the returned document or to an error.
fn process_probe_reply(reply: Reply, probe: &Document) -> Result<Document> {
    if reply.query_failure {
        return Err(Error::new(
            ErrorKind::CommandError,
            format!("probe command {} failed: query failure flag set", probe),
        ));
    }

    let count = reply.documents.len();
    let mut documents = reply.documents;
    let document = match (documents.pop(), documents.pop()) {
        (Some(document), None) => document,
        _ => return Err(Error::new(
            ErrorKind::CommandError,
            format!("probe command {} expected exactly 1 reply document, got {}", probe, count),
        )),
    };

    if !reply_ok(&document) {
        return Err(Error::new(
            ErrorKind::CommandError,
            format!("probe command {} failed: {}", probe, error_message(&document).unwrap_or("unknown error")),
        ));
    }

    let failure = error_message(&document).map(str::to_owned);

    match failure {
        Some(message) if indicates_not_primary(&document, &message) => Err(Error::new(
            ErrorKind::NotPrimaryOrRecovering,
            format!("server can't accept writes: {}", message),
        )),
        Some(message) => Err(Error::new(
            ErrorKind::WriteConcernError,
            format!("write failed: {}", message),
        )),
        None => Ok(document),
    }
}

/// Whether a reply's `ok` field signals success. The server historically
/// sends it as the double `1.0`; any nonzero number or `true` counts, and a
/// missing `ok` counts as failure.
fn reply_ok(reply: &Document) -> bool {
    match reply.get("ok") {
        Some(Bson::Boolean(ok)) => *ok,
        Some(Bson::Int32(n)) => *n != 0,
        Some(Bson::Int64(n)) => *n != 0,
        Some(Bson::Double(x)) => *x != 0.0,
        _ => false,
    }
}

/// The logical write error reported in a reply, if any. The legacy reply
/// shape puts it under `err` (explicitly `null` on success); command-style
/// failures use `errmsg`.
fn error_message(reply: &Document) -> Option<&str> {
    match reply.get("err") {
        Some(Bson::String(message)) => Some(message),
        _ => match reply.get("errmsg") {
            Some(Bson::String(message)) => Some(message),
            _ => None,
        },
    }
}

/// Server error codes reported by nodes that can't currently accept
/// writes: stepped-down primaries, recovering or shut-down members.
static NOT_PRIMARY_CODES: &[i32] = &[91, 189, 10058, 10107, 11600, 11602, 13435, 13436];

/// Whether a reply describes a non-writable node rather than a failed write.
fn indicates_not_primary(reply: &Document, message: &str) -> bool {
    if let Ok(code) = reply.get_i32("code") {
        if NOT_PRIMARY_CODES.contains(&code) {
            return true;
        }
    }

    message.contains("not master") || message.contains("node is recovering")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_last_error_includes_components_iff_set() {
        assert_eq!(WriteConcern::new().to_get_last_error(),
                   doc!{ "getlasterror": 1 });

        let full = WriteConcern::new()
            .w(W::Majority)
            .wtimeout(2500)
            .fsync(false)
            .journal(true);

        assert_eq!(full.to_get_last_error(), doc!{
            "getlasterror": 1,
            "w": "majority",
            "wtimeout": 2500_i64,
            "fsync": false,
            "j": true,
        });

        let partial = WriteConcern::new().w(W::Nodes(2));
        assert_eq!(partial.to_get_last_error(), doc!{
            "getlasterror": 1,
            "w": 2,
        });
    }

    #[test]
    fn reply_ok_accepts_boolean_and_nonzero_numbers() {
        assert!(reply_ok(&doc!{ "ok": 1 }));
        assert!(reply_ok(&doc!{ "ok": 1.0 }));
        assert!(reply_ok(&doc!{ "ok": true }));
        assert!(reply_ok(&doc!{ "ok": -1_i64 }));

        assert!(!reply_ok(&doc!{ "ok": 0.0 }));
        assert!(!reply_ok(&doc!{ "ok": false }));
        assert!(!reply_ok(&doc!{ "ok": "yes" }));
        assert!(!reply_ok(&doc!{ "n": 1 }));
    }

    #[test]
    fn reply_error_mapping() {
        let probe = doc!{ "getlasterror": 1 };

        let ok = process_probe_reply(Reply {
            query_failure: false,
            documents: vec![doc!{ "ok": 1, "err": null, "n": 1 }],
        }, &probe);
        assert_eq!(ok.ok(), Some(doc!{ "ok": 1, "err": null, "n": 1 }));

        let too_many = process_probe_reply(Reply {
            query_failure: false,
            documents: vec![doc!{ "ok": 1 }, doc!{ "ok": 1 }],
        }, &probe);
        assert_eq!(too_many.map_err(|e| e.kind()), Err(ErrorKind::CommandError));

        let stepped_down = process_probe_reply(Reply {
            query_failure: false,
            documents: vec![doc!{ "ok": 1, "err": "not master", "code": 10107 }],
        }, &probe);
        assert_eq!(stepped_down.map_err(|e| e.kind()),
                   Err(ErrorKind::NotPrimaryOrRecovering));

        let write_error = process_probe_reply(Reply {
            query_failure: false,
            documents: vec![doc!{ "ok": 1, "err": "E11000 duplicate key", "code": 11000 }],
        }, &probe);
        assert_eq!(write_error.map_err(|e| e.kind()),
                   Err(ErrorKind::WriteConcernError));
    }
}
