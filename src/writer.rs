//! A streaming writer over the in-memory BSON tree.
//!
//! The renderer emits filter documents by interleaving path/operator names
//! with encoded values instead of gluing pre-built sub-documents together.
//! `DocumentWriter` is the tool for that: it keeps a stack of open containers
//! and enforces that begin/end calls stay balanced and that every value
//! inside a document is preceded by exactly one name. A writer that is
//! dropped mid-document simply discards its buffers; a partial document can
//! never be observed by the caller.

use bson::{ Bson, Document };
use crate::error::{ Error, ErrorKind, Result };

/// A currently open container on the writer stack.
#[derive(Debug)]
enum Frame {
    /// An open document, with the name awaiting its value, if any.
    Document {
        /// The document buffer.
        doc: Document,
        /// A name written via `write_name` whose value has not arrived yet.
        pending_name: Option<String>,
    },
    /// An open array.
    Array {
        /// The elements collected so far.
        items: Vec<Bson>,
    },
}

/// Streaming writer producing a single root [`Document`].
///
/// ```
/// # use mango::writer::DocumentWriter;
/// # use mango::error::Result;
/// # use bson::doc;
/// #
/// # fn main() -> Result<()> {
/// let mut writer = DocumentWriter::new();
/// writer.begin_document()?;
/// writer.write_name("qty")?;
/// writer.begin_document()?;
/// writer.write_name("$gt")?;
/// writer.write_bson(5)?;
/// writer.end_document()?;
/// writer.end_document()?;
///
/// assert_eq!(writer.finish()?, doc! { "qty": { "$gt": 5 } });
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct DocumentWriter {
    /// The stack of open containers; index 0 is the root document.
    stack: Vec<Frame>,
    /// The completed root document once the outermost frame is closed.
    root: Option<Document>,
}

impl DocumentWriter {
    /// Creates a writer with no open containers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a document: the root if none is open yet, otherwise a
    /// sub-document in the current name or array slot.
    pub fn begin_document(&mut self) -> Result<()> {
        if self.stack.is_empty() && self.root.is_some() {
            return Err(state_error("begin_document called after the root document was closed"));
        }

        self.stack.push(Frame::Document { doc: Document::new(), pending_name: None });

        Ok(())
    }

    /// Closes the innermost open document.
    pub fn end_document(&mut self) -> Result<()> {
        match self.stack.pop() {
            Some(Frame::Document { doc, pending_name: None }) => self.attach(Bson::Document(doc)),
            Some(frame @ Frame::Document { .. }) => {
                self.stack.push(frame);
                Err(state_error("end_document called while a name is awaiting its value"))
            }
            Some(frame @ Frame::Array { .. }) => {
                self.stack.push(frame);
                Err(state_error("end_document called while an array is open"))
            }
            None => Err(state_error("end_document called with no open document")),
        }
    }

    /// Opens an array in the current name or array slot.
    pub fn begin_array(&mut self) -> Result<()> {
        if self.stack.is_empty() {
            return Err(state_error("an array cannot be the root of a filter document"));
        }

        self.stack.push(Frame::Array { items: Vec::new() });

        Ok(())
    }

    /// Closes the innermost open array.
    pub fn end_array(&mut self) -> Result<()> {
        match self.stack.pop() {
            Some(Frame::Array { items }) => self.attach(Bson::Array(items)),
            Some(frame @ Frame::Document { .. }) => {
                self.stack.push(frame);
                Err(state_error("end_array called while a document is open"))
            }
            None => Err(state_error("end_array called with no open array")),
        }
    }

    /// Declares the name of the next value in the innermost open document.
    pub fn write_name<S: Into<String>>(&mut self, name: S) -> Result<()> {
        match self.stack.last_mut() {
            Some(Frame::Document { pending_name: pending @ None, .. }) => {
                *pending = Some(name.into());
                Ok(())
            }
            Some(Frame::Document { .. }) => {
                Err(state_error("two names written without a value in between"))
            }
            Some(Frame::Array { .. }) => Err(state_error("write_name called inside an array")),
            None => Err(state_error("write_name called with no open document")),
        }
    }

    /// Writes a value into the current name or array slot.
    pub fn write_bson<B: Into<Bson>>(&mut self, value: B) -> Result<()> {
        if self.stack.is_empty() {
            return Err(state_error("a bare value cannot be the root of a filter document"));
        }

        self.attach(value.into())
    }

    /// Consumes the writer, returning the root document.
    /// Fails if any container is still open or nothing has been written.
    pub fn finish(self) -> Result<Document> {
        if !self.stack.is_empty() {
            return Err(state_error("finish called with open containers remaining"));
        }

        self.root.ok_or_else(|| state_error("finish called before any document was written"))
    }

    /// Files a completed value under the enclosing container, or as the root.
    fn attach(&mut self, value: Bson) -> Result<()> {
        match self.stack.last_mut() {
            Some(Frame::Document { doc, pending_name }) => match pending_name.take() {
                Some(name) => {
                    doc.insert(name, value);
                    Ok(())
                }
                None => Err(state_error("value written without a preceding name")),
            },
            Some(Frame::Array { items }) => {
                items.push(value);
                Ok(())
            }
            None => match value {
                Bson::Document(doc) => {
                    self.root = Some(doc);
                    Ok(())
                }
                _ => Err(state_error("the root of a filter document must be a document")),
            },
        }
    }
}

/// Constructs an `InvalidWriterState` error.
fn state_error(message: &'static str) -> Error {
    Error::new(ErrorKind::InvalidWriterState, message)
}

#[cfg(test)]
mod tests {
    use crate::error::{ ErrorKind, Result };
    use super::DocumentWriter;

    #[test]
    fn writes_nested_containers() -> Result<()> {
        let mut writer = DocumentWriter::new();
        writer.begin_document()?;
        writer.write_name("tags")?;
        writer.begin_document()?;
        writer.write_name("$in")?;
        writer.begin_array()?;
        writer.write_bson("red")?;
        writer.write_bson("green")?;
        writer.end_array()?;
        writer.end_document()?;
        writer.end_document()?;

        assert_eq!(writer.finish()?, doc! {
            "tags": { "$in": ["red", "green"] }
        });

        Ok(())
    }

    #[test]
    fn rejects_value_without_name() -> Result<()> {
        let mut writer = DocumentWriter::new();
        writer.begin_document()?;

        assert_eq!(writer.write_bson(1).unwrap_err().kind(),
                   ErrorKind::InvalidWriterState);

        Ok(())
    }

    #[test]
    fn rejects_unbalanced_finish() -> Result<()> {
        let mut writer = DocumentWriter::new();
        writer.begin_document()?;
        writer.write_name("x")?;
        writer.begin_document()?;

        assert_eq!(writer.finish().unwrap_err().kind(),
                   ErrorKind::InvalidWriterState);

        Ok(())
    }

    #[test]
    fn rejects_array_root() {
        let mut writer = DocumentWriter::new();

        assert_eq!(writer.begin_array().unwrap_err().kind(),
                   ErrorKind::InvalidWriterState);
    }

    #[test]
    fn rejects_dangling_name_on_end() -> Result<()> {
        let mut writer = DocumentWriter::new();
        writer.begin_document()?;
        writer.write_name("x")?;

        assert_eq!(writer.end_document().unwrap_err().kind(),
                   ErrorKind::InvalidWriterState);

        Ok(())
    }
}
