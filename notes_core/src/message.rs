//! Conversion between notes and broker messages.
//!
//! The key is the JSON encoding of the note id and the value the JSON
//! encoding of the whole note. Downstream consumers depend on this layout.

use errors::CodecError;

use crate::types::{Message, Note};

pub trait NoteCodec: Send + Sync {
    fn encode(&self, note: &Note) -> Result<Message, CodecError>;

    fn decode(&self, message: &Message) -> Result<Note, CodecError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl NoteCodec for JsonCodec {
    fn encode(&self, note: &Note) -> Result<Message, CodecError> {
        let value = serde_json::to_vec(note).map_err(|e| CodecError::Encode {
            id: note.id.get(),
            field: "value".to_string(),
            reason: e.to_string(),
        })?;
        let key = serde_json::to_vec(&note.id).map_err(|e| CodecError::Encode {
            id: note.id.get(),
            field: "key".to_string(),
            reason: e.to_string(),
        })?;
        Ok(Message { key, value })
    }

    fn decode(&self, message: &Message) -> Result<Note, CodecError> {
        serde_json::from_slice(&message.value).map_err(|e| CodecError::Decode {
            reason: e.to_string(),
        })
    }
}
