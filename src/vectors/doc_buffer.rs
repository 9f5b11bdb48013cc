use crate::schema::Field;
use crate::DocId;

/// Per-document destination of the serialized term vector records.
///
/// Fields appear in `fields` in completion order, one entry per field
/// that produced at least one posting, and `buffer` holds their records
/// back to back in the same order.
pub struct DocumentVectorBuffer {
    doc_id: DocId,
    fields: Vec<Field>,
    buffer: Vec<u8>,
}

impl DocumentVectorBuffer {
    pub fn new(doc_id: DocId) -> DocumentVectorBuffer {
        DocumentVectorBuffer {
            doc_id,
            fields: Vec::new(),
            buffer: Vec::new(),
        }
    }

    pub fn doc_id(&self) -> DocId {
        self.doc_id
    }

    /// Fields with a record in [`Self::vector_data`], in write order.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn vector_data(&self) -> &[u8] {
        &self.buffer
    }

    pub(crate) fn add_field(&mut self, field: Field) {
        self.fields.push(field);
    }

    pub(crate) fn buffer_mut(&mut self) -> &mut Vec<u8> {
        &mut self.buffer
    }
}
