//! Per-field metadata consumed by the indexing core.
//!
//! quiver does not own the tokenization pipeline or the full document
//! model: the only thing it reads from the field model are the
//! term-vector request flags of [`VectorOptions`], and the per-occurrence
//! (position, start offset, end offset) triples handed to
//! [`crate::vectors::TermVectorsWriter::record_token`].

use std::ops::BitOr;

/// `Field` is a numeric identifier of a field within a schema.
#[derive(Copy, Clone, Debug, PartialEq, PartialOrd, Eq, Ord, Hash)]
pub struct Field(pub u32);

impl Field {
    /// Returns the underlying field number.
    pub fn field_id(self) -> u32 {
        self.0
    }
}

/// Term-vector request flags of one field value.
///
/// A document may carry several values for the same field number; the
/// flags that end up applying to the (document, field) pair are the OR of
/// the flags of every value, computed by
/// [`crate::vectors::TermVectorsWriter::start_field`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct VectorOptions {
    indexed: bool,
    store_vectors: bool,
    store_positions: bool,
    store_offsets: bool,
}

impl VectorOptions {
    /// Marks the field value as indexed. Term vectors are only ever
    /// captured for indexed values.
    pub fn set_indexed(mut self) -> VectorOptions {
        self.indexed = true;
        self
    }

    /// Requests term vectors for this field value.
    pub fn set_vectors(mut self) -> VectorOptions {
        self.store_vectors = true;
        self
    }

    /// Requests token positions inside the term vectors.
    pub fn set_positions(mut self) -> VectorOptions {
        self.store_positions = true;
        self
    }

    /// Requests character offsets inside the term vectors.
    pub fn set_offsets(mut self) -> VectorOptions {
        self.store_offsets = true;
        self
    }

    pub fn is_indexed(&self) -> bool {
        self.indexed
    }

    pub fn vectors_stored(&self) -> bool {
        self.store_vectors
    }

    pub fn positions_stored(&self) -> bool {
        self.store_positions
    }

    pub fn offsets_stored(&self) -> bool {
        self.store_offsets
    }
}

impl BitOr for VectorOptions {
    type Output = VectorOptions;

    fn bitor(self, other: VectorOptions) -> VectorOptions {
        VectorOptions {
            indexed: self.indexed | other.indexed,
            store_vectors: self.store_vectors | other.store_vectors,
            store_positions: self.store_positions | other.store_positions,
            store_offsets: self.store_offsets | other.store_offsets,
        }
    }
}

/// Name and options of one field.
#[derive(Clone, Debug)]
pub struct FieldInfo {
    field: Field,
    name: String,
    options: VectorOptions,
}

impl FieldInfo {
    pub fn field(&self) -> Field {
        self.field
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn options(&self) -> VectorOptions {
        self.options
    }
}

/// Registry of the fields of a segment, addressed by field number.
#[derive(Clone, Debug, Default)]
pub struct FieldInfos {
    fields: Vec<FieldInfo>,
}

impl FieldInfos {
    /// Registers a field and returns its number.
    pub fn add_field(&mut self, name: &str, options: VectorOptions) -> Field {
        let field = Field(self.fields.len() as u32);
        self.fields.push(FieldInfo {
            field,
            name: name.to_string(),
            options,
        });
        field
    }

    pub fn get(&self, field: Field) -> &FieldInfo {
        &self.fields[field.field_id() as usize]
    }

    pub fn num_fields(&self) -> usize {
        self.fields.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldInfo> {
        self.fields.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vector_options_or() {
        let left = VectorOptions::default().set_indexed().set_vectors();
        let right = VectorOptions::default().set_positions();
        let merged = left | right;
        assert!(merged.is_indexed());
        assert!(merged.vectors_stored());
        assert!(merged.positions_stored());
        assert!(!merged.offsets_stored());
    }

    #[test]
    fn test_field_infos_numbering() {
        let mut field_infos = FieldInfos::default();
        let title = field_infos.add_field("title", VectorOptions::default());
        let body = field_infos.add_field("body", VectorOptions::default().set_vectors());
        assert_eq!(title, Field(0));
        assert_eq!(body, Field(1));
        assert_eq!(field_infos.get(body).name(), "body");
        assert!(field_infos.get(body).options().vectors_stored());
    }
}
