//! Typed columnar field store
//!
//! A [`Dataset`] is an ordered collection of named [`Field`]s that all share
//! one row count. Values are stored per kind, so every value is coercible to
//! its field's kind by construction; numeric finiteness is checked when a
//! numeric view is requested.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::ops::Range;

/// Kind of values held by a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Numeric,
    Text,
    DateTime,
    Boolean,
}

impl FieldKind {
    pub fn name(&self) -> &'static str {
        match self {
            FieldKind::Numeric => "numeric",
            FieldKind::Text => "text",
            FieldKind::DateTime => "datetime",
            FieldKind::Boolean => "boolean",
        }
    }
}

/// Homogeneous value storage for one field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValues {
    Numeric(Vec<f64>),
    Text(Vec<String>),
    /// Milliseconds since the Unix epoch
    DateTime(Vec<i64>),
    Boolean(Vec<bool>),
}

impl FieldValues {
    pub fn kind(&self) -> FieldKind {
        match self {
            FieldValues::Numeric(_) => FieldKind::Numeric,
            FieldValues::Text(_) => FieldKind::Text,
            FieldValues::DateTime(_) => FieldKind::DateTime,
            FieldValues::Boolean(_) => FieldKind::Boolean,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            FieldValues::Numeric(v) => v.len(),
            FieldValues::Text(v) => v.len(),
            FieldValues::DateTime(v) => v.len(),
            FieldValues::Boolean(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy out a contiguous row range
    fn slice(&self, range: Range<usize>) -> FieldValues {
        match self {
            FieldValues::Numeric(v) => FieldValues::Numeric(v[range].to_vec()),
            FieldValues::Text(v) => FieldValues::Text(v[range].to_vec()),
            FieldValues::DateTime(v) => FieldValues::DateTime(v[range].to_vec()),
            FieldValues::Boolean(v) => FieldValues::Boolean(v[range].to_vec()),
        }
    }

    /// Approximate heap footprint in bytes
    pub fn heap_bytes(&self) -> usize {
        match self {
            FieldValues::Numeric(v) => v.len() * std::mem::size_of::<f64>(),
            FieldValues::Text(v) => v
                .iter()
                .map(|s| s.capacity() + std::mem::size_of::<String>())
                .sum(),
            FieldValues::DateTime(v) => v.len() * std::mem::size_of::<i64>(),
            FieldValues::Boolean(v) => v.len(),
        }
    }
}

/// Named, typed column of fixed length
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    name: String,
    values: FieldValues,
}

impl Field {
    pub fn new(name: impl Into<String>, values: FieldValues) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    pub fn numeric(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self::new(name, FieldValues::Numeric(values))
    }

    pub fn text<S: Into<String>>(name: impl Into<String>, values: impl IntoIterator<Item = S>) -> Self {
        Self::new(
            name,
            FieldValues::Text(values.into_iter().map(Into::into).collect()),
        )
    }

    pub fn datetime(name: impl Into<String>, millis: Vec<i64>) -> Self {
        Self::new(name, FieldValues::DateTime(millis))
    }

    pub fn boolean(name: impl Into<String>, values: Vec<bool>) -> Self {
        Self::new(name, FieldValues::Boolean(values))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> FieldKind {
        self.values.kind()
    }

    pub fn values(&self) -> &FieldValues {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn is_numeric(&self) -> bool {
        self.kind() == FieldKind::Numeric
    }

    /// Raw numeric values, if this is a numeric field
    pub fn as_numeric(&self) -> Option<&[f64]> {
        match &self.values {
            FieldValues::Numeric(v) => Some(v),
            _ => None,
        }
    }

    /// Raw text values, if this is a text field
    pub fn as_text(&self) -> Option<&[String]> {
        match &self.values {
            FieldValues::Text(v) => Some(v),
            _ => None,
        }
    }

    /// Numeric view usable by numeric operations
    ///
    /// Fails when the field is not numeric, has no values, or holds a
    /// non-finite value.
    pub fn numeric_values(&self) -> Result<&[f64]> {
        let values = self.as_numeric().ok_or_else(|| {
            Error::Validation(format!(
                "Field '{}' is {}, expected numeric",
                self.name,
                self.kind().name()
            ))
        })?;
        if values.is_empty() {
            return Err(Error::empty_input(&self.name));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(Error::non_finite(&format!("Field '{}'", self.name)));
        }
        Ok(values)
    }

    /// Copy of a contiguous row range of this field
    pub fn slice(&self, range: Range<usize>) -> Field {
        Field {
            name: self.name.clone(),
            values: self.values.slice(range),
        }
    }
}

/// Fractions of usable values across a dataset
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DataQuality {
    /// Non-missing values (NaN numerics and blank text count as missing)
    pub completeness: f64,
    /// Values valid for their kind (finite numerics, non-blank text)
    pub validity: f64,
}

/// Ordered collection of equal-length fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    fields: Vec<Field>,
    row_count: usize,
}

impl Dataset {
    /// Build a dataset, enforcing the structural invariants
    ///
    /// Requires at least one field, non-blank unique names, a non-zero row
    /// count and equal row counts across fields. Ragged fields are rejected,
    /// never padded.
    pub fn new(fields: Vec<Field>) -> Result<Self> {
        let first = fields
            .first()
            .ok_or_else(|| Error::Validation("Dataset contains no fields".to_string()))?;
        let row_count = first.len();

        let mut seen = HashSet::with_capacity(fields.len());
        for field in &fields {
            if field.name.trim().is_empty() {
                return Err(Error::Validation("Field name is required".to_string()));
            }
            if !seen.insert(field.name.as_str()) {
                return Err(Error::Validation(format!(
                    "Duplicate field name '{}'",
                    field.name
                )));
            }
            if field.len() != row_count {
                return Err(Error::size_mismatch(
                    row_count,
                    field.len(),
                    &format!("field '{}'", field.name),
                ));
            }
        }

        if row_count == 0 {
            return Err(Error::Validation("Dataset contains no rows".to_string()));
        }

        Ok(Self { fields, row_count })
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn into_fields(self) -> Vec<Field> {
        self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Number of fields (columns)
    pub fn width(&self) -> usize {
        self.fields.len()
    }

    pub fn numeric_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|f| f.is_numeric())
    }

    pub fn text_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|f| f.kind() == FieldKind::Text)
    }

    /// Check every numeric field for non-finite values
    pub fn validate_values(&self) -> Result<()> {
        for field in self.numeric_fields() {
            field.numeric_values()?;
        }
        Ok(())
    }

    /// Split row indices into contiguous ranges of at most `chunk_size` rows
    pub fn chunk_ranges(&self, chunk_size: usize) -> Vec<Range<usize>> {
        let size = chunk_size.max(1);
        (0..self.row_count)
            .step_by(size)
            .map(|start| start..(start + size).min(self.row_count))
            .collect()
    }

    /// Owned row-range slice of every field
    pub fn slice(&self, index: usize, range: Range<usize>) -> Result<PipelineChunk> {
        if range.start >= range.end || range.end > self.row_count {
            return Err(Error::Validation(format!(
                "Invalid row range {}..{} for dataset of {} rows",
                range.start, range.end, self.row_count
            )));
        }
        let fields = self.fields.iter().map(|f| f.slice(range.clone())).collect();
        Ok(PipelineChunk {
            index,
            range,
            fields,
        })
    }

    /// Completeness and validity ratios over every value in the dataset
    pub fn data_quality(&self) -> DataQuality {
        let mut total = 0usize;
        let mut present = 0usize;
        let mut valid = 0usize;

        for field in &self.fields {
            total += field.len();
            match field.values() {
                FieldValues::Numeric(v) => {
                    present += v.iter().filter(|x| !x.is_nan()).count();
                    valid += v.iter().filter(|x| x.is_finite()).count();
                }
                FieldValues::Text(v) => {
                    let non_blank = v.iter().filter(|s| !s.trim().is_empty()).count();
                    present += non_blank;
                    valid += non_blank;
                }
                FieldValues::DateTime(v) => {
                    present += v.len();
                    valid += v.len();
                }
                FieldValues::Boolean(v) => {
                    present += v.len();
                    valid += v.len();
                }
            }
        }

        if total == 0 {
            return DataQuality {
                completeness: 0.0,
                validity: 0.0,
            };
        }
        DataQuality {
            completeness: present as f64 / total as f64,
            validity: valid as f64 / total as f64,
        }
    }
}

/// Contiguous row-range slice of a dataset, owned by one unit of work
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineChunk {
    index: usize,
    range: Range<usize>,
    fields: Vec<Field>,
}

impl PipelineChunk {
    /// Position of this chunk in dispatch order
    pub fn index(&self) -> usize {
        self.index
    }

    /// Rows of the source dataset covered by this chunk
    pub fn range(&self) -> Range<usize> {
        self.range.clone()
    }

    pub fn row_count(&self) -> usize {
        self.range.len()
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Approximate heap footprint of the chunk's values
    pub fn heap_bytes(&self) -> usize {
        self.fields.iter().map(|f| f.values.heap_bytes()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_dataset() -> Dataset {
        Dataset::new(vec![
            Field::numeric("revenue", vec![100.0, 110.0, 120.0, 130.0, 140.0]),
            Field::text("region", ["north", "south", "", "east", "west"]),
            Field::boolean("promo", vec![true, false, true, false, true]),
        ])
        .unwrap()
    }

    #[test]
    fn test_dataset_basic_accessors() {
        let ds = sample_dataset();
        assert_eq!(ds.row_count(), 5);
        assert_eq!(ds.width(), 3);
        assert_eq!(ds.numeric_fields().count(), 1);
        assert_eq!(ds.text_fields().count(), 1);
        assert_eq!(ds.field("promo").unwrap().kind(), FieldKind::Boolean);
        assert!(ds.field("missing").is_none());
    }

    #[test]
    fn test_ragged_fields_rejected() {
        let err = Dataset::new(vec![
            Field::numeric("a", vec![1.0, 2.0, 3.0]),
            Field::numeric("b", vec![1.0, 2.0]),
        ])
        .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(err.to_string().contains("field 'b'"));
    }

    #[test]
    fn test_duplicate_and_blank_names_rejected() {
        assert!(Dataset::new(vec![
            Field::numeric("a", vec![1.0]),
            Field::numeric("a", vec![2.0]),
        ])
        .is_err());
        assert!(Dataset::new(vec![Field::numeric("  ", vec![1.0])]).is_err());
        assert!(Dataset::new(vec![]).is_err());
        assert!(Dataset::new(vec![Field::numeric("a", vec![])]).is_err());
    }

    #[test]
    fn test_numeric_values_checks() {
        let field = Field::numeric("x", vec![1.0, f64::NAN]);
        assert!(field.numeric_values().is_err());

        let field = Field::text("t", ["a"]);
        assert!(matches!(field.numeric_values(), Err(Error::Validation(_))));

        let field = Field::numeric("e", vec![]);
        assert!(matches!(
            field.numeric_values(),
            Err(Error::InsufficientData { .. })
        ));
    }

    #[test]
    fn test_chunk_ranges_cover_all_rows() {
        let ds = sample_dataset();
        let ranges = ds.chunk_ranges(2);
        assert_eq!(ranges, vec![0..2, 2..4, 4..5]);

        let total: usize = ranges
            .iter()
            .enumerate()
            .map(|(i, r)| ds.slice(i, r.clone()).unwrap().row_count())
            .sum();
        assert_eq!(total, ds.row_count());
    }

    #[test]
    fn test_slice_copies_rows() {
        let ds = sample_dataset();
        let chunk = ds.slice(1, 2..4).unwrap();
        assert_eq!(chunk.index(), 1);
        assert_eq!(chunk.fields()[0].as_numeric().unwrap(), &[120.0, 130.0]);
        assert_eq!(chunk.fields()[1].as_text().unwrap(), &["".to_string(), "east".to_string()]);
        assert!(chunk.heap_bytes() > 0);
        assert!(ds.slice(0, 3..9).is_err());
    }

    #[test]
    fn test_data_quality() {
        let ds = sample_dataset();
        let quality = ds.data_quality();
        // One blank text value out of 15
        assert!((quality.completeness - 14.0 / 15.0).abs() < 1e-12);
        assert!((quality.validity - 14.0 / 15.0).abs() < 1e-12);
    }
}
