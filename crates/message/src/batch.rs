//! Batch - ordered multi-part message container
//!
//! A `Batch` is what a `Transaction` carries. Parts keep their data in
//! `bytes::Bytes`, so cloning a batch for fan-out is cheap.

use std::collections::BTreeMap;

use bytes::Bytes;

/// Metadata key marking a part that stands for several archived messages
pub const BATCH_SIZE_KEY: &str = "batch_size";

/// A single logical message
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Part {
    data: Bytes,
    metadata: BTreeMap<String, String>,
}

impl Part {
    /// Create a part with no metadata
    #[inline]
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            metadata: BTreeMap::new(),
        }
    }

    /// Raw message bytes
    #[inline]
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Replace the message bytes
    pub fn set_data(&mut self, data: impl Into<Bytes>) {
        self.data = data.into();
    }

    /// Look up a metadata value
    pub fn metadata(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    /// Set a metadata value, returning the part for chaining
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_metadata(key, value);
        self
    }

    /// Set a metadata value
    pub fn set_metadata(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.metadata.insert(key.into(), value.into());
    }

    /// Iterate over all metadata entries in key order
    pub fn metadata_iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.metadata.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of logical messages this part represents
    ///
    /// Parts that archive several messages carry a positive `batch_size`
    /// metadata value. Anything else counts as one.
    #[inline]
    pub fn collapsed_count(&self) -> usize {
        self.metadata(BATCH_SIZE_KEY)
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|&n| n > 0)
            .unwrap_or(1)
    }
}

impl From<Bytes> for Part {
    fn from(data: Bytes) -> Self {
        Self::new(data)
    }
}

impl From<&'static str> for Part {
    fn from(data: &'static str) -> Self {
        Self::new(data)
    }
}

impl From<String> for Part {
    fn from(data: String) -> Self {
        Self::new(data)
    }
}

impl From<Vec<u8>> for Part {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data)
    }
}

/// Ordered, possibly multi-part message batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Batch {
    parts: Vec<Part>,
}

impl Batch {
    /// Create a batch from parts
    #[inline]
    pub fn new(parts: Vec<Part>) -> Self {
        Self { parts }
    }

    /// Create a batch with one part per item
    pub fn quick<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Part>,
    {
        Self {
            parts: items.into_iter().map(Into::into).collect(),
        }
    }

    /// Number of parts
    #[inline]
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// Check if the batch has no parts
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Get a part by index
    #[inline]
    pub fn get(&self, index: usize) -> Option<&Part> {
        self.parts.get(index)
    }

    /// Get a mutable part by index
    #[inline]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut Part> {
        self.parts.get_mut(index)
    }

    /// Append a part
    pub fn push(&mut self, part: impl Into<Part>) {
        self.parts.push(part.into());
    }

    /// Iterate over parts
    pub fn iter(&self) -> std::slice::Iter<'_, Part> {
        self.parts.iter()
    }

    /// Data of every part, in order
    pub fn all_bytes(&self) -> Vec<Bytes> {
        self.parts.iter().map(|p| p.data.clone()).collect()
    }

    /// Sum of part sizes in bytes
    pub fn total_bytes(&self) -> usize {
        self.parts.iter().map(|p| p.data.len()).sum()
    }

    /// Number of logical messages the batch represents
    pub fn collapsed_count(&self) -> usize {
        self.parts.iter().map(Part::collapsed_count).sum()
    }

    /// Split into batches of at most `size` parts
    ///
    /// A `size` of zero is treated as one.
    pub fn chunks(&self, size: usize) -> Vec<Batch> {
        self.parts
            .chunks(size.max(1))
            .map(|c| Batch::new(c.to_vec()))
            .collect()
    }

    /// Consume the batch, returning its parts
    pub fn into_parts(self) -> Vec<Part> {
        self.parts
    }
}

impl FromIterator<Part> for Batch {
    fn from_iter<I: IntoIterator<Item = Part>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl IntoIterator for Batch {
    type Item = Part;
    type IntoIter = std::vec::IntoIter<Part>;

    fn into_iter(self) -> Self::IntoIter {
        self.parts.into_iter()
    }
}

impl<'a> IntoIterator for &'a Batch {
    type Item = &'a Part;
    type IntoIter = std::slice::Iter<'a, Part>;

    fn into_iter(self) -> Self::IntoIter {
        self.parts.iter()
    }
}

#[cfg(test)]
#[path = "batch_test.rs"]
mod batch_test;
