//! The explicit codec registry a graph is built against.
//!
//! There is no process-wide registry: callers create a `CodecRegistry`, register
//! the successors and concat codecs they want, and hand it to the
//! `GraphBuilder`. Configs then refer to entries purely by index.

use std::fmt;
use std::sync::Arc;

use crate::clustering::concat::{NumericConcat, SerialConcat, StringConcat, StructConcat};
use crate::traits::{ConcatCodec, Successor};

/// Index of `SerialConcat` in a registry built with `with_standard_concat_codecs`.
pub const SERIAL_CONCAT: usize = 0;
/// Index of `StructConcat` in a registry built with `with_standard_concat_codecs`.
pub const STRUCT_CONCAT: usize = 1;
/// Index of `NumericConcat` in a registry built with `with_standard_concat_codecs`.
pub const NUMERIC_CONCAT: usize = 2;
/// Index of `StringConcat` in a registry built with `with_standard_concat_codecs`.
pub const STRING_CONCAT: usize = 3;

/// Ordered lists of successors and concat codecs, addressed by index.
#[derive(Clone, Default)]
pub struct CodecRegistry {
    successors: Vec<Arc<dyn Successor>>,
    concat_codecs: Vec<Arc<dyn ConcatCodec>>,
}

impl CodecRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry pre-loaded with one concat codec per stream type, at the
    /// indices given by the `*_CONCAT` constants.
    pub fn with_standard_concat_codecs() -> Self {
        let mut registry = Self::new();
        registry.register_concat_codec(SerialConcat);
        registry.register_concat_codec(StructConcat);
        registry.register_concat_codec(NumericConcat);
        registry.register_concat_codec(StringConcat);
        registry
    }

    /// Appends a successor and returns its index.
    pub fn register_successor<S: Successor + 'static>(&mut self, successor: S) -> usize {
        self.successors.push(Arc::new(successor));
        self.successors.len() - 1
    }

    /// Appends a concat codec and returns its index.
    pub fn register_concat_codec<C: ConcatCodec + 'static>(&mut self, codec: C) -> usize {
        self.concat_codecs.push(Arc::new(codec));
        self.concat_codecs.len() - 1
    }

    pub fn successor(&self, idx: usize) -> Option<&Arc<dyn Successor>> {
        self.successors.get(idx)
    }

    pub fn concat_codec(&self, idx: usize) -> Option<&Arc<dyn ConcatCodec>> {
        self.concat_codecs.get(idx)
    }

    pub fn nb_successors(&self) -> usize {
        self.successors.len()
    }

    pub fn nb_concat_codecs(&self) -> usize {
        self.concat_codecs.len()
    }
}

impl fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodecRegistry")
            .field(
                "successors",
                &self.successors.iter().map(|s| s.name()).collect::<Vec<_>>(),
            )
            .field(
                "concat_codecs",
                &self.concat_codecs.iter().map(|c| c.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernels::{StoreSuccessor, ZstdSuccessor};
    use crate::types::StreamType;

    #[test]
    fn test_standard_codecs_are_in_type_order() {
        let registry = CodecRegistry::with_standard_concat_codecs();
        assert_eq!(registry.nb_concat_codecs(), 4);
        assert_eq!(registry.nb_successors(), 0);
        let expected = [
            (SERIAL_CONCAT, StreamType::Serial),
            (STRUCT_CONCAT, StreamType::Struct),
            (NUMERIC_CONCAT, StreamType::Numeric),
            (STRING_CONCAT, StreamType::String),
        ];
        for (idx, ty) in expected {
            assert!(registry.concat_codec(idx).unwrap().accepts(ty));
        }
    }

    #[test]
    fn test_register_returns_sequential_indices() {
        let mut registry = CodecRegistry::new();
        assert_eq!(registry.register_successor(StoreSuccessor), 0);
        assert_eq!(registry.register_successor(ZstdSuccessor::new(1)), 1);
        assert_eq!(registry.successor(1).unwrap().name(), "zstd");
        assert!(registry.successor(2).is_none());
        assert!(format!("{:?}", registry).contains("store"));
    }
}
