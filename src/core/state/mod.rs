//! Save state support.
//!
//! Mappers serialize themselves into a `StateContainer` as named binary
//! fields. The container implementation decides the on-disk format.

/// Sink/source of named binary fields for save states.
pub trait StateContainer {
    /// Stores a field, replacing any previous value under the same key.
    fn register_field(&mut self, key: &str, data: &[u8]);

    /// Copies a stored field into `out`. Returns false if the key is
    /// missing or the stored size does not match `out`.
    fn read_field(&self, key: &str, out: &mut [u8]) -> bool;
}

/// In-memory container backed by a map. Useful for tests and for
/// callers that frame the fields themselves.
#[derive(Default)]
pub struct MemoryStateContainer {
    fields: std::collections::HashMap<String, Vec<u8>>,
}

impl MemoryStateContainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn field_len(&self, key: &str) -> Option<usize> {
        self.fields.get(key).map(|v| v.len())
    }
}

impl StateContainer for MemoryStateContainer {
    fn register_field(&mut self, key: &str, data: &[u8]) {
        self.fields.insert(key.to_string(), data.to_vec());
    }

    fn read_field(&self, key: &str, out: &mut [u8]) -> bool {
        match self.fields.get(key) {
            Some(data) if data.len() == out.len() => {
                out.copy_from_slice(data);
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_read_field() {
        let mut state = MemoryStateContainer::new();
        state.register_field("banks", &[1, 2, 3, 4]);
        let mut out = [0u8; 4];
        assert!(state.read_field("banks", &mut out));
        assert_eq!(out, [1, 2, 3, 4]);
    }

    #[test]
    fn test_read_field_size_mismatch() {
        let mut state = MemoryStateContainer::new();
        state.register_field("banks", &[1, 2]);
        let mut out = [0u8; 4];
        assert!(!state.read_field("banks", &mut out));
        assert!(!state.read_field("missing", &mut out));
    }
}
