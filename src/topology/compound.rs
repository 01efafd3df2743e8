use super::shape::Shape;

slotmap::new_key_type! {
    /// Unique identifier for a compound in the topology store.
    pub struct CompoundId;
}

/// An unordered group of arbitrary shapes.
#[derive(Debug, Clone, Default)]
pub struct CompoundData {
    /// The grouped shapes.
    pub children: Vec<Shape>,
}
