use crate::error::{Result, TopologyError};
use crate::topology::{CompoundData, CompoundId, Shape, TopologyStore};

/// Groups existing shapes into a compound.
pub struct MakeCompound {
    children: Vec<Shape>,
}

impl MakeCompound {
    #[must_use]
    pub fn new(children: Vec<Shape>) -> Self {
        Self { children }
    }

    /// Executes the operation, creating the compound in the topology store.
    ///
    /// # Errors
    ///
    /// Returns an error if a child is not in the store.
    pub fn execute(&self, store: &mut TopologyStore) -> Result<CompoundId> {
        if let Some(missing) = self.children.iter().find(|c| !store.contains(**c)) {
            return Err(TopologyError::EntityNotFound(missing.kind().to_string()).into());
        }
        Ok(store.add_compound(CompoundData {
            children: self.children.clone(),
        }))
    }
}
