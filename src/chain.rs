//! Patch chains: the append-only revision log behind a controller's source.
//!
//! The current source is the fold of every patch over the empty string, in
//! insertion order. Patches are never edited or removed; the only way to
//! grow a chain is [`PatchChain::append`], which refuses a revision computed
//! against a chain of a different length.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::model::Patch;
use crate::patch::{self, PatchError};

/// Errors from reconstructing or growing a chain.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChainError {
    #[error("patch {index} does not apply: {source}")]
    Corrupt { index: usize, source: PatchError },

    #[error("chain has {actual} patches, revision expected {expected}")]
    Stale { expected: usize, actual: usize },
}

/// A revision ready to append: the new patch and the chain length it was
/// computed against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revision {
    pub expected_len: usize,
    pub patch: Patch,
}

/// An ordered, append-only sequence of patches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatchChain {
    patches: Vec<Patch>,
}

impl PatchChain {
    /// Wraps patches already in authorship order.
    ///
    /// No check is made here; a chain that does not fold is reported by
    /// [`PatchChain::reconstruct`].
    pub fn from_patches(patches: Vec<Patch>) -> Self {
        Self { patches }
    }

    pub fn len(&self) -> usize {
        self.patches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }

    pub fn patches(&self) -> &[Patch] {
        &self.patches
    }

    /// Folds the chain over the empty string.
    pub fn reconstruct(&self) -> Result<String, ChainError> {
        self.patches
            .iter()
            .enumerate()
            .try_fold(String::new(), |text, (index, p)| {
                patch::apply(&text, &p.content).map_err(|source| ChainError::Corrupt { index, source })
            })
    }

    /// Computes the revision that turns the current source into `source`.
    ///
    /// An unchanged source still produces a revision: every save is recorded.
    pub fn revise(
        &self,
        name: &str,
        source: &str,
        author: &str,
        at: Timestamp,
    ) -> Result<Revision, ChainError> {
        let current = self.reconstruct()?;
        Ok(Revision {
            expected_len: self.len(),
            patch: Patch {
                author: author.to_string(),
                content: patch::diff(name, &current, source),
                created_at: at,
            },
        })
    }

    /// Appends a revision if the chain still has the length it was computed
    /// against.
    pub fn append(&mut self, revision: Revision) -> Result<(), ChainError> {
        if revision.expected_len != self.len() {
            return Err(ChainError::Stale {
                expected: revision.expected_len,
                actual: self.len(),
            });
        }
        self.patches.push(revision.patch);
        Ok(())
    }
}
