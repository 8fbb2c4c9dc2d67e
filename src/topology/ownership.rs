//! Ownership classification of local entities.
//!
//! [`EntityOwnership`] snapshots the ghost predicate once per numbering pass.
//! Owned entities get this rank as their owner immediately; ghost owners stay
//! unset until cross-rank resolution fills them in.

/// Owned/ghost split of one local entity collection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntityOwnership {
    my_rank: usize,
    ghost: Vec<bool>,
    ranks: Vec<Option<usize>>,
    owned: usize,
}

impl EntityOwnership {
    /// Classify `len` entities with the externally supplied ghost predicate.
    pub fn classify<F>(len: usize, is_ghost: F, my_rank: usize) -> Self
    where
        F: Fn(usize) -> bool,
    {
        let mut ghost = Vec::with_capacity(len);
        let mut ranks = Vec::with_capacity(len);
        let mut owned = 0usize;
        for i in 0..len {
            let g = is_ghost(i);
            ghost.push(g);
            if g {
                ranks.push(None);
            } else {
                ranks.push(Some(my_rank));
                owned += 1;
            }
        }
        Self {
            my_rank,
            ghost,
            ranks,
            owned,
        }
    }

    /// Classify from a slice of ghost flags.
    pub fn from_flags(flags: &[bool], my_rank: usize) -> Self {
        Self::classify(flags.len(), |i| flags[i], my_rank)
    }

    /// Rank that performed the classification.
    pub fn my_rank(&self) -> usize {
        self.my_rank
    }

    pub fn len(&self) -> usize {
        self.ghost.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ghost.is_empty()
    }

    /// Number of entities owned by this rank.
    pub fn owned_count(&self) -> usize {
        self.owned
    }

    /// Number of ghost entities held by this rank.
    pub fn ghost_count(&self) -> usize {
        self.ghost.len() - self.owned
    }

    /// Returns true if entity `i` is a ghost on this rank.
    #[inline]
    pub fn is_ghost(&self, i: usize) -> bool {
        self.ghost[i]
    }

    /// Local indices of owned entities, ascending.
    pub fn owned_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.ghost
            .iter()
            .enumerate()
            .filter_map(|(i, &g)| (!g).then_some(i))
    }

    /// Owner per entity; `None` for ghosts not yet resolved.
    pub fn ranks(&self) -> &[Option<usize>] {
        &self.ranks
    }
}
