use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use crate::category::{Category, Semantics};

use super::Cell;

/// `(prune_score, second_prune_score)`
type Rank = (f64, f64);

fn rank<MR: Semantics>(cell: &Cell<MR>) -> Rank {
  (cell.prune_score(), cell.second_prune_score())
}

fn compare(a: Rank, b: Rank) -> Ordering {
  a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1))
}

/// The cells of one span, keyed by category, optionally capped to a beam.
///
/// In order-invariant mode the result doesn't depend on the order cells
/// arrive in: when the beam overflows every cell tied at the minimum is
/// evicted together, and from then on nothing ranked at or below that
/// minimum is admitted.
#[derive(Debug, Clone)]
pub(crate) struct CellQueue<MR> {
  capacity: Option<usize>,
  order_invariant: bool,
  cells: HashMap<Category<MR>, Arc<Cell<MR>>>,
  threshold: Option<Rank>,
  pruned: bool,
}

impl<MR: Semantics> CellQueue<MR> {
  pub fn bounded(capacity: usize, order_invariant: bool) -> Self {
    Self {
      capacity: Some(capacity),
      order_invariant,
      cells: HashMap::new(),
      threshold: None,
      pruned: false,
    }
  }

  pub fn unbounded() -> Self {
    Self {
      capacity: None,
      order_invariant: true,
      cells: HashMap::new(),
      threshold: None,
      pruned: false,
    }
  }

  pub fn len(&self) -> usize {
    self.cells.len()
  }

  pub fn get(&self, category: &Category<MR>) -> Option<&Arc<Cell<MR>>> {
    self.cells.get(category)
  }

  pub fn contains(&self, category: &Category<MR>) -> bool {
    self.cells.contains_key(category)
  }

  /// True once anything was rejected or evicted
  pub fn is_pruned(&self) -> bool {
    self.pruned
  }

  pub fn iter(&self) -> impl Iterator<Item = &Arc<Cell<MR>>> {
    self.cells.values()
  }

  pub fn into_cells(self) -> impl Iterator<Item = Arc<Cell<MR>>> {
    self.cells.into_values()
  }

  pub fn retain(&mut self, mut keep: impl FnMut(&Cell<MR>) -> bool) {
    self.cells.retain(|_, cell| keep(cell));
  }

  /// Offers a cell. A cell for a category already present is merged into
  /// the existing one; otherwise the beam decides. Returns true if the
  /// queue changed.
  pub fn offer(&mut self, cell: Cell<MR>) -> bool {
    if let Some(existing) = self.cells.get_mut(cell.category()) {
      return Arc::make_mut(existing).merge(cell);
    }

    let Some(capacity) = self.capacity else {
      self.insert(cell);
      return true;
    };

    let incoming = rank(&cell);
    if let Some(threshold) = self.threshold {
      if compare(incoming, threshold) != Ordering::Greater {
        self.pruned = true;
        return false;
      }
    }

    if self.cells.len() < capacity {
      self.insert(cell);
      return true;
    }

    let Some(min) = self.min_rank() else {
      // zero capacity
      self.pruned = true;
      return false;
    };
    self.pruned = true;
    match compare(incoming, min) {
      Ordering::Greater => {
        if self.order_invariant {
          self.evict_all(min);
          self.threshold = Some(min);
        } else {
          self.evict_one(min);
        }
        self.insert(cell);
        true
      }
      Ordering::Equal if self.order_invariant => {
        self.evict_all(min);
        self.threshold = Some(min);
        false
      }
      _ => false,
    }
  }

  fn insert(&mut self, cell: Cell<MR>) {
    self.cells.insert(cell.category().clone(), Arc::new(cell));
  }

  fn min_rank(&self) -> Option<Rank> {
    self.cells.values().map(|c| rank(c)).min_by(|a, b| compare(*a, *b))
  }

  fn evict_all(&mut self, at: Rank) {
    self.cells.retain(|_, cell| compare(rank(cell), at) != Ordering::Equal);
  }

  fn evict_one(&mut self, at: Rank) {
    let victim = self
      .cells
      .iter()
      .find(|(_, cell)| compare(rank(cell), at) == Ordering::Equal)
      .map(|(category, _)| category.clone());
    if let Some(category) = victim {
      self.cells.remove(&category);
    }
  }
}
