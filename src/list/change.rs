use std::fmt::{self, Debug};

use crate::list::ObservableList;
use crate::{Error, Result};

/// One step of a list change. Steps of a change are applied in order and
/// each index refers to the list as left by the steps before it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubChange<E> {
	/// Elements at `from..to` were inserted.
	Added { from: usize, to: usize },
	/// `removed` was taken out at `from`.
	Removed { from: usize, removed: Vec<E> },
	/// Elements of `from..to` were reordered. The element that was at
	/// `from + i` is now at `permutation[i]`.
	Permutated {
		from: usize,
		to: usize,
		permutation: Vec<usize>,
	},
	/// Elements at `from..to` were modified in place.
	Updated { from: usize, to: usize },
}

impl<E> SubChange<E> {
	/// Describes `moved`, where `moved[old] == new`, by its smallest
	/// non-identity range. `None` when nothing moved.
	pub fn permutation_of(moved: Vec<usize>) -> Option<Self> {
		let from = moved.iter().enumerate().position(|(old, new)| old != *new)?;
		let to = moved.iter().enumerate().rposition(|(old, new)| old != *new)? + 1;

		Some(SubChange::Permutated {
			from,
			to,
			permutation: moved[from..to].to_vec(),
		})
	}

	pub fn from(&self) -> usize {
		match self {
			SubChange::Added { from, .. }
			| SubChange::Removed { from, .. }
			| SubChange::Permutated { from, .. }
			| SubChange::Updated { from, .. } => *from,
		}
	}

	/// End of the affected range. Equals `from` for a removal.
	pub fn to(&self) -> usize {
		match self {
			SubChange::Added { to, .. } | SubChange::Permutated { to, .. } | SubChange::Updated { to, .. } => *to,
			SubChange::Removed { from, .. } => *from,
		}
	}

	pub fn was_added(&self) -> bool {
		matches!(self, SubChange::Added { .. })
	}

	pub fn was_removed(&self) -> bool {
		matches!(self, SubChange::Removed { .. })
	}

	pub fn was_permutated(&self) -> bool {
		matches!(self, SubChange::Permutated { .. })
	}

	pub fn was_updated(&self) -> bool {
		matches!(self, SubChange::Updated { .. })
	}

	pub fn removed(&self) -> &[E] {
		match self {
			SubChange::Removed { removed, .. } => removed,
			_ => &[],
		}
	}

	pub fn removed_size(&self) -> usize {
		self.removed().len()
	}

	pub fn added_size(&self) -> usize {
		match self {
			SubChange::Added { from, to } => to - from,
			_ => 0,
		}
	}

	/// New index of the element that was at `old`.
	pub fn permutation(&self, old: usize) -> Result<usize> {
		match self {
			SubChange::Permutated {
				from,
				to,
				permutation,
			} => {
				if old < *from || old >= *to {
					return Err(Error::out_of_range(old, *to));
				}
				Ok(permutation[old - from])
			}
			_ => Err(Error::NotPermutation),
		}
	}
}

/// A cursor over the sub-changes of one list event.
pub struct Change<'a, E> {
	list: &'a dyn ObservableList<E>,
	changes: &'a [SubChange<E>],
	cursor: Option<usize>,
}

impl<'a, E> Change<'a, E> {
	pub fn new(list: &'a dyn ObservableList<E>, changes: &'a [SubChange<E>]) -> Self {
		Change {
			list,
			changes,
			cursor: None,
		}
	}

	/// Moves to the next sub-change.
	#[allow(clippy::should_implement_trait)]
	pub fn next(&mut self) -> Option<&'a SubChange<E>> {
		let next = self.cursor.map_or(0, |cursor| cursor + 1);
		if next > self.changes.len() {
			return None;
		}

		self.cursor = Some(next);
		self.changes.get(next)
	}

	pub fn current(&self) -> Option<&'a SubChange<E>> {
		self.changes.get(self.cursor?)
	}

	/// Rewinds to before the first sub-change.
	pub fn reset(&mut self) {
		self.cursor = None;
	}

	/// The list that changed, already in its new state.
	pub fn list(&self) -> &'a dyn ObservableList<E> {
		self.list
	}

	pub fn len(&self) -> usize {
		self.changes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.changes.is_empty()
	}

	pub fn sub_changes(&self) -> &'a [SubChange<E>] {
		self.changes
	}

	/// The sub-changes after the current one.
	pub(crate) fn rest(&self) -> &'a [SubChange<E>] {
		let start = self.cursor.map_or(0, |cursor| cursor + 1).min(self.changes.len());
		&self.changes[start..]
	}

	/// Elements added by the current sub-change, read from the list.
	pub fn added_items(&self) -> Result<Vec<E>> {
		match self.current() {
			Some(SubChange::Added { from, to }) => (*from..*to).map(|index| self.list.get(index)).collect(),
			_ => Ok(Vec::new()),
		}
	}
}

impl<'a, E> Debug for Change<'a, E>
where
	E: Debug,
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Change")
			.field("changes", &self.changes)
			.field("cursor", &self.cursor)
			.finish()
	}
}

/// Collects arbitrary-order removals and insertions made to a view and
/// reports them as ascending sub-changes.
///
/// Each slot of the tracked view holds the original index of a surviving
/// element, or `None` for one inserted since the tracker was created.
pub(crate) struct AddRemoveTracker<E> {
	slots: Vec<Option<usize>>,
	removed: Vec<(usize, E)>,
}

impl<E> AddRemoveTracker<E> {
	pub fn new(len: usize) -> Self {
		AddRemoveTracker {
			slots: (0..len).map(Some).collect(),
			removed: Vec::new(),
		}
	}

	pub fn is_empty(&self) -> bool {
		self.removed.is_empty() && self.slots.iter().all(Option::is_some)
	}

	/// Records the removal of `value` from `position` of the current view.
	pub fn remove(&mut self, position: usize, value: E) {
		if position >= self.slots.len() {
			return;
		}

		if let Some(original) = self.slots.remove(position) {
			self.removed.push((original, value));
		}
	}

	/// Records an insertion at `position` of the current view.
	pub fn insert(&mut self, position: usize) {
		let position = position.min(self.slots.len());
		self.slots.insert(position, None);
	}

	pub fn finish(mut self) -> Vec<SubChange<E>> {
		self.removed.sort_by_key(|(original, _)| *original);

		let mut removed = self.removed.into_iter().peekable();
		let mut changes = Vec::new();
		let mut index = 0;

		loop {
			let start = index;
			while let Some(None) = self.slots.get(index) {
				index += 1;
			}

			let bound = match self.slots.get(index) {
				Some(Some(original)) => *original,
				_ => usize::MAX,
			};

			let mut gone = Vec::new();
			while let Some((_, value)) = removed.next_if(|(original, _)| *original < bound) {
				gone.push(value);
			}

			if !gone.is_empty() {
				changes.push(SubChange::Removed {
					from: start,
					removed: gone,
				});
			}
			if index > start {
				changes.push(SubChange::Added { from: start, to: index });
			}

			if index >= self.slots.len() {
				break;
			}
			index += 1;
		}

		changes
	}
}

/// Whether `changes` can be applied in order to a list of `len`
/// elements and leave `final_len` elements.
pub(crate) fn is_consistent<E>(changes: &[SubChange<E>], mut len: usize, final_len: usize) -> bool {
	for change in changes {
		match change {
			SubChange::Removed { from, removed } => {
				if from + removed.len() > len {
					return false;
				}
				len -= removed.len();
			}
			SubChange::Added { from, to } => {
				if from > &len || to < from {
					return false;
				}
				len += to - from;
			}
			SubChange::Permutated {
				from,
				to,
				permutation,
			} => {
				if to > &len || to < from || permutation.len() != to - from {
					return false;
				}
				if permutation.iter().any(|new| new < from || new >= to) {
					return false;
				}
			}
			SubChange::Updated { from, to } => {
				if to > &len || to < from {
					return false;
				}
			}
		}
	}
	len == final_len
}

/// Value of the element at `position` of the list as left by the current
/// sub-change, where `later` are the sub-changes still to apply. Elements
/// that a later step removes are taken from that step.
pub(crate) fn value_at<E>(list: &dyn ObservableList<E>, later: &[SubChange<E>], mut position: usize) -> Result<E>
where
	E: Clone,
{
	for change in later {
		match change {
			SubChange::Removed { from, removed } => {
				if position >= from + removed.len() {
					position -= removed.len();
				} else if position >= *from {
					return Ok(removed[position - from].clone());
				}
			}
			SubChange::Added { from, to } => {
				if position >= *from {
					position += to - from;
				}
			}
			SubChange::Permutated {
				from,
				to,
				permutation,
			} => {
				if position >= *from && position < *to {
					if let Some(new) = permutation.get(position - from) {
						position = *new;
					}
				}
			}
			SubChange::Updated { .. } => {}
		}
	}
	list.get(position)
}

/// Collapses updated view positions into ascending ranges.
pub(crate) fn updated_ranges<E>(mut positions: Vec<usize>) -> Vec<SubChange<E>> {
	positions.sort_unstable();
	positions.dedup();

	let mut changes: Vec<SubChange<E>> = Vec::new();
	for position in positions {
		match changes.last_mut() {
			Some(SubChange::Updated { to, .. }) if *to == position => *to += 1,
			_ => changes.push(SubChange::Updated {
				from: position,
				to: position + 1,
			}),
		}
	}
	changes
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn permutation_trims_identity_ends() {
		let change = SubChange::<()>::permutation_of(vec![0, 2, 1, 3]);
		assert_eq!(
			change,
			Some(SubChange::Permutated {
				from: 1,
				to: 3,
				permutation: vec![2, 1],
			})
		);
		assert_eq!(SubChange::<()>::permutation_of(vec![0, 1, 2]), None);
	}

	#[test]
	fn permutation_lookup() {
		let change = SubChange::<()>::Permutated {
			from: 1,
			to: 3,
			permutation: vec![2, 1],
		};
		assert_eq!(change.permutation(1), Ok(2));
		assert_eq!(change.permutation(2), Ok(1));
		assert!(change.permutation(0).is_err());
		assert_eq!(
			SubChange::<()>::Updated { from: 0, to: 1 }.permutation(0),
			Err(Error::NotPermutation)
		);
	}

	#[test]
	fn tracker_orders_out_of_order_edits() {
		// view: a b c d e
		let mut tracker = AddRemoveTracker::new(5);
		tracker.remove(3, 'd');
		tracker.insert(0);
		tracker.remove(2, 'b');
		tracker.insert(3);

		// view: + a c + e
		assert_eq!(
			tracker.finish(),
			vec![
				SubChange::Added { from: 0, to: 1 },
				SubChange::Removed {
					from: 2,
					removed: vec!['b'],
				},
				SubChange::Removed {
					from: 3,
					removed: vec!['d'],
				},
				SubChange::Added { from: 3, to: 4 },
			]
		);
	}

	#[test]
	fn tracker_reports_replacement_as_remove_then_add() {
		let mut tracker = AddRemoveTracker::new(3);
		tracker.remove(1, 'b');
		tracker.insert(1);

		assert_eq!(
			tracker.finish(),
			vec![
				SubChange::Removed {
					from: 1,
					removed: vec!['b'],
				},
				SubChange::Added { from: 1, to: 2 },
			]
		);
	}

	#[test]
	fn tracker_forgets_transient_inserts() {
		let mut tracker = AddRemoveTracker::new(2);
		tracker.insert(1);
		tracker.remove(1, 'x');
		assert!(tracker.is_empty());
		assert!(tracker.finish().is_empty());
	}

	#[test]
	fn updated_positions_merge() {
		assert_eq!(
			updated_ranges::<()>(vec![4, 1, 2, 2]),
			vec![SubChange::Updated { from: 1, to: 3 }, SubChange::Updated { from: 4, to: 5 },]
		);
	}
}
