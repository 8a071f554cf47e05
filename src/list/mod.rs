//! Observable lists and the views derived from them.

mod change;
mod filtered;
mod helper;
mod sort_helper;
mod sorted;
mod transformation;
mod vec;

use std::rc::{Rc, Weak};

pub use change::{Change, SubChange};
pub use filtered::{FilteredList, Predicate};
pub use sort_helper::SortHelper;
pub use sorted::{Comparator, SortedList};
pub use transformation::{SourceObserver, TransformationList};
pub use vec::ObservableVec;

use crate::{Observable, Result};

/// Receives every change event of a list. The cursor starts before the
/// first sub-change.
pub trait ListChangeListener<E> {
	fn on_changed(&self, change: &mut Change<'_, E>);

	fn was_dropped(&self) -> bool {
		false
	}
}

impl<E, F> ListChangeListener<E> for F
where
	F: Fn(&mut Change<'_, E>),
{
	fn on_changed(&self, change: &mut Change<'_, E>) {
		self(change)
	}
}

pub struct WeakListChangeListener<E> {
	listener: Weak<dyn ListChangeListener<E>>,
}

impl<E> WeakListChangeListener<E> {
	pub fn new(listener: &Rc<dyn ListChangeListener<E>>) -> Self {
		WeakListChangeListener {
			listener: Rc::downgrade(listener),
		}
	}
}

impl<E> ListChangeListener<E> for WeakListChangeListener<E> {
	fn on_changed(&self, change: &mut Change<'_, E>) {
		if let Some(listener) = self.listener.upgrade() {
			listener.on_changed(change)
		}
	}

	fn was_dropped(&self) -> bool {
		self.listener.strong_count() == 0
	}
}

/// Identity of a list inside a chain of transformations.
pub trait SourceChain {
	fn chain_id(&self) -> usize;

	/// The list this one is derived from, if any.
	fn chain_source(&self) -> Option<Rc<dyn SourceChain>> {
		None
	}

	/// Maps an index of this list to an index of [`Self::chain_source`].
	fn chain_source_index(&self, index: usize) -> Result<usize> {
		Ok(index)
	}
}

pub trait ObservableList<E>: Observable + SourceChain {
	fn len(&self) -> usize;

	fn is_empty(&self) -> bool {
		self.len() == 0
	}

	fn get(&self, index: usize) -> Result<E>;

	fn to_vec(&self) -> Vec<E>;

	fn add_list_listener(&self, listener: Rc<dyn ListChangeListener<E>>);

	/// Removes the first registration of `listener`, compared by address.
	fn remove_list_listener(&self, listener: &Rc<dyn ListChangeListener<E>>);

	fn chain(self: Rc<Self>) -> Rc<dyn SourceChain>;
}
