use std::rc::{Rc, Weak};

use crate::list::{Change, ListChangeListener, ObservableList, SourceChain};
use crate::{Error, Result};

/// A list derived from one source list.
pub trait TransformationList<E, F>: ObservableList<E> {
	fn source(&self) -> Rc<dyn ObservableList<F>>;

	/// Index in the source of the element at `index` of this list.
	fn source_index(&self, index: usize) -> Result<usize>;

	/// Index in this list of the source element at `index`.
	fn view_index(&self, index: usize) -> Result<usize>;

	/// Whether `list` is the source of this list, directly or through
	/// other transformations.
	fn is_in_transformation_chain(&self, list: &dyn SourceChain) -> bool {
		let id = list.chain_id();
		let mut current = Some(self.source().chain());
		while let Some(source) = current {
			if source.chain_id() == id {
				return true;
			}
			current = source.chain_source();
		}
		false
	}

	/// Maps `index` of this list down to an index of `list`, which must be
	/// somewhere in the source chain.
	fn source_index_for(&self, list: &dyn SourceChain, index: usize) -> Result<usize> {
		if !self.is_in_transformation_chain(list) {
			return Err(Error::NotInChain);
		}

		let id = list.chain_id();
		let mut index = self.source_index(index)?;
		let mut current = self.source().chain();
		while current.chain_id() != id {
			index = current.chain_source_index(index)?;
			current = current.chain_source().ok_or(Error::NotInChain)?;
		}
		Ok(index)
	}
}

/// Reacts to a change of the source list. The change describes the
/// source, already in its new state.
pub trait SourceObserver<F> {
	fn source_changed(&self, change: &mut Change<'_, F>);
}

struct SourceListener<B> {
	target: Weak<B>,
}

impl<F, B> ListChangeListener<F> for SourceListener<B>
where
	B: SourceObserver<F>,
{
	fn on_changed(&self, change: &mut Change<'_, F>) {
		if let Some(target) = self.target.upgrade() {
			target.source_changed(change);
		}
	}

	fn was_dropped(&self) -> bool {
		self.target.strong_count() == 0
	}
}

/// The registration of a transformation on its source. Dropping it
/// detaches the listener.
pub(crate) struct SourceLink<F> {
	source: Rc<dyn ObservableList<F>>,
	listener: Rc<dyn ListChangeListener<F>>,
}

impl<F> SourceLink<F>
where
	F: 'static,
{
	pub fn attach<B>(source: Rc<dyn ObservableList<F>>, target: Weak<B>) -> Self
	where
		B: SourceObserver<F> + 'static,
	{
		let listener: Rc<dyn ListChangeListener<F>> = Rc::new(SourceListener { target });
		source.add_list_listener(listener.clone());
		SourceLink { source, listener }
	}

	pub fn source(&self) -> &Rc<dyn ObservableList<F>> {
		&self.source
	}
}

impl<F> Drop for SourceLink<F> {
	fn drop(&mut self) {
		self.source.remove_list_listener(&self.listener);
	}
}
