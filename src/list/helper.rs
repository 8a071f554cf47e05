use std::cell::RefCell;
use std::rc::Rc;

use crate::helper::ListenerList;
use crate::list::{Change, ListChangeListener, ObservableList, SubChange};
use crate::InvalidationListener;

/// Listener registry of one list. Every listener gets its own cursor
/// over the same sub-changes.
pub(crate) struct ListListenerHelper<E> {
	inner: RefCell<ListHelperInner<E>>,
}

struct ListHelperInner<E> {
	invalidation: ListenerList<dyn InvalidationListener>,
	change: ListenerList<dyn ListChangeListener<E>>,
}

impl<E> ListListenerHelper<E>
where
	E: 'static,
{
	pub fn new() -> Self {
		ListListenerHelper {
			inner: RefCell::new(ListHelperInner {
				invalidation: ListenerList::new(),
				change: ListenerList::new(),
			}),
		}
	}

	pub fn add_invalidation_listener(&self, listener: Rc<dyn InvalidationListener>) {
		self.inner.borrow_mut().invalidation.add(listener);
	}

	pub fn remove_invalidation_listener(&self, listener: &Rc<dyn InvalidationListener>) {
		self.inner.borrow_mut().invalidation.remove(listener);
	}

	pub fn add_list_listener(&self, listener: Rc<dyn ListChangeListener<E>>) {
		self.inner.borrow_mut().change.add(listener);
	}

	pub fn remove_list_listener(&self, listener: &Rc<dyn ListChangeListener<E>>) {
		self.inner.borrow_mut().change.remove(listener);
	}

	pub fn listener_count(&self) -> usize {
		let inner = self.inner.borrow();
		inner.invalidation.len() + inner.change.len()
	}

	pub fn fire<O>(&self, list: &O, changes: Vec<SubChange<E>>)
	where
		O: ObservableList<E>,
	{
		if changes.is_empty() {
			return;
		}

		let (invalidation, change) = {
			let inner = self.inner.borrow();
			(inner.invalidation.snapshot(), inner.change.snapshot())
		};

		tracing::trace!(
			sub_changes = changes.len(),
			listeners = invalidation.len() + change.len(),
			"list changed"
		);

		for listener in &invalidation {
			listener.invalidated(list);
		}

		for listener in &change {
			let mut cursor = Change::new(list, &changes);
			listener.on_changed(&mut cursor);
		}

		let mut inner = self.inner.borrow_mut();
		inner.invalidation.prune();
		inner.change.prune();
	}
}
