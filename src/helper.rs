use std::cell::RefCell;
use std::rc::Rc;

use smallvec::SmallVec;

use crate::addr::RcAddr;
use crate::listener::Expiring;
use crate::{ChangeListener, InvalidationListener, ObservableValue};

/// Most observables have one or two listeners, which stay inline.
pub(crate) type Snapshot<L> = SmallVec<[RcAddr<L>; 2]>;

/// Registration-ordered listeners of one kind.
pub(crate) struct ListenerList<L: ?Sized> {
	listeners: Snapshot<L>,
}

impl<L: ?Sized + Expiring> ListenerList<L> {
	pub const fn new() -> Self {
		ListenerList {
			listeners: SmallVec::new_const(),
		}
	}

	pub fn add(&mut self, listener: Rc<L>) {
		self.prune();
		self.listeners.push(RcAddr::new(listener));
	}

	pub fn remove(&mut self, listener: &Rc<L>) -> bool {
		match self.listeners.iter().position(|item| item.is(listener)) {
			Some(index) => {
				self.listeners.remove(index);
				true
			}
			None => false,
		}
	}

	/// Dispatch iterates over this copy, so listeners may add or remove
	/// registrations while being called.
	pub fn snapshot(&self) -> Snapshot<L> {
		self.listeners.clone()
	}

	pub fn prune(&mut self) {
		self.listeners.retain(|item| !item.expired());
	}

	pub fn is_empty(&self) -> bool {
		self.listeners.is_empty()
	}

	pub fn len(&self) -> usize {
		self.listeners.len()
	}
}

/// Listener registry and dispatcher owned by one observable value.
pub struct ExpressionHelper<T> {
	inner: RefCell<HelperInner<T>>,
}

struct HelperInner<T> {
	invalidation: ListenerList<dyn InvalidationListener>,
	change: ListenerList<dyn ChangeListener<T>>,
	/// The value change listeners saw last. Only kept while change
	/// listeners exist.
	current: Option<T>,
}

impl<T> Default for ExpressionHelper<T>
where
	T: Clone + PartialEq + 'static,
{
	fn default() -> Self {
		Self::new()
	}
}

impl<T> ExpressionHelper<T>
where
	T: Clone + PartialEq + 'static,
{
	pub fn new() -> Self {
		ExpressionHelper {
			inner: RefCell::new(HelperInner {
				invalidation: ListenerList::new(),
				change: ListenerList::new(),
				current: None,
			}),
		}
	}

	pub fn add_invalidation_listener(&self, listener: Rc<dyn InvalidationListener>) {
		self.inner.borrow_mut().invalidation.add(listener);
	}

	pub fn remove_invalidation_listener(&self, listener: &Rc<dyn InvalidationListener>) -> bool {
		self.inner.borrow_mut().invalidation.remove(listener)
	}

	/// The first change listener captures the owner's current value so
	/// that the next event can report it as `old`.
	pub fn add_change_listener<O>(&self, observable: &O, listener: Rc<dyn ChangeListener<T>>)
	where
		O: ObservableValue<T>,
	{
		let first = self.inner.borrow().change.is_empty();
		let current = if first {
			Some(observable.value())
		} else {
			None
		};

		let mut inner = self.inner.borrow_mut();
		if current.is_some() {
			inner.current = current;
		}
		inner.change.add(listener);
	}

	pub fn remove_change_listener(&self, listener: &Rc<dyn ChangeListener<T>>) -> bool {
		let mut inner = self.inner.borrow_mut();
		let removed = inner.change.remove(listener);
		if inner.change.is_empty() {
			inner.current = None;
		}
		removed
	}

	pub fn has_listeners(&self) -> bool {
		let inner = self.inner.borrow();
		!inner.invalidation.is_empty() || !inner.change.is_empty()
	}

	pub fn listener_count(&self) -> usize {
		let inner = self.inner.borrow();
		inner.invalidation.len() + inner.change.len()
	}

	/// Notifies invalidation listeners, then change listeners if the
	/// value `observable` reports now differs from the one they saw last.
	pub fn fire_value_changed_event<O>(&self, observable: &O)
	where
		O: ObservableValue<T>,
	{
		let (invalidation, change) = {
			let inner = self.inner.borrow();
			(inner.invalidation.snapshot(), inner.change.snapshot())
		};

		for listener in &invalidation {
			listener.invalidated(observable);
		}

		if !change.is_empty() {
			let new = observable.value();
			let old = self.inner.borrow_mut().current.replace(new.clone());

			if let Some(old) = old {
				if old != new {
					for listener in &change {
						listener.changed(observable, &old, &new);
					}
				}
			}
		}

		let mut inner = self.inner.borrow_mut();
		inner.invalidation.prune();
		inner.change.prune();
		if inner.change.is_empty() {
			inner.current = None;
		}
	}
}
