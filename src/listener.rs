use std::rc::{Rc, Weak};

use crate::list::ListChangeListener;
use crate::{Observable, ObservableValue};

/// Told that an observable may have changed. Reading the new value is
/// left to the listener, which keeps invalidation lazy.
pub trait InvalidationListener {
	fn invalidated(&self, observable: &dyn Observable);

	/// A listener whose target is gone reports `true` here and is
	/// removed by the registry on its next pass.
	fn was_dropped(&self) -> bool {
		false
	}
}

impl<F> InvalidationListener for F
where
	F: Fn(&dyn Observable),
{
	fn invalidated(&self, observable: &dyn Observable) {
		self(observable)
	}
}

/// Told the concrete old and new value after every change.
pub trait ChangeListener<T> {
	fn changed(&self, observable: &dyn ObservableValue<T>, old: &T, new: &T);

	fn was_dropped(&self) -> bool {
		false
	}
}

impl<T, F> ChangeListener<T> for F
where
	F: Fn(&dyn ObservableValue<T>, &T, &T),
{
	fn changed(&self, observable: &dyn ObservableValue<T>, old: &T, new: &T) {
		self(observable, old, new)
	}
}

/// Forwards to a listener without keeping it alive. The caller owns the
/// strong reference and the registration ends when it is dropped.
pub struct WeakInvalidationListener {
	listener: Weak<dyn InvalidationListener>,
}

impl WeakInvalidationListener {
	pub fn new(listener: &Rc<dyn InvalidationListener>) -> Self {
		WeakInvalidationListener {
			listener: Rc::downgrade(listener),
		}
	}
}

impl InvalidationListener for WeakInvalidationListener {
	fn invalidated(&self, observable: &dyn Observable) {
		if let Some(listener) = self.listener.upgrade() {
			listener.invalidated(observable)
		}
	}

	fn was_dropped(&self) -> bool {
		self.listener.strong_count() == 0
	}
}

pub struct WeakChangeListener<T> {
	listener: Weak<dyn ChangeListener<T>>,
}

impl<T> WeakChangeListener<T> {
	pub fn new(listener: &Rc<dyn ChangeListener<T>>) -> Self {
		WeakChangeListener {
			listener: Rc::downgrade(listener),
		}
	}
}

impl<T> ChangeListener<T> for WeakChangeListener<T> {
	fn changed(&self, observable: &dyn ObservableValue<T>, old: &T, new: &T) {
		if let Some(listener) = self.listener.upgrade() {
			listener.changed(observable, old, new)
		}
	}

	fn was_dropped(&self) -> bool {
		self.listener.strong_count() == 0
	}
}

/// Uniform access to `was_dropped` for the listener registries.
pub(crate) trait Expiring {
	fn expired(&self) -> bool;
}

impl Expiring for dyn InvalidationListener {
	fn expired(&self) -> bool {
		self.was_dropped()
	}
}

impl<T> Expiring for dyn ChangeListener<T> {
	fn expired(&self) -> bool {
		self.was_dropped()
	}
}

impl<E> Expiring for dyn ListChangeListener<E> {
	fn expired(&self) -> bool {
		self.was_dropped()
	}
}

