use std::rc::Rc;

use crate::addr::addr_of;
use crate::{ChangeListener, InvalidationListener, Observable, ObservableValue};

/// A type-erased, shared handle to any observable value. This is what
/// properties bind to.
pub struct Value<T> {
	value: Rc<dyn ObservableValue<T>>,
}

impl<T> Clone for Value<T> {
	fn clone(&self) -> Self {
		Value {
			value: self.value.clone(),
		}
	}
}

impl<T> Value<T>
where
	T: 'static,
{
	pub fn new(value: Rc<dyn ObservableValue<T>>) -> Self {
		Value { value }
	}

	pub fn get(&self) -> T {
		self.value.value()
	}

	/// Address of the observable behind this handle.
	pub(crate) fn addr(&self) -> usize {
		addr_of(&self.value)
	}
}

impl<T> Observable for Value<T>
where
	T: 'static,
{
	fn add_invalidation_listener(&self, listener: Rc<dyn InvalidationListener>) {
		self.value.add_invalidation_listener(listener)
	}

	fn remove_invalidation_listener(&self, listener: &Rc<dyn InvalidationListener>) {
		self.value.remove_invalidation_listener(listener)
	}
}

impl<T> ObservableValue<T> for Value<T>
where
	T: 'static,
{
	fn value(&self) -> T {
		self.value.value()
	}

	fn add_change_listener(&self, listener: Rc<dyn ChangeListener<T>>) {
		self.value.add_change_listener(listener)
	}

	fn remove_change_listener(&self, listener: &Rc<dyn ChangeListener<T>>) {
		self.value.remove_change_listener(listener)
	}
}
