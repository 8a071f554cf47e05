use std::rc::Rc;

use crate::{ChangeListener, InvalidationListener, Observable, ObservableValue, Value};

/// An observable value that never changes. Listeners are accepted and
/// never called.
pub struct Const<T> {
	body: Rc<ConstBody<T>>,
}

impl<T> Clone for Const<T> {
	fn clone(&self) -> Self {
		Const {
			body: self.body.clone(),
		}
	}
}

struct ConstBody<T> {
	value: T,
}

impl<T> Const<T> {
	pub fn new(value: T) -> Self {
		Const {
			body: Rc::new(ConstBody { value }),
		}
	}

	pub fn get(&self) -> &T {
		&self.body.value
	}
}

impl<T> Observable for ConstBody<T> {
	fn add_invalidation_listener(&self, _: Rc<dyn InvalidationListener>) {}
	fn remove_invalidation_listener(&self, _: &Rc<dyn InvalidationListener>) {}
}

impl<T> ObservableValue<T> for ConstBody<T>
where
	T: Clone,
{
	fn value(&self) -> T {
		self.value.clone()
	}

	fn add_change_listener(&self, _: Rc<dyn ChangeListener<T>>) {}
	fn remove_change_listener(&self, _: &Rc<dyn ChangeListener<T>>) {}
}

impl<T> Observable for Const<T> {
	fn add_invalidation_listener(&self, _: Rc<dyn InvalidationListener>) {}
	fn remove_invalidation_listener(&self, _: &Rc<dyn InvalidationListener>) {}
}

impl<T> ObservableValue<T> for Const<T>
where
	T: Clone,
{
	fn value(&self) -> T {
		self.body.value()
	}

	fn add_change_listener(&self, _: Rc<dyn ChangeListener<T>>) {}
	fn remove_change_listener(&self, _: &Rc<dyn ChangeListener<T>>) {}
}

impl<T> From<Const<T>> for Value<T>
where
	T: Clone + 'static,
{
	fn from(constant: Const<T>) -> Self {
		Value::new(constant.body)
	}
}
