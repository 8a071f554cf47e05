use std::cell::RefCell;
use std::rc::{Rc, Weak};

use smallvec::SmallVec;

use crate::{
	ChangeListener, Const, ExpressionHelper, InvalidationListener, Observable, ObservableValue, ReadOnlyView,
	SimpleProperty, State, Value,
};

/// Exposes a handle as something a [`Binding`] can depend on.
pub trait Dependency {
	fn dependency(&self) -> Rc<dyn Observable>;
}

/// A read-only value computed from other observables. It is recomputed
/// lazily, on the first read after any dependency was invalidated.
pub struct Binding<T> {
	body: Rc<BindingBody<T>>,
}

impl<T> Clone for Binding<T> {
	fn clone(&self) -> Self {
		Self {
			body: self.body.clone(),
		}
	}
}

struct BindingBody<T> {
	inner: RefCell<BindingInner<T>>,
	helper: ExpressionHelper<T>,
}

struct BindingInner<T> {
	func: Rc<dyn Fn() -> T>,
	value: Option<T>,
	state: State,
	dependencies: SmallVec<[Rc<dyn Observable>; 2]>,
	listener: Option<Rc<dyn InvalidationListener>>,
}

impl<T> BindingInner<T> {
	fn detach(&mut self) {
		if let Some(listener) = self.listener.take() {
			for dependency in self.dependencies.drain(..) {
				dependency.remove_invalidation_listener(&listener);
			}
		}
	}
}

impl<T> Drop for BindingInner<T> {
	fn drop(&mut self) {
		self.detach();
	}
}

struct DependencyListener<T> {
	target: Weak<BindingBody<T>>,
}

impl<T> InvalidationListener for DependencyListener<T>
where
	T: Clone + PartialEq + 'static,
{
	fn invalidated(&self, _: &dyn Observable) {
		if let Some(target) = self.target.upgrade() {
			target.mark_invalid();
		}
	}

	fn was_dropped(&self) -> bool {
		self.target.strong_count() == 0
	}
}

impl<T> Binding<T>
where
	T: Clone + PartialEq + 'static,
{
	pub fn new(dependencies: Vec<Rc<dyn Observable>>, compute: impl Fn() -> T + 'static) -> Self {
		let body = Rc::new_cyclic(|this: &Weak<BindingBody<T>>| {
			let listener: Rc<dyn InvalidationListener> = Rc::new(DependencyListener {
				target: this.clone(),
			});

			for dependency in &dependencies {
				dependency.add_invalidation_listener(listener.clone());
			}

			BindingBody {
				inner: RefCell::new(BindingInner {
					func: Rc::new(compute),
					value: None,
					state: State::Invalid,
					dependencies: dependencies.into_iter().collect(),
					listener: Some(listener),
				}),
				helper: ExpressionHelper::new(),
			}
		});

		Binding { body }
	}

	/// A binding that applies `func` to every value of `source`.
	pub fn map<S>(source: impl Into<Value<S>>, func: impl Fn(&S) -> T + 'static) -> Self
	where
		S: 'static,
	{
		let source = source.into();
		let dependency: Rc<dyn Observable> = Rc::new(source.clone());
		Binding::new(vec![dependency], move || func(&source.get()))
	}

	#[inline]
	pub fn get(&self) -> T {
		self.body.get()
	}

	pub fn is_valid(&self) -> bool {
		self.body.inner.borrow().state == State::Valid
	}

	/// Stops listening to the dependencies. The last computed value is
	/// kept.
	pub fn dispose(&self) {
		self.body.inner.borrow_mut().detach();
	}
}

impl<T> BindingBody<T>
where
	T: Clone + PartialEq + 'static,
{
	fn get(&self) -> T {
		let func = {
			let inner = self.inner.borrow();
			if inner.state == State::Valid {
				if let Some(value) = &inner.value {
					return value.clone();
				}
			}
			inner.func.clone()
		};

		let value = func();
		tracing::trace!("binding recomputed");

		let mut inner = self.inner.borrow_mut();
		inner.value = Some(value.clone());
		inner.state = State::Valid;
		value
	}

	fn mark_invalid(&self) {
		{
			let mut inner = self.inner.borrow_mut();
			if inner.state != State::Valid {
				return;
			}
			inner.state = State::Invalid;
		}

		self.helper.fire_value_changed_event(self);
	}
}

impl<T> Observable for BindingBody<T>
where
	T: Clone + PartialEq + 'static,
{
	fn add_invalidation_listener(&self, listener: Rc<dyn InvalidationListener>) {
		self.helper.add_invalidation_listener(listener);
	}

	fn remove_invalidation_listener(&self, listener: &Rc<dyn InvalidationListener>) {
		self.helper.remove_invalidation_listener(listener);
	}
}

impl<T> ObservableValue<T> for BindingBody<T>
where
	T: Clone + PartialEq + 'static,
{
	fn value(&self) -> T {
		self.get()
	}

	fn add_change_listener(&self, listener: Rc<dyn ChangeListener<T>>) {
		self.helper.add_change_listener(self, listener);
	}

	fn remove_change_listener(&self, listener: &Rc<dyn ChangeListener<T>>) {
		self.helper.remove_change_listener(listener);
	}
}

impl<T> Observable for Binding<T>
where
	T: Clone + PartialEq + 'static,
{
	fn add_invalidation_listener(&self, listener: Rc<dyn InvalidationListener>) {
		self.body.add_invalidation_listener(listener)
	}

	fn remove_invalidation_listener(&self, listener: &Rc<dyn InvalidationListener>) {
		self.body.remove_invalidation_listener(listener)
	}
}

impl<T> ObservableValue<T> for Binding<T>
where
	T: Clone + PartialEq + 'static,
{
	fn value(&self) -> T {
		self.body.get()
	}

	fn add_change_listener(&self, listener: Rc<dyn ChangeListener<T>>) {
		self.body.add_change_listener(listener)
	}

	fn remove_change_listener(&self, listener: &Rc<dyn ChangeListener<T>>) {
		self.body.remove_change_listener(listener)
	}
}

impl<T> From<Binding<T>> for Value<T>
where
	T: Clone + PartialEq + 'static,
{
	fn from(binding: Binding<T>) -> Self {
		Value::new(binding.body)
	}
}

impl<T> From<&Binding<T>> for Value<T>
where
	T: Clone + PartialEq + 'static,
{
	fn from(binding: &Binding<T>) -> Self {
		Value::new(binding.body.clone())
	}
}

impl<T> Dependency for Binding<T>
where
	T: Clone + PartialEq + 'static,
{
	fn dependency(&self) -> Rc<dyn Observable> {
		self.body.clone()
	}
}

impl<T> Dependency for SimpleProperty<T>
where
	T: Clone + PartialEq + 'static,
{
	fn dependency(&self) -> Rc<dyn Observable> {
		self.body().clone()
	}
}

impl<T> Dependency for ReadOnlyView<T>
where
	T: Clone + PartialEq + 'static,
{
	fn dependency(&self) -> Rc<dyn Observable> {
		self.body().clone()
	}
}

impl<T> Dependency for Value<T>
where
	T: 'static,
{
	fn dependency(&self) -> Rc<dyn Observable> {
		Rc::new(self.clone())
	}
}

impl<T> Dependency for Const<T>
where
	T: Clone + 'static,
{
	fn dependency(&self) -> Rc<dyn Observable> {
		Rc::new(self.clone())
	}
}
