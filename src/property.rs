use std::borrow::Cow;
use std::cell::RefCell;
use std::fmt::{self, Debug};
use std::rc::{Rc, Weak};

use fxhash::FxHashMap;

use crate::addr::addr_of;
use crate::bidirectional;
use crate::{
	Binding, ChangeListener, Error, ExpressionHelper, InvalidationListener, Observable, ObservableValue,
	Property, PropertyName, ReadOnlyProperty, Result, State, Value, WritableValue,
};

pub type BooleanProperty = SimpleProperty<bool>;
pub type IntegerProperty = SimpleProperty<i32>;
pub type LongProperty = SimpleProperty<i64>;
pub type FloatProperty = SimpleProperty<f32>;
pub type DoubleProperty = SimpleProperty<f64>;
pub type StringProperty = SimpleProperty<Option<String>>;
pub type ObjectProperty<T> = SimpleProperty<Option<T>>;

/// Scalar types whose properties replace an absent source value with
/// a zero value.
pub trait Primitive: Copy + PartialEq + 'static {
	const ZERO: Self;
}

impl Primitive for bool {
	const ZERO: Self = false;
}

impl Primitive for i32 {
	const ZERO: Self = 0;
}

impl Primitive for i64 {
	const ZERO: Self = 0;
}

impl Primitive for f32 {
	const ZERO: Self = 0.0;
}

impl Primitive for f64 {
	const ZERO: Self = 0.0;
}

/// A writable, bindable value. Cloning the handle shares the property.
pub struct SimpleProperty<T> {
	body: Rc<PropertyBody<T>>,
}

impl<T> Clone for SimpleProperty<T> {
	fn clone(&self) -> Self {
		Self {
			body: self.body.clone(),
		}
	}
}

pub struct PropertyBody<T> {
	name: PropertyName,
	state: RefCell<PropertyState<T>>,
	hook: RefCell<Option<Rc<dyn Fn()>>>,
	helper: ExpressionHelper<T>,
	/// Bidirectional bindings of this property, keyed by the address of
	/// the other side.
	pub(crate) peers: RefCell<FxHashMap<usize, Rc<dyn InvalidationListener>>>,
	this: Weak<PropertyBody<T>>,
}

struct PropertyState<T> {
	value: T,
	state: State,
	source: Option<Value<T>>,
	listener: Option<Rc<dyn InvalidationListener>>,
	firing: bool,
	/// Set by a nested invalidation while `firing`.
	pending: bool,
}

/// Invalidates the bound property. Holds it weakly so that a source
/// does not keep its dependents alive.
struct SourceListener<T> {
	target: Weak<PropertyBody<T>>,
}

impl<T> InvalidationListener for SourceListener<T>
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

struct Firing<'a, T>(&'a RefCell<PropertyState<T>>);

impl<'a, T> Drop for Firing<'a, T> {
	fn drop(&mut self) {
		if let Ok(mut state) = self.0.try_borrow_mut() {
			state.firing = false;
			state.pending = false;
		}
	}
}

impl<T> PropertyBody<T>
where
	T: Clone + PartialEq + 'static,
{
	fn new(name: PropertyName, value: T) -> Rc<Self> {
		Rc::new_cyclic(|this| PropertyBody {
			name,
			state: RefCell::new(PropertyState {
				value,
				state: State::Valid,
				source: None,
				listener: None,
				firing: false,
				pending: false,
			}),
			hook: RefCell::new(None),
			helper: ExpressionHelper::new(),
			peers: RefCell::new(FxHashMap::default()),
			this: this.clone(),
		})
	}

	pub fn get(&self) -> T {
		let source = {
			let mut state = self.state.borrow_mut();
			state.state = State::Valid;
			match &state.source {
				Some(source) => source.clone(),
				None => return state.value.clone(),
			}
		};

		source.get()
	}

	pub fn set(&self, value: T) -> Result<()> {
		{
			let mut state = self.state.borrow_mut();
			if state.source.is_some() {
				return Err(Error::BoundPropertyMutation(self.name.clone()));
			}

			if state.value == value {
				return Ok(());
			}

			state.value = value;
		}

		self.mark_invalid();
		Ok(())
	}

	/// Fires at most once until the value is read again. A nested call
	/// made while listeners are running updates the state and is
	/// dispatched once the current pass is over.
	pub(crate) fn mark_invalid(&self) {
		let dispatch = {
			let mut state = self.state.borrow_mut();
			if state.state != State::Valid {
				return;
			}

			state.state = State::Invalid;
			if state.firing {
				state.pending = true;
				false
			} else {
				state.firing = true;
				true
			}
		};

		tracing::trace!(property = %self.name, "invalidated");

		let hook = self.hook.borrow().clone();
		if let Some(hook) = hook {
			hook();
		}

		if dispatch {
			let _firing = Firing(&self.state);
			loop {
				self.helper.fire_value_changed_event(self);
				if !std::mem::take(&mut self.state.borrow_mut().pending) {
					break;
				}
			}
		}
	}

	pub fn bind(&self, source: Value<T>) -> Result<()> {
		if source.addr() == self.addr() {
			return Err(Error::SelfBinding(self.name.clone()));
		}

		if let Some(current) = &self.state.borrow().source {
			if current.addr() == source.addr() {
				return Ok(());
			}
		}

		self.unbind();

		let listener: Rc<dyn InvalidationListener> = Rc::new(SourceListener {
			target: self.this.clone(),
		});
		source.add_invalidation_listener(listener.clone());

		{
			let mut state = self.state.borrow_mut();
			state.source = Some(source);
			state.listener = Some(listener);
		}

		self.mark_invalid();
		Ok(())
	}

	pub fn unbind(&self) {
		let (source, listener) = {
			let mut state = self.state.borrow_mut();
			match (state.source.take(), state.listener.take()) {
				(Some(source), Some(listener)) => (source, listener),
				_ => return,
			}
		};

		let value = source.get();
		self.state.borrow_mut().value = value;
		source.remove_invalidation_listener(&listener);
	}

	pub fn is_bound(&self) -> bool {
		self.state.borrow().source.is_some()
	}

	pub fn name(&self) -> &PropertyName {
		&self.name
	}

	pub(crate) fn addr(&self) -> usize {
		self.this.as_ptr() as *const () as usize
	}
}

impl<T> Observable for PropertyBody<T>
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

impl<T> ObservableValue<T> for PropertyBody<T>
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

impl<T> Default for SimpleProperty<T>
where
	T: Clone + PartialEq + Default + 'static,
{
	fn default() -> Self {
		SimpleProperty::new(Default::default())
	}
}

impl<T> SimpleProperty<T>
where
	T: Clone + PartialEq + 'static,
{
	pub fn new(value: T) -> Self {
		Self::with_name(PropertyName::default(), value)
	}

	pub fn named(name: impl Into<Cow<'static, str>>, value: T) -> Self {
		Self::with_name(PropertyName::new(name), value)
	}

	pub fn with_bean(
		bean: impl Into<Cow<'static, str>>,
		name: impl Into<Cow<'static, str>>,
		value: T,
	) -> Self {
		Self::with_name(PropertyName::with_bean(bean, name), value)
	}

	pub fn with_name(name: PropertyName, value: T) -> Self {
		SimpleProperty {
			body: PropertyBody::new(name, value),
		}
	}

	/// Installs the hook that runs each time the property becomes
	/// invalid, before any listener is notified. Replaces a previous hook.
	pub fn on_invalidated(&self, hook: impl Fn() + 'static) {
		*self.body.hook.borrow_mut() = Some(Rc::new(hook));
	}

	#[inline]
	pub fn get(&self) -> T {
		self.body.get()
	}

	#[inline]
	pub fn set(&self, value: T) -> Result<()> {
		self.body.set(value)
	}

	#[inline]
	pub fn update(&self, func: impl FnOnce(&mut T)) -> Result<()> {
		let mut value = self.get();
		func(&mut value);
		self.set(value)
	}

	pub fn bind(&self, source: impl Into<Value<T>>) -> Result<()> {
		self.body.bind(source.into())
	}

	#[inline]
	pub fn unbind(&self) {
		self.body.unbind()
	}

	#[inline]
	pub fn is_bound(&self) -> bool {
		self.body.is_bound()
	}

	pub fn bind_bidirectional(&self, other: &SimpleProperty<T>) -> Result<()> {
		bidirectional::bind(self, other)
	}

	pub fn unbind_bidirectional(&self, other: &SimpleProperty<T>) {
		bidirectional::unbind(self, other)
	}

	pub fn name(&self) -> &PropertyName {
		self.body.name()
	}

	pub fn listener_count(&self) -> usize {
		self.body.helper.listener_count()
	}

	pub(crate) fn body(&self) -> &Rc<PropertyBody<T>> {
		&self.body
	}

	pub(crate) fn addr(&self) -> usize {
		addr_of(&self.body)
	}
}

impl<T> SimpleProperty<T>
where
	T: Primitive,
{
	/// Binds to a source that may be absent. `None` reads as the zero
	/// value of `T`.
	pub fn bind_nullable(&self, source: impl Into<Value<Option<T>>>) -> Result<()> {
		let binding = Binding::map(source, |value: &Option<T>| value.unwrap_or(T::ZERO));
		self.bind(binding)
	}

	/// An object property kept equal to this one in both directions.
	/// Setting it to `None` writes the zero value here.
	pub fn as_object(&self) -> ObjectProperty<T> {
		let object = SimpleProperty::with_name(self.name().clone(), Some(self.get()));
		bidirectional::attach_converted(
			&object,
			self,
			|value: &T| Some(*value),
			|object: &Option<T>| object.unwrap_or(T::ZERO),
		);
		object
	}

	/// A primitive property kept equal to `object` in both directions.
	pub fn from_object(object: &ObjectProperty<T>) -> Self {
		let property = SimpleProperty::with_name(object.name().clone(), object.get().unwrap_or(T::ZERO));
		bidirectional::attach_converted(
			&property,
			object,
			|object: &Option<T>| object.unwrap_or(T::ZERO),
			|value: &T| Some(*value),
		);
		property
	}
}

impl<T> Observable for SimpleProperty<T>
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

impl<T> ObservableValue<T> for SimpleProperty<T>
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

impl<T> ReadOnlyProperty<T> for SimpleProperty<T>
where
	T: Clone + PartialEq + 'static,
{
	fn name(&self) -> &PropertyName {
		self.body.name()
	}
}

impl<T> WritableValue<T> for SimpleProperty<T>
where
	T: Clone + PartialEq + 'static,
{
	fn set_value(&self, value: T) -> Result<()> {
		self.body.set(value)
	}
}

impl<T> Property<T> for SimpleProperty<T>
where
	T: Clone + PartialEq + 'static,
{
	fn bind(&self, source: Value<T>) -> Result<()> {
		self.body.bind(source)
	}

	fn unbind(&self) {
		self.body.unbind()
	}

	fn is_bound(&self) -> bool {
		self.body.is_bound()
	}

	fn bind_bidirectional(&self, other: &Self) -> Result<()> {
		bidirectional::bind(self, other)
	}

	fn unbind_bidirectional(&self, other: &Self) {
		bidirectional::unbind(self, other)
	}
}

impl<T> From<SimpleProperty<T>> for Value<T>
where
	T: Clone + PartialEq + 'static,
{
	fn from(property: SimpleProperty<T>) -> Self {
		Value::new(property.body)
	}
}

impl<T> From<&SimpleProperty<T>> for Value<T>
where
	T: Clone + PartialEq + 'static,
{
	fn from(property: &SimpleProperty<T>) -> Self {
		Value::new(property.body.clone())
	}
}

impl<T> Debug for SimpleProperty<T>
where
	T: Debug,
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let state = self.body.state.borrow();
		let mut debug = f.debug_struct("SimpleProperty");
		debug.field("name", &self.body.name.to_string());
		match state.source {
			Some(_) => debug.field("bound", &true),
			None => debug.field("value", &state.value),
		};
		debug.field("valid", &(state.state == State::Valid)).finish()
	}
}

/// Owns a property that only its holder can write and hands out
/// read-only views of it.
pub struct ReadOnlyWrapper<T> {
	property: SimpleProperty<T>,
}

impl<T> ReadOnlyWrapper<T>
where
	T: Clone + PartialEq + 'static,
{
	pub fn new(value: T) -> Self {
		ReadOnlyWrapper {
			property: SimpleProperty::new(value),
		}
	}

	pub fn with_name(name: PropertyName, value: T) -> Self {
		ReadOnlyWrapper {
			property: SimpleProperty::with_name(name, value),
		}
	}

	pub fn get(&self) -> T {
		self.property.get()
	}

	pub fn set(&self, value: T) -> Result<()> {
		self.property.set(value)
	}

	/// The writable side. Binding it is allowed, views follow it.
	pub fn property(&self) -> &SimpleProperty<T> {
		&self.property
	}

	pub fn read_only(&self) -> ReadOnlyView<T> {
		ReadOnlyView {
			body: self.property.body.clone(),
		}
	}
}

pub struct ReadOnlyView<T> {
	body: Rc<PropertyBody<T>>,
}

impl<T> Clone for ReadOnlyView<T> {
	fn clone(&self) -> Self {
		ReadOnlyView {
			body: self.body.clone(),
		}
	}
}

impl<T> ReadOnlyView<T>
where
	T: Clone + PartialEq + 'static,
{
	pub fn get(&self) -> T {
		self.body.get()
	}

	pub fn name(&self) -> &PropertyName {
		self.body.name()
	}

	pub(crate) fn body(&self) -> &Rc<PropertyBody<T>> {
		&self.body
	}
}

impl<T> Observable for ReadOnlyView<T>
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

impl<T> ObservableValue<T> for ReadOnlyView<T>
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

impl<T> ReadOnlyProperty<T> for ReadOnlyView<T>
where
	T: Clone + PartialEq + 'static,
{
	fn name(&self) -> &PropertyName {
		self.body.name()
	}
}

impl<T> From<ReadOnlyView<T>> for Value<T>
where
	T: Clone + PartialEq + 'static,
{
	fn from(view: ReadOnlyView<T>) -> Self {
		Value::new(view.body)
	}
}
