pub mod macros;

mod addr;
pub mod bidirectional;
mod binding;
mod r#const;
mod error;
mod helper;
pub mod list;
mod listener;
mod property;
mod value;

use std::rc::Rc;

pub use binding::{Binding, Dependency};
pub use error::{Error, PropertyName, Result};
pub use helper::ExpressionHelper;
pub use listener::{ChangeListener, InvalidationListener, WeakChangeListener, WeakInvalidationListener};
pub use property::{
	BooleanProperty, DoubleProperty, FloatProperty, IntegerProperty, LongProperty, ObjectProperty,
	Primitive, PropertyBody, ReadOnlyView, ReadOnlyWrapper, SimpleProperty, StringProperty,
};
pub use r#const::Const;
pub use value::Value;

pub trait Observable {
	/// Registers a listener that is told when this observable may
	/// have changed. The new value is not computed for it.
	fn add_invalidation_listener(&self, listener: Rc<dyn InvalidationListener>);

	/// Removes the first registration of `listener`, compared by
	/// address. Unknown listeners are ignored.
	fn remove_invalidation_listener(&self, listener: &Rc<dyn InvalidationListener>);
}

pub trait ObservableValue<T>: Observable {
	fn value(&self) -> T;

	fn add_change_listener(&self, listener: Rc<dyn ChangeListener<T>>);

	fn remove_change_listener(&self, listener: &Rc<dyn ChangeListener<T>>);
}

pub trait WritableValue<T> {
	fn set_value(&self, value: T) -> Result<()>;
}

pub trait ReadOnlyProperty<T>: ObservableValue<T> {
	fn name(&self) -> &PropertyName;
}

pub trait Property<T>: ReadOnlyProperty<T> + WritableValue<T> {
	/// Makes this property follow `source`. While bound,
	/// [`WritableValue::set_value`] fails.
	fn bind(&self, source: Value<T>) -> Result<()>;

	/// Keeps the last pulled value and stops following the source.
	/// Does nothing when not bound.
	fn unbind(&self);

	fn is_bound(&self) -> bool;

	fn bind_bidirectional(&self, other: &Self) -> Result<()>
	where
		Self: Sized;

	fn unbind_bidirectional(&self, other: &Self)
	where
		Self: Sized;
}

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum State {
	Valid,
	Invalid,
}
