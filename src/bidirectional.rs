//! Two writable properties kept equal in both directions.
//!
//! One listener is shared by both sides. Its `updating` flag stops the
//! write it performs from being echoed back, so a single external `set`
//! updates each side at most once.

use std::cell::Cell;
use std::rc::{Rc, Weak};

use crate::addr::addr_of_ref;
use crate::property::PropertyBody;
use crate::{Error, InvalidationListener, Observable, Result, SimpleProperty};

struct BidirectionalBinding<A, B> {
	first: Weak<PropertyBody<A>>,
	second: Weak<PropertyBody<B>>,
	first_addr: usize,
	to_first: Box<dyn Fn(&B) -> A>,
	to_second: Box<dyn Fn(&A) -> B>,
	updating: Cell<bool>,
}

struct Updating<'a>(&'a Cell<bool>);

impl<'a> Drop for Updating<'a> {
	fn drop(&mut self) {
		self.0.set(false);
	}
}

impl<A, B> InvalidationListener for BidirectionalBinding<A, B>
where
	A: Clone + PartialEq + 'static,
	B: Clone + PartialEq + 'static,
{
	fn invalidated(&self, observable: &dyn Observable) {
		if self.updating.get() {
			return;
		}

		let (Some(first), Some(second)) = (self.first.upgrade(), self.second.upgrade()) else {
			return;
		};

		self.updating.set(true);
		let _updating = Updating(&self.updating);

		if addr_of_ref(observable) == self.first_addr {
			let value = (self.to_second)(&first.get());
			if second.get() == value {
				return;
			}
			if let Err(error) = second.set(value) {
				tracing::warn!(%error, property = %first.name(), "bidirectional update failed, reverting");
				if let Err(error) = first.set((self.to_first)(&second.get())) {
					tracing::warn!(%error, property = %first.name(), "revert failed");
				}
			}
			second.get();
		} else {
			let value = (self.to_first)(&second.get());
			if first.get() == value {
				return;
			}
			if let Err(error) = first.set(value) {
				tracing::warn!(%error, property = %second.name(), "bidirectional update failed, reverting");
				if let Err(error) = second.set((self.to_second)(&first.get())) {
					tracing::warn!(%error, property = %second.name(), "revert failed");
				}
			}
			first.get();
		}
	}

	fn was_dropped(&self) -> bool {
		self.first.strong_count() == 0 || self.second.strong_count() == 0
	}
}

/// Keeps `first` and `second` equal. `first` takes the value of
/// `second` immediately.
pub fn bind<T>(first: &SimpleProperty<T>, second: &SimpleProperty<T>) -> Result<()>
where
	T: Clone + PartialEq + 'static,
{
	bind_converted(first, second, T::clone, T::clone)
}

/// Like [`bind`] for two property types. Each direction goes through its
/// conversion, `first` takes the converted value of `second` immediately.
pub fn bind_converted<A, B>(
	first: &SimpleProperty<A>,
	second: &SimpleProperty<B>,
	to_first: impl Fn(&B) -> A + 'static,
	to_second: impl Fn(&A) -> B + 'static,
) -> Result<()>
where
	A: Clone + PartialEq + 'static,
	B: Clone + PartialEq + 'static,
{
	if first.addr() == second.addr() {
		return Err(Error::SelfBinding(first.name().clone()));
	}

	first.set(to_first(&second.get()))?;
	first.get();

	attach_converted(first, second, to_first, to_second);
	Ok(())
}

/// Registers the shared listener without syncing. Any previous binding
/// between the two is replaced.
pub(crate) fn attach_converted<A, B>(
	first: &SimpleProperty<A>,
	second: &SimpleProperty<B>,
	to_first: impl Fn(&B) -> A + 'static,
	to_second: impl Fn(&A) -> B + 'static,
) where
	A: Clone + PartialEq + 'static,
	B: Clone + PartialEq + 'static,
{
	unbind(first, second);

	let binding: Rc<dyn InvalidationListener> = Rc::new(BidirectionalBinding {
		first: Rc::downgrade(first.body()),
		second: Rc::downgrade(second.body()),
		first_addr: first.addr(),
		to_first: Box::new(to_first),
		to_second: Box::new(to_second),
		updating: Cell::new(false),
	});

	first.body().add_invalidation_listener(binding.clone());
	second.body().add_invalidation_listener(binding.clone());

	let mut peers = first.body().peers.borrow_mut();
	peers.retain(|_, binding| !binding.was_dropped());
	peers.insert(second.addr(), binding.clone());

	let mut peers = second.body().peers.borrow_mut();
	peers.retain(|_, binding| !binding.was_dropped());
	peers.insert(first.addr(), binding);
}

/// Removes the binding between `first` and `second`, if any.
pub fn unbind<A, B>(first: &SimpleProperty<A>, second: &SimpleProperty<B>)
where
	A: Clone + PartialEq + 'static,
	B: Clone + PartialEq + 'static,
{
	let from_first = first.body().peers.borrow_mut().remove(&second.addr());
	let from_second = second.body().peers.borrow_mut().remove(&first.addr());

	if let Some(binding) = from_first {
		first.body().remove_invalidation_listener(&binding);
	}
	if let Some(binding) = from_second {
		second.body().remove_invalidation_listener(&binding);
	}
}

/// Whether `first` and `second` are bidirectionally bound to each other.
pub fn is_bound<A, B>(first: &SimpleProperty<A>, second: &SimpleProperty<B>) -> bool
where
	A: Clone + PartialEq + 'static,
	B: Clone + PartialEq + 'static,
{
	first.body().peers.borrow().contains_key(&second.addr())
}
