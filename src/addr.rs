use std::ops::Deref;
use std::rc::Rc;

/// Thin address of the value behind an `Rc`. Vtables are ignored, so two
/// trait objects built from the same allocation compare equal.
#[inline]
pub(crate) fn addr_of<T: ?Sized>(ptr: &Rc<T>) -> usize {
	Rc::as_ptr(ptr) as *const () as usize
}

#[inline]
pub(crate) fn addr_of_ref<T: ?Sized>(value: &T) -> usize {
	value as *const T as *const () as usize
}

/// An `Rc` compared by the address it points to.
pub(crate) struct RcAddr<T: ?Sized> {
	ptr: Rc<T>,
}

impl<T: ?Sized> RcAddr<T> {
	pub fn new(ptr: Rc<T>) -> Self {
		RcAddr { ptr }
	}

	pub fn is(&self, other: &Rc<T>) -> bool {
		addr_of(&self.ptr) == addr_of(other)
	}
}

impl<T: ?Sized> Clone for RcAddr<T> {
	fn clone(&self) -> Self {
		RcAddr {
			ptr: self.ptr.clone(),
		}
	}
}

impl<T: ?Sized> Deref for RcAddr<T> {
	type Target = Rc<T>;
	fn deref(&self) -> &Self::Target {
		&self.ptr
	}
}

impl<T: ?Sized> PartialEq for RcAddr<T> {
	fn eq(&self, other: &Self) -> bool {
		addr_of(&self.ptr) == addr_of(&other.ptr)
	}
}

impl<T: ?Sized> Eq for RcAddr<T> {}
