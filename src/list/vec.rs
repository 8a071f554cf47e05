use std::cell::{Ref, RefCell};
use std::cmp::Ordering;
use std::fmt::{self, Debug};
use std::ops::Range;
use std::rc::Rc;

use crate::addr::addr_of;
use crate::list::helper::ListListenerHelper;
use crate::list::{ListChangeListener, ObservableList, SortHelper, SourceChain, SubChange};
use crate::{Dependency, Error, InvalidationListener, Observable, Result};

/// A mutable list that reports every modification to its listeners.
/// Cloning the handle shares the list.
pub struct ObservableVec<E> {
	body: Rc<ObservableVecBody<E>>,
}

impl<E> Clone for ObservableVec<E> {
	fn clone(&self) -> Self {
		Self {
			body: self.body.clone(),
		}
	}
}

struct ObservableVecBody<E> {
	items: RefCell<Vec<E>>,
	helper: ListListenerHelper<E>,
}

impl<E> Default for ObservableVec<E>
where
	E: Clone + 'static,
{
	fn default() -> Self {
		Self::new()
	}
}

impl<E> ObservableVec<E>
where
	E: Clone + 'static,
{
	pub fn new() -> Self {
		Self::from_vec(Vec::new())
	}

	pub fn from_vec(items: Vec<E>) -> Self {
		ObservableVec {
			body: Rc::new(ObservableVecBody {
				items: RefCell::new(items),
				helper: ListListenerHelper::new(),
			}),
		}
	}

	pub fn len(&self) -> usize {
		self.body.items.borrow().len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn get(&self, index: usize) -> Result<E> {
		self.body.get(index)
	}

	pub fn to_vec(&self) -> Vec<E> {
		self.body.items.borrow().clone()
	}

	/// Reads the elements without copying them. Mutating the list from
	/// `func` panics.
	pub fn with<R>(&self, func: impl FnOnce(&[E]) -> R) -> R {
		func(&self.body.items.borrow())
	}

	pub fn push(&self, value: E) {
		let index = self.body.items.borrow().len();
		self.body.items.borrow_mut().push(value);
		self.fire(vec![SubChange::Added {
			from: index,
			to: index + 1,
		}]);
	}

	pub fn insert(&self, index: usize, value: E) -> Result<()> {
		self.insert_all(index, [value])
	}

	pub fn insert_all(&self, index: usize, values: impl IntoIterator<Item = E>) -> Result<()> {
		let added = {
			let mut items = self.body.items.borrow_mut();
			if index > items.len() {
				return Err(Error::out_of_range(index, items.len()));
			}

			let before = items.len();
			items.splice(index..index, values);
			items.len() - before
		};

		if added > 0 {
			self.fire(vec![SubChange::Added {
				from: index,
				to: index + added,
			}]);
		}
		Ok(())
	}

	pub fn extend(&self, values: impl IntoIterator<Item = E>) {
		let index = self.len();
		// Appending at the end never fails.
		let _ = self.insert_all(index, values);
	}

	pub fn remove(&self, index: usize) -> Result<E> {
		let removed = {
			let mut items = self.body.items.borrow_mut();
			if index >= items.len() {
				return Err(Error::out_of_range(index, items.len()));
			}
			items.remove(index)
		};

		self.fire(vec![SubChange::Removed {
			from: index,
			removed: vec![removed.clone()],
		}]);
		Ok(removed)
	}

	pub fn remove_range(&self, range: Range<usize>) -> Result<Vec<E>> {
		let removed = {
			let mut items = self.body.items.borrow_mut();
			if range.start > range.end || range.end > items.len() {
				return Err(Error::out_of_range(range.end.max(range.start), items.len()));
			}
			items.drain(range.clone()).collect::<Vec<_>>()
		};

		if !removed.is_empty() {
			self.fire(vec![SubChange::Removed {
				from: range.start,
				removed: removed.clone(),
			}]);
		}
		Ok(removed)
	}

	pub fn pop(&self) -> Option<E> {
		let index = self.len().checked_sub(1)?;
		self.remove(index).ok()
	}

	pub fn clear(&self) {
		let removed = std::mem::take(&mut *self.body.items.borrow_mut());
		if !removed.is_empty() {
			self.fire(vec![SubChange::Removed { from: 0, removed }]);
		}
	}

	/// Replaces the element at `index` and returns the previous one.
	pub fn set(&self, index: usize, value: E) -> Result<E> {
		let old = {
			let mut items = self.body.items.borrow_mut();
			let len = items.len();
			let slot = items.get_mut(index).ok_or(Error::out_of_range(index, len))?;
			std::mem::replace(slot, value)
		};

		self.fire(vec![
			SubChange::Removed {
				from: index,
				removed: vec![old.clone()],
			},
			SubChange::Added {
				from: index,
				to: index + 1,
			},
		]);
		Ok(old)
	}

	/// Replaces the whole content.
	pub fn set_all(&self, values: impl IntoIterator<Item = E>) {
		let (removed, added) = {
			let mut items = self.body.items.borrow_mut();
			let removed = std::mem::replace(&mut *items, values.into_iter().collect());
			(removed, items.len())
		};

		let mut changes = Vec::with_capacity(2);
		if !removed.is_empty() {
			changes.push(SubChange::Removed { from: 0, removed });
		}
		if added > 0 {
			changes.push(SubChange::Added { from: 0, to: added });
		}
		self.fire(changes);
	}

	/// Keeps the elements for which `keep` returns `true`. Each run of
	/// dropped elements is reported as one removal.
	pub fn retain(&self, mut keep: impl FnMut(&E) -> bool) {
		let changes = {
			let mut items = self.body.items.borrow_mut();
			let mut kept = Vec::with_capacity(items.len());
			let mut changes = Vec::new();

			for item in items.drain(..) {
				if keep(&item) {
					kept.push(item);
					continue;
				}

				let from = kept.len();
				match changes.last_mut() {
					Some(SubChange::Removed { from: last, removed }) if *last == from => removed.push(item),
					_ => changes.push(SubChange::Removed {
						from,
						removed: vec![item],
					}),
				}
			}

			*items = kept;
			changes
		};

		self.fire(changes);
	}

	/// Modifies the element at `index` in place and reports an update.
	pub fn update(&self, index: usize, func: impl FnOnce(&mut E)) -> Result<()> {
		{
			let mut items = self.body.items.borrow_mut();
			let len = items.len();
			let item = items.get_mut(index).ok_or(Error::out_of_range(index, len))?;
			func(item);
		}

		self.fire(vec![SubChange::Updated {
			from: index,
			to: index + 1,
		}]);
		Ok(())
	}

	/// Stable sort, reported as one permutation.
	pub fn sort_by(&self, compare: impl FnMut(&E, &E) -> Ordering) {
		let moved = SortHelper::new().sort_by(&mut self.body.items.borrow_mut(), compare);
		if let Some(change) = SubChange::permutation_of(moved) {
			self.fire(vec![change]);
		}
	}

	pub fn sort(&self)
	where
		E: Ord,
	{
		self.sort_by(E::cmp)
	}

	pub fn listener_count(&self) -> usize {
		self.body.helper.listener_count()
	}

	fn fire(&self, changes: Vec<SubChange<E>>) {
		self.body.helper.fire(&*self.body, changes);
	}
}

impl<E> ObservableVecBody<E>
where
	E: Clone + 'static,
{
	fn get(&self, index: usize) -> Result<E> {
		let items = self.items.borrow();
		items.get(index).cloned().ok_or(Error::out_of_range(index, items.len()))
	}

	fn items(&self) -> Ref<'_, Vec<E>> {
		self.items.borrow()
	}
}

impl<E> Observable for ObservableVecBody<E>
where
	E: Clone + 'static,
{
	fn add_invalidation_listener(&self, listener: Rc<dyn InvalidationListener>) {
		self.helper.add_invalidation_listener(listener);
	}

	fn remove_invalidation_listener(&self, listener: &Rc<dyn InvalidationListener>) {
		self.helper.remove_invalidation_listener(listener);
	}
}

impl<E> SourceChain for ObservableVecBody<E> {
	fn chain_id(&self) -> usize {
		self as *const Self as *const () as usize
	}
}

impl<E> ObservableList<E> for ObservableVecBody<E>
where
	E: Clone + 'static,
{
	fn len(&self) -> usize {
		self.items().len()
	}

	fn get(&self, index: usize) -> Result<E> {
		ObservableVecBody::get(self, index)
	}

	fn to_vec(&self) -> Vec<E> {
		self.items().clone()
	}

	fn add_list_listener(&self, listener: Rc<dyn ListChangeListener<E>>) {
		self.helper.add_list_listener(listener);
	}

	fn remove_list_listener(&self, listener: &Rc<dyn ListChangeListener<E>>) {
		self.helper.remove_list_listener(listener);
	}

	fn chain(self: Rc<Self>) -> Rc<dyn SourceChain> {
		self
	}
}

impl<E> Observable for ObservableVec<E>
where
	E: Clone + 'static,
{
	fn add_invalidation_listener(&self, listener: Rc<dyn InvalidationListener>) {
		self.body.add_invalidation_listener(listener)
	}

	fn remove_invalidation_listener(&self, listener: &Rc<dyn InvalidationListener>) {
		self.body.remove_invalidation_listener(listener)
	}
}

impl<E> SourceChain for ObservableVec<E> {
	fn chain_id(&self) -> usize {
		addr_of(&self.body)
	}
}

impl<E> ObservableList<E> for ObservableVec<E>
where
	E: Clone + 'static,
{
	fn len(&self) -> usize {
		ObservableVec::len(self)
	}

	fn get(&self, index: usize) -> Result<E> {
		self.body.get(index)
	}

	fn to_vec(&self) -> Vec<E> {
		ObservableVec::to_vec(self)
	}

	fn add_list_listener(&self, listener: Rc<dyn ListChangeListener<E>>) {
		self.body.add_list_listener(listener)
	}

	fn remove_list_listener(&self, listener: &Rc<dyn ListChangeListener<E>>) {
		self.body.remove_list_listener(listener)
	}

	fn chain(self: Rc<Self>) -> Rc<dyn SourceChain> {
		self.body.clone()
	}
}

impl<E> From<ObservableVec<E>> for Rc<dyn ObservableList<E>>
where
	E: Clone + 'static,
{
	fn from(list: ObservableVec<E>) -> Self {
		list.body
	}
}

impl<E> From<&ObservableVec<E>> for Rc<dyn ObservableList<E>>
where
	E: Clone + 'static,
{
	fn from(list: &ObservableVec<E>) -> Self {
		list.body.clone()
	}
}

impl<E> Dependency for ObservableVec<E>
where
	E: Clone + 'static,
{
	fn dependency(&self) -> Rc<dyn Observable> {
		self.body.clone()
	}
}

impl<E> FromIterator<E> for ObservableVec<E>
where
	E: Clone + 'static,
{
	fn from_iter<I: IntoIterator<Item = E>>(iter: I) -> Self {
		ObservableVec::from_vec(iter.into_iter().collect())
	}
}

impl<E> Debug for ObservableVec<E>
where
	E: Debug,
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_list().entries(self.body.items.borrow().iter()).finish()
	}
}
