use std::cell::RefCell;
use std::cmp::Ordering;
use std::fmt::{self, Debug};
use std::rc::{Rc, Weak};

use crate::addr::addr_of;
use crate::list::change::{is_consistent, updated_ranges, value_at, AddRemoveTracker};
use crate::list::helper::ListListenerHelper;
use crate::list::transformation::SourceLink;
use crate::list::{
	Change, ListChangeListener, ObservableList, SortHelper, SourceChain, SourceObserver, SubChange,
	TransformationList,
};
use crate::{Dependency, Error, InvalidationListener, Observable, Result, SimpleProperty};

/// A shared ordering function. Two comparators are equal only when they
/// are the same function object.
pub struct Comparator<E>(Rc<dyn Fn(&E, &E) -> Ordering>);

impl<E> Clone for Comparator<E> {
	fn clone(&self) -> Self {
		Comparator(self.0.clone())
	}
}

impl<E> PartialEq for Comparator<E> {
	fn eq(&self, other: &Self) -> bool {
		addr_of(&self.0) == addr_of(&other.0)
	}
}

impl<E> Debug for Comparator<E> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Comparator({:#x})", addr_of(&self.0))
	}
}

impl<E> Comparator<E> {
	#[inline]
	pub fn compare(&self, a: &E, b: &E) -> Ordering {
		(self.0)(a, b)
	}
}

impl<E> Comparator<E>
where
	E: 'static,
{
	pub fn new(compare: impl Fn(&E, &E) -> Ordering + 'static) -> Self {
		Comparator(Rc::new(compare))
	}

	pub fn natural() -> Self
	where
		E: Ord,
	{
		Comparator::new(E::cmp)
	}

	pub fn by_key<K: Ord>(key: impl Fn(&E) -> K + 'static) -> Self {
		Comparator::new(move |a, b| key(a).cmp(&key(b)))
	}

	pub fn reversed(&self) -> Self {
		let compare = self.0.clone();
		Comparator::new(move |a, b| compare(b, a))
	}
}

/// A sorted view of a source list. Without a comparator it keeps the
/// source order. Equal elements keep their relative source order.
pub struct SortedList<E> {
	body: Rc<SortedBody<E>>,
}

impl<E> Clone for SortedList<E> {
	fn clone(&self) -> Self {
		Self {
			body: self.body.clone(),
		}
	}
}

struct SortedBody<E> {
	state: RefCell<SortedState<E>>,
	comparator: SimpleProperty<Option<Comparator<E>>>,
	helper: ListListenerHelper<E>,
	link: SourceLink<E>,
}

struct Element<E> {
	value: E,
	/// Index of the element in the source.
	index: usize,
}

/// `perm[sorted[view].index] == view` holds between events.
struct SortedState<E> {
	sorted: Vec<Element<E>>,
	perm: Vec<usize>,
	sorter: SortHelper,
}

fn order<E>(comparator: Option<&Comparator<E>>, a: &Element<E>, b: &Element<E>) -> Ordering {
	comparator
		.map_or(Ordering::Equal, |comparator| comparator.compare(&a.value, &b.value))
		.then_with(|| a.index.cmp(&b.index))
}

impl<E> SortedState<E>
where
	E: Clone,
{
	fn set_all(&mut self, values: Vec<E>, comparator: Option<&Comparator<E>>) {
		self.sorted = values
			.into_iter()
			.enumerate()
			.map(|(index, value)| Element { value, index })
			.collect();
		self.sorter.sort_by(&mut self.sorted, |a, b| order(comparator, a, b));
		self.rebuild_perm();
	}

	fn rebuild_perm(&mut self) {
		self.perm.clear();
		self.perm.resize(self.sorted.len(), 0);
		for (view, element) in self.sorted.iter().enumerate() {
			if let Some(slot) = self.perm.get_mut(element.index) {
				*slot = view;
			}
		}
	}

	fn resort(&mut self, comparator: Option<&Comparator<E>>) -> Option<SubChange<E>> {
		let moved = self.sorter.sort_by(&mut self.sorted, |a, b| order(comparator, a, b));
		self.rebuild_perm();
		SubChange::permutation_of(moved)
	}

	fn values(&self) -> Vec<E> {
		self.sorted.iter().map(|element| element.value.clone()).collect()
	}

	fn remove_source(&mut self, index: usize, tracker: &mut AddRemoveTracker<E>) -> bool {
		let Some(view) = self.perm.get(index).copied() else {
			return false;
		};
		if view >= self.sorted.len() {
			return false;
		}

		let element = self.sorted.remove(view);
		self.perm.remove(index);
		self.update_indices(index + 1, view, -1);
		tracker.remove(view, element.value);
		true
	}

	fn insert_source(
		&mut self,
		index: usize,
		value: E,
		comparator: Option<&Comparator<E>>,
		tracker: &mut AddRemoveTracker<E>,
	) -> bool {
		if index > self.perm.len() {
			return false;
		}

		for element in &mut self.sorted {
			if element.index >= index {
				element.index += 1;
			}
		}

		let element = Element { value, index };
		let view = self
			.sorted
			.partition_point(|other| order(comparator, other, &element) == Ordering::Less);

		for slot in &mut self.perm {
			if *slot >= view {
				*slot += 1;
			}
		}
		self.perm.insert(index, view);
		self.sorted.insert(view, element);
		tracker.insert(view);
		true
	}

	/// Shifts source indices from `from` and view indices after
	/// `view_from` by `diff`.
	fn update_indices(&mut self, from: usize, view_from: usize, diff: isize) {
		for element in &mut self.sorted {
			if element.index >= from {
				element.index = element.index.wrapping_add_signed(diff);
			}
		}
		for slot in &mut self.perm {
			if *slot > view_from {
				*slot = slot.wrapping_add_signed(diff);
			}
		}
	}

	fn permute(&mut self, from: usize, to: usize, permutation: &[usize]) {
		for element in &mut self.sorted {
			if element.index >= from && element.index < to {
				if let Some(new) = permutation.get(element.index - from) {
					element.index = *new;
				}
			}
		}
	}

	fn refresh(&mut self, index: usize, value: E) -> bool {
		let view = self.perm.get(index).copied();
		match view.and_then(|view| self.sorted.get_mut(view)) {
			Some(element) => {
				element.value = value;
				true
			}
			None => false,
		}
	}

	/// Translates one source event. `None` if the source reported
	/// something impossible.
	fn apply(&mut self, change: &mut Change<'_, E>, comparator: Option<&Comparator<E>>) -> Option<Vec<SubChange<E>>> {
		let source = change.list();
		let mut changes = Vec::new();
		let mut tracker = AddRemoveTracker::new(self.sorted.len());

		while let Some(sub) = change.next() {
			let rest = change.rest();
			match sub {
				SubChange::Removed { from, removed } => {
					if *from == 0 && removed.len() == self.sorted.len() {
						for element in std::mem::take(&mut self.sorted) {
							tracker.remove(0, element.value);
						}
						self.perm.clear();
						continue;
					}

					for _ in 0..removed.len() {
						if !self.remove_source(*from, &mut tracker) {
							return None;
						}
					}
				}
				SubChange::Added { from, to } => {
					if self.sorted.is_empty() {
						let values = (*from..*to)
							.map(|index| value_at(source, rest, index))
							.collect::<Result<Vec<_>>>()
							.ok()?;
						self.set_all(values, comparator);
						for element in &mut self.sorted {
							element.index += from;
						}
						self.rebuild_perm();
						for view in 0..self.sorted.len() {
							tracker.insert(view);
						}
						continue;
					}

					for index in *from..*to {
						let value = value_at(source, rest, index).ok()?;
						if !self.insert_source(index, value, comparator, &mut tracker) {
							return None;
						}
					}
				}
				SubChange::Permutated {
					from,
					to,
					permutation,
				} => {
					let tracker = std::mem::replace(&mut tracker, AddRemoveTracker::new(self.sorted.len()));
					changes.extend(tracker.finish());

					self.permute(*from, *to, permutation);
					changes.extend(self.resort(comparator));
				}
				SubChange::Updated { from, to } => {
					let tracker = std::mem::replace(&mut tracker, AddRemoveTracker::new(self.sorted.len()));
					changes.extend(tracker.finish());

					for index in *from..*to {
						let value = value_at(source, rest, index).ok()?;
						if !self.refresh(index, value) {
							return None;
						}
					}

					changes.extend(self.resort(comparator));
					let positions = (*from..*to).filter_map(|index| self.perm.get(index).copied()).collect();
					changes.extend(updated_ranges(positions));
				}
			}
		}

		changes.extend(tracker.finish());
		Some(changes)
	}

	/// Replaces the view with a fresh sort of `source`.
	fn rebuild(&mut self, source: &dyn ObservableList<E>, comparator: Option<&Comparator<E>>) -> Vec<SubChange<E>> {
		let removed = self.values();
		self.set_all(source.to_vec(), comparator);

		let mut changes = Vec::with_capacity(2);
		if !removed.is_empty() {
			changes.push(SubChange::Removed { from: 0, removed });
		}
		if !self.sorted.is_empty() {
			changes.push(SubChange::Added {
				from: 0,
				to: self.sorted.len(),
			});
		}
		changes
	}
}

impl<E> SortedList<E>
where
	E: Clone + 'static,
{
	/// A view in source order until a comparator is set.
	pub fn new(source: impl Into<Rc<dyn ObservableList<E>>>) -> Self {
		Self::build(source.into(), None)
	}

	pub fn with_comparator(source: impl Into<Rc<dyn ObservableList<E>>>, comparator: Comparator<E>) -> Self {
		Self::build(source.into(), Some(comparator))
	}

	fn build(source: Rc<dyn ObservableList<E>>, comparator: Option<Comparator<E>>) -> Self {
		let body = Rc::new_cyclic(|this: &Weak<SortedBody<E>>| {
			let mut state = SortedState {
				sorted: Vec::new(),
				perm: Vec::new(),
				sorter: SortHelper::new(),
			};
			state.set_all(source.to_vec(), comparator.as_ref());

			let property = SimpleProperty::with_bean("SortedList", "comparator", comparator);
			let target = this.clone();
			property.on_invalidated(move || {
				if let Some(body) = target.upgrade() {
					body.comparator_changed();
				}
			});

			SortedBody {
				state: RefCell::new(state),
				comparator: property,
				helper: ListListenerHelper::new(),
				link: SourceLink::attach(source, this.clone()),
			}
		});

		SortedList { body }
	}

	/// The comparator as a property. It can be set or bound, the view
	/// resorts on every change.
	pub fn comparator_property(&self) -> &SimpleProperty<Option<Comparator<E>>> {
		&self.body.comparator
	}

	pub fn comparator(&self) -> Option<Comparator<E>> {
		self.body.comparator.get()
	}

	pub fn set_comparator(&self, comparator: Option<Comparator<E>>) -> Result<()> {
		self.body.comparator.set(comparator)
	}

	pub fn listener_count(&self) -> usize {
		self.body.helper.listener_count()
	}
}

impl<E> SortedBody<E>
where
	E: Clone + 'static,
{
	fn comparator_changed(&self) {
		let comparator = self.comparator.get();
		let change = self.state.borrow_mut().resort(comparator.as_ref());

		tracing::debug!(
			len = self.state.borrow().sorted.len(),
			moved = change.is_some(),
			"sorted list resorted"
		);

		if let Some(change) = change {
			self.helper.fire(self, vec![change]);
		}
	}
}

impl<E> SourceObserver<E> for SortedBody<E>
where
	E: Clone + 'static,
{
	fn source_changed(&self, change: &mut Change<'_, E>) {
		let comparator = self.comparator.get();
		let comparator = comparator.as_ref();
		let source = change.list();

		let changes = {
			let mut state = self.state.borrow_mut();
			let applied = if is_consistent(change.sub_changes(), state.sorted.len(), source.len()) {
				state.apply(change, comparator)
			} else {
				None
			};

			match applied {
				Some(changes) if state.sorted.len() == source.len() => changes,
				_ => {
					tracing::warn!(
						len = state.sorted.len(),
						source_len = source.len(),
						"inconsistent source change, rebuilding sorted list"
					);
					state.rebuild(source, comparator)
				}
			}
		};

		self.helper.fire(self, changes);
	}
}

impl<E> Observable for SortedBody<E>
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

impl<E> SourceChain for SortedBody<E>
where
	E: Clone + 'static,
{
	fn chain_id(&self) -> usize {
		self as *const Self as *const () as usize
	}

	fn chain_source(&self) -> Option<Rc<dyn SourceChain>> {
		Some(self.link.source().clone().chain())
	}

	fn chain_source_index(&self, index: usize) -> Result<usize> {
		self.source_index(index)
	}
}

impl<E> ObservableList<E> for SortedBody<E>
where
	E: Clone + 'static,
{
	fn len(&self) -> usize {
		self.state.borrow().sorted.len()
	}

	fn get(&self, index: usize) -> Result<E> {
		let state = self.state.borrow();
		state
			.sorted
			.get(index)
			.map(|element| element.value.clone())
			.ok_or(Error::out_of_range(index, state.sorted.len()))
	}

	fn to_vec(&self) -> Vec<E> {
		self.state.borrow().values()
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

impl<E> TransformationList<E, E> for SortedBody<E>
where
	E: Clone + 'static,
{
	fn source(&self) -> Rc<dyn ObservableList<E>> {
		self.link.source().clone()
	}

	fn source_index(&self, index: usize) -> Result<usize> {
		let state = self.state.borrow();
		state
			.sorted
			.get(index)
			.map(|element| element.index)
			.ok_or(Error::out_of_range(index, state.sorted.len()))
	}

	fn view_index(&self, index: usize) -> Result<usize> {
		let state = self.state.borrow();
		state
			.perm
			.get(index)
			.copied()
			.ok_or(Error::out_of_range(index, state.perm.len()))
	}
}

impl<E> Observable for SortedList<E>
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

impl<E> SourceChain for SortedList<E>
where
	E: Clone + 'static,
{
	fn chain_id(&self) -> usize {
		addr_of(&self.body)
	}

	fn chain_source(&self) -> Option<Rc<dyn SourceChain>> {
		self.body.chain_source()
	}

	fn chain_source_index(&self, index: usize) -> Result<usize> {
		self.body.source_index(index)
	}
}

impl<E> ObservableList<E> for SortedList<E>
where
	E: Clone + 'static,
{
	fn len(&self) -> usize {
		self.body.len()
	}

	fn get(&self, index: usize) -> Result<E> {
		self.body.get(index)
	}

	fn to_vec(&self) -> Vec<E> {
		self.body.to_vec()
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

impl<E> TransformationList<E, E> for SortedList<E>
where
	E: Clone + 'static,
{
	fn source(&self) -> Rc<dyn ObservableList<E>> {
		self.body.source()
	}

	fn source_index(&self, index: usize) -> Result<usize> {
		self.body.source_index(index)
	}

	fn view_index(&self, index: usize) -> Result<usize> {
		self.body.view_index(index)
	}
}

impl<E> From<SortedList<E>> for Rc<dyn ObservableList<E>>
where
	E: Clone + 'static,
{
	fn from(list: SortedList<E>) -> Self {
		list.body
	}
}

impl<E> From<&SortedList<E>> for Rc<dyn ObservableList<E>>
where
	E: Clone + 'static,
{
	fn from(list: &SortedList<E>) -> Self {
		list.body.clone()
	}
}

impl<E> Dependency for SortedList<E>
where
	E: Clone + 'static,
{
	fn dependency(&self) -> Rc<dyn Observable> {
		self.body.clone()
	}
}

impl<E> Debug for SortedList<E>
where
	E: Debug,
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let state = self.body.state.borrow();
		f.debug_list()
			.entries(state.sorted.iter().map(|element| &element.value))
			.finish()
	}
}
