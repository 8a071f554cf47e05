use std::cell::RefCell;
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

/// A shared test function. Two predicates are equal only when they are
/// the same function object.
pub struct Predicate<E>(Rc<dyn Fn(&E) -> bool>);

impl<E> Clone for Predicate<E> {
	fn clone(&self) -> Self {
		Predicate(self.0.clone())
	}
}

impl<E> PartialEq for Predicate<E> {
	fn eq(&self, other: &Self) -> bool {
		addr_of(&self.0) == addr_of(&other.0)
	}
}

impl<E> Debug for Predicate<E> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Predicate({:#x})", addr_of(&self.0))
	}
}

impl<E> Predicate<E> {
	#[inline]
	pub fn test(&self, value: &E) -> bool {
		(self.0)(value)
	}
}

impl<E> Predicate<E>
where
	E: 'static,
{
	pub fn new(test: impl Fn(&E) -> bool + 'static) -> Self {
		Predicate(Rc::new(test))
	}

	pub fn negate(&self) -> Self {
		let test = self.0.clone();
		Predicate::new(move |value| !test(value))
	}
}

fn matches<E>(predicate: Option<&Predicate<E>>, value: &E) -> bool {
	predicate.map_or(true, |predicate| predicate.test(value))
}

/// The elements of a source list that satisfy a predicate, in source
/// order. Without a predicate every element is shown.
pub struct FilteredList<E> {
	body: Rc<FilteredBody<E>>,
}

impl<E> Clone for FilteredList<E> {
	fn clone(&self) -> Self {
		Self {
			body: self.body.clone(),
		}
	}
}

struct FilteredBody<E> {
	state: RefCell<FilteredState<E>>,
	predicate: SimpleProperty<Option<Predicate<E>>>,
	helper: ListListenerHelper<E>,
	link: SourceLink<E>,
}

struct Entry<E> {
	index: usize,
	value: E,
}

/// `filtered` is ordered by source index.
struct FilteredState<E> {
	filtered: Vec<Entry<E>>,
	source_len: usize,
	sorter: SortHelper,
}

impl<E> FilteredState<E>
where
	E: Clone,
{
	fn filter_all(&mut self, values: Vec<E>, predicate: Option<&Predicate<E>>) {
		self.source_len = values.len();
		self.filtered = values
			.into_iter()
			.enumerate()
			.filter(|(_, value)| matches(predicate, value))
			.map(|(index, value)| Entry { index, value })
			.collect();
	}

	fn values(&self) -> Vec<E> {
		self.filtered.iter().map(|entry| entry.value.clone()).collect()
	}

	fn position(&self, index: usize) -> usize {
		self.filtered.partition_point(|entry| entry.index < index)
	}

	/// Runs `predicate` over `values`, the unchanged source, and reports
	/// the difference to the current view.
	fn refilter(&mut self, values: Vec<E>, predicate: Option<&Predicate<E>>) -> Vec<SubChange<E>> {
		let mut tracker = AddRemoveTracker::new(self.filtered.len());
		let mut old = std::mem::take(&mut self.filtered).into_iter().peekable();
		let mut position = 0;
		self.source_len = values.len();

		for (index, value) in values.into_iter().enumerate() {
			let was = old.next_if(|entry| entry.index == index);
			let now = matches(predicate, &value);

			match (was, now) {
				(Some(_), true) => position += 1,
				(Some(entry), false) => tracker.remove(position, entry.value),
				(None, true) => {
					tracker.insert(position);
					position += 1;
				}
				(None, false) => {}
			}

			if now {
				self.filtered.push(Entry { index, value });
			}
		}

		tracker.finish()
	}

	fn apply(&mut self, change: &mut Change<'_, E>, predicate: Option<&Predicate<E>>) -> Option<Vec<SubChange<E>>> {
		let source = change.list();
		let mut changes = Vec::new();
		let mut tracker = AddRemoveTracker::new(self.filtered.len());

		while let Some(sub) = change.next() {
			let rest = change.rest();
			match sub {
				SubChange::Removed { from, removed } => {
					let start = self.position(*from);
					let end = self.position(from + removed.len());
					for entry in self.filtered.drain(start..end) {
						tracker.remove(start, entry.value);
					}
					for entry in &mut self.filtered[start..] {
						entry.index -= removed.len();
					}
					self.source_len -= removed.len();
				}
				SubChange::Added { from, to } => {
					let mut position = self.position(*from);
					for entry in &mut self.filtered[position..] {
						entry.index += to - from;
					}
					self.source_len += to - from;

					for index in *from..*to {
						let value = value_at(source, rest, index).ok()?;
						if matches(predicate, &value) {
							self.filtered.insert(position, Entry { index, value });
							tracker.insert(position);
							position += 1;
						}
					}
				}
				SubChange::Permutated {
					from,
					to,
					permutation,
				} => {
					let tracker = std::mem::replace(&mut tracker, AddRemoveTracker::new(self.filtered.len()));
					changes.extend(tracker.finish());

					for entry in &mut self.filtered {
						if entry.index >= *from && entry.index < *to {
							entry.index = *permutation.get(entry.index - from)?;
						}
					}
					let moved = self.sorter.sort_by(&mut self.filtered, |a, b| a.index.cmp(&b.index));
					changes.extend(SubChange::permutation_of(moved));
				}
				SubChange::Updated { from, to } => {
					let previous = std::mem::replace(&mut tracker, AddRemoveTracker::new(self.filtered.len()));
					changes.extend(previous.finish());

					let mut updated = Vec::new();
					for index in *from..*to {
						let value = value_at(source, rest, index).ok()?;
						let position = self.position(index);
						let visible = self.filtered.get(position).map_or(false, |entry| entry.index == index);

						match (visible, matches(predicate, &value)) {
							(true, true) => {
								if let Some(entry) = self.filtered.get_mut(position) {
									entry.value = value;
								}
								updated.push(index);
							}
							(true, false) => {
								let entry = self.filtered.remove(position);
								tracker.remove(position, entry.value);
							}
							(false, true) => {
								self.filtered.insert(position, Entry { index, value });
								tracker.insert(position);
							}
							(false, false) => {}
						}
					}

					let tracker = std::mem::replace(&mut tracker, AddRemoveTracker::new(self.filtered.len()));
					changes.extend(tracker.finish());

					let positions = updated
						.into_iter()
						.filter_map(|index| {
							self.filtered
								.binary_search_by(|entry| entry.index.cmp(&index))
								.ok()
						})
						.collect();
					changes.extend(updated_ranges(positions));
				}
			}
		}

		changes.extend(tracker.finish());
		Some(changes)
	}

	fn rebuild(&mut self, values: Vec<E>, predicate: Option<&Predicate<E>>) -> Vec<SubChange<E>> {
		let removed = self.values();
		self.filter_all(values, predicate);

		let mut changes = Vec::with_capacity(2);
		if !removed.is_empty() {
			changes.push(SubChange::Removed { from: 0, removed });
		}
		if !self.filtered.is_empty() {
			changes.push(SubChange::Added {
				from: 0,
				to: self.filtered.len(),
			});
		}
		changes
	}
}

impl<E> FilteredList<E>
where
	E: Clone + 'static,
{
	/// A view showing every source element until a predicate is set.
	pub fn new(source: impl Into<Rc<dyn ObservableList<E>>>) -> Self {
		Self::build(source.into(), None)
	}

	pub fn with_predicate(source: impl Into<Rc<dyn ObservableList<E>>>, predicate: Predicate<E>) -> Self {
		Self::build(source.into(), Some(predicate))
	}

	fn build(source: Rc<dyn ObservableList<E>>, predicate: Option<Predicate<E>>) -> Self {
		let body = Rc::new_cyclic(|this: &Weak<FilteredBody<E>>| {
			let mut state = FilteredState {
				filtered: Vec::new(),
				source_len: 0,
				sorter: SortHelper::new(),
			};
			state.filter_all(source.to_vec(), predicate.as_ref());

			let property = SimpleProperty::with_bean("FilteredList", "predicate", predicate);
			let target = this.clone();
			property.on_invalidated(move || {
				if let Some(body) = target.upgrade() {
					body.predicate_changed();
				}
			});

			FilteredBody {
				state: RefCell::new(state),
				predicate: property,
				helper: ListListenerHelper::new(),
				link: SourceLink::attach(source, this.clone()),
			}
		});

		FilteredList { body }
	}

	/// The predicate as a property. It can be set or bound, the view is
	/// refiltered on every change.
	pub fn predicate_property(&self) -> &SimpleProperty<Option<Predicate<E>>> {
		&self.body.predicate
	}

	pub fn predicate(&self) -> Option<Predicate<E>> {
		self.body.predicate.get()
	}

	pub fn set_predicate(&self, predicate: Option<Predicate<E>>) -> Result<()> {
		self.body.predicate.set(predicate)
	}

	pub fn listener_count(&self) -> usize {
		self.body.helper.listener_count()
	}
}

impl<E> FilteredBody<E>
where
	E: Clone + 'static,
{
	fn predicate_changed(&self) {
		let predicate = self.predicate.get();
		let values = self.link.source().to_vec();
		let changes = self.state.borrow_mut().refilter(values, predicate.as_ref());

		tracing::debug!(
			len = self.state.borrow().filtered.len(),
			sub_changes = changes.len(),
			"filtered list refiltered"
		);

		self.helper.fire(self, changes);
	}
}

impl<E> SourceObserver<E> for FilteredBody<E>
where
	E: Clone + 'static,
{
	fn source_changed(&self, change: &mut Change<'_, E>) {
		let predicate = self.predicate.get();
		let predicate = predicate.as_ref();
		let source = change.list();

		let changes = {
			let mut state = self.state.borrow_mut();
			let applied = if is_consistent(change.sub_changes(), state.source_len, source.len()) {
				state.apply(change, predicate)
			} else {
				None
			};

			match applied {
				Some(changes) if state.source_len == source.len() => changes,
				_ => {
					tracing::warn!(
						source_len = source.len(),
						"inconsistent source change, rebuilding filtered list"
					);
					state.rebuild(source.to_vec(), predicate)
				}
			}
		};

		self.helper.fire(self, changes);
	}
}

impl<E> Observable for FilteredBody<E>
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

impl<E> SourceChain for FilteredBody<E>
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

impl<E> ObservableList<E> for FilteredBody<E>
where
	E: Clone + 'static,
{
	fn len(&self) -> usize {
		self.state.borrow().filtered.len()
	}

	fn get(&self, index: usize) -> Result<E> {
		let state = self.state.borrow();
		state
			.filtered
			.get(index)
			.map(|entry| entry.value.clone())
			.ok_or(Error::out_of_range(index, state.filtered.len()))
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

impl<E> TransformationList<E, E> for FilteredBody<E>
where
	E: Clone + 'static,
{
	fn source(&self) -> Rc<dyn ObservableList<E>> {
		self.link.source().clone()
	}

	fn source_index(&self, index: usize) -> Result<usize> {
		let state = self.state.borrow();
		state
			.filtered
			.get(index)
			.map(|entry| entry.index)
			.ok_or(Error::out_of_range(index, state.filtered.len()))
	}

	fn view_index(&self, index: usize) -> Result<usize> {
		let state = self.state.borrow();
		if index >= state.source_len {
			return Err(Error::out_of_range(index, state.source_len));
		}

		state
			.filtered
			.binary_search_by(|entry| entry.index.cmp(&index))
			.map_err(|_| Error::NotInView(index))
	}
}

impl<E> Observable for FilteredList<E>
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

impl<E> SourceChain for FilteredList<E>
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

impl<E> ObservableList<E> for FilteredList<E>
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

impl<E> TransformationList<E, E> for FilteredList<E>
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

impl<E> From<FilteredList<E>> for Rc<dyn ObservableList<E>>
where
	E: Clone + 'static,
{
	fn from(list: FilteredList<E>) -> Self {
		list.body
	}
}

impl<E> From<&FilteredList<E>> for Rc<dyn ObservableList<E>>
where
	E: Clone + 'static,
{
	fn from(list: &FilteredList<E>) -> Self {
		list.body.clone()
	}
}

impl<E> Dependency for FilteredList<E>
where
	E: Clone + 'static,
{
	fn dependency(&self) -> Rc<dyn Observable> {
		self.body.clone()
	}
}

impl<E> Debug for FilteredList<E>
where
	E: Debug,
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let state = self.body.state.borrow();
		f.debug_list()
			.entries(state.filtered.iter().map(|entry| &entry.value))
			.finish()
	}
}
