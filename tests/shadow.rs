use std::cell::RefCell;
use std::fmt::Debug;
use std::rc::Rc;

use bindery::list::{Change, ListChangeListener, ObservableList, SubChange};

pub type Log<E> = Rc<RefCell<Vec<Vec<SubChange<E>>>>>;

/// Records the sub-changes of every event fired by `list`.
pub fn record<E, L>(list: &L) -> Log<E>
where
	E: Clone + 'static,
	L: ObservableList<E>,
{
	let log: Log<E> = Rc::new(RefCell::new(Vec::new()));
	let listener: Rc<dyn ListChangeListener<E>> = Rc::new({
		let log = log.clone();
		move |change: &mut Change<'_, E>| {
			log.borrow_mut().push(change.sub_changes().to_vec());
		}
	});
	list.add_list_listener(listener);
	log
}

/// Value of the element at `position`, followed through the `later` steps
/// into `after`, or taken from the later step that removes it.
fn value_at<E: Clone>(after: &[E], later: &[SubChange<E>], mut position: usize) -> E {
	for change in later {
		match change {
			SubChange::Removed { from, removed } => {
				if position >= from + removed.len() {
					position -= removed.len();
				} else if position >= *from {
					return removed[position - from].clone();
				}
			}
			SubChange::Added { from, to } => {
				if position >= *from {
					position += to - from;
				}
			}
			SubChange::Permutated {
				from,
				to,
				permutation,
			} => {
				if position >= *from && position < *to {
					position = permutation[position - from];
				}
			}
			SubChange::Updated { .. } => {}
		}
	}
	after[position].clone()
}

/// Applies one event to `shadow`, an image of the list before it. Added
/// and updated elements are read from `after`, the list once the event
/// was fired.
pub fn replay<E>(shadow: &mut Vec<E>, changes: &[SubChange<E>], after: &[E])
where
	E: Clone + PartialEq + Debug,
{
	let mut previous: Option<usize> = None;
	for (step, change) in changes.iter().enumerate() {
		let later = &changes[step + 1..];
		let structural = change.was_added() || change.was_removed();
		if let (true, Some(previous)) = (structural, previous) {
			assert!(change.from() >= previous, "sub-changes out of order: {changes:?}");
		}

		match change {
			SubChange::Removed { from, removed } => {
				let gone: Vec<E> = shadow.drain(*from..from + removed.len()).collect();
				assert_eq!(&gone, removed);
			}
			SubChange::Added { from, to } => {
				for index in *from..*to {
					shadow.insert(index, value_at(after, later, index));
				}
			}
			SubChange::Permutated {
				from,
				to,
				permutation,
			} => {
				let section: Vec<E> = shadow[*from..*to].to_vec();
				for (offset, value) in section.into_iter().enumerate() {
					shadow[permutation[offset]] = value;
				}
			}
			SubChange::Updated { from, to } => {
				for index in *from..*to {
					shadow[index] = value_at(after, later, index);
				}
			}
		}
		previous = structural.then(|| change.to());
	}
}

/// Replays everything in `log` onto `shadow` and checks that the result
/// is the current content of `list`.
pub fn check<E, L>(shadow: &mut Vec<E>, log: &Log<E>, list: &L)
where
	E: Clone + PartialEq + Debug + 'static,
	L: ObservableList<E>,
{
	let after = list.to_vec();
	for changes in log.borrow_mut().drain(..) {
		replay(shadow, &changes, &after);
	}
	assert_eq!(shadow, &after);
}
