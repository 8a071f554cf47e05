use std::cmp::Ordering;

/// Stable sorting that reports where every element went. The index
/// buffer is kept between sorts.
#[derive(Debug, Default)]
pub struct SortHelper {
	order: Vec<usize>,
}

impl SortHelper {
	pub fn new() -> Self {
		Self::default()
	}

	/// Sorts `items` and returns `moved`, where `moved[old] == new`.
	pub fn sort_by<T>(&mut self, items: &mut Vec<T>, mut compare: impl FnMut(&T, &T) -> Ordering) -> Vec<usize> {
		self.order.clear();
		self.order.extend(0..items.len());
		self.order.sort_by(|a, b| compare(&items[*a], &items[*b]));

		let mut moved = vec![0; items.len()];
		for (new, old) in self.order.iter().enumerate() {
			moved[*old] = new;
		}

		let mut slots: Vec<Option<T>> = items.drain(..).map(Some).collect();
		items.extend(self.order.iter().filter_map(|old| slots[*old].take()));

		moved
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn reports_moves() {
		let mut items = vec!['c', 'a', 'b'];
		let moved = SortHelper::new().sort_by(&mut items, char::cmp);
		assert_eq!(items, vec!['a', 'b', 'c']);
		assert_eq!(moved, vec![2, 0, 1]);
	}

	#[test]
	fn keeps_equal_elements_in_place() {
		let mut items = vec![(1, 'x'), (0, 'y'), (1, 'z'), (0, 'w')];
		let moved = SortHelper::new().sort_by(&mut items, |a, b| a.0.cmp(&b.0));
		assert_eq!(items, vec![(0, 'y'), (0, 'w'), (1, 'x'), (1, 'z')]);
		assert_eq!(moved, vec![2, 0, 3, 1]);
	}

	#[test]
	fn reuses_its_buffer() {
		let mut helper = SortHelper::new();
		let mut long = vec![5, 4, 3, 2, 1];
		helper.sort_by(&mut long, i32::cmp);

		let mut short = vec![2, 1];
		assert_eq!(helper.sort_by(&mut short, i32::cmp), vec![1, 0]);
		assert_eq!(short, vec![1, 2]);
	}
}
