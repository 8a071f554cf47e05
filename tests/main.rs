use std::cell::{Cell, RefCell};
use std::rc::Rc;

use bindery::{
	bidirectional, binding, Binding, ChangeListener, Const, DoubleProperty, Error, IntegerProperty, InvalidationListener,
	LongProperty, ObjectProperty, Observable, ObservableValue, ReadOnlyWrapper, SimpleProperty, StringProperty,
	Value, WeakInvalidationListener, WritableValue,
};
use mockall::predicate;

mod mock;

use mock::Spy;

fn spy_invalidations(observable: &impl Observable, mock: &mock::SharedMock) {
	let mock = mock.clone();
	observable.add_invalidation_listener(Rc::new(move |_: &dyn Observable| mock.get().invalidated()));
}

fn spy_changes(observable: &impl ObservableValue<i64>, mock: &mock::SharedMock) {
	let mock = mock.clone();
	observable.add_change_listener(Rc::new(
		move |_: &dyn ObservableValue<i64>, old: &i64, new: &i64| mock.get().changed(*old, *new),
	));
}

#[test]
fn set_then_get() {
	let a = LongProperty::new(0);
	let mock = mock::SharedMock::new();
	spy_invalidations(&a, &mock);

	mock.get().expect_invalidated().times(1).return_const(());
	a.set(5).unwrap();
	assert_eq!(a.get(), 5);
	mock.get().checkpoint();

	mock.get().expect_invalidated().times(0).return_const(());
	a.set(5).unwrap();
	mock.get().checkpoint();
}

#[test]
fn change_listener_sees_old_and_new() {
	let a = LongProperty::new(1);
	let mock = mock::SharedMock::new();
	spy_changes(&a, &mock);

	mock.get().expect_changed().with(predicate::eq(1), predicate::eq(5)).times(1).return_const(());
	a.set(5).unwrap();
	mock.get().checkpoint();

	mock.get().expect_changed().with(predicate::eq(5), predicate::eq(6)).times(1).return_const(());
	a.set(6).unwrap();
	mock.get().checkpoint();
}

#[test]
fn bound_property_follows_source() {
	let a = IntegerProperty::new(1);
	let b = IntegerProperty::new(0);

	b.bind(&a).unwrap();
	assert!(b.is_bound());
	assert_eq!(b.get(), 1);

	a.set(3).unwrap();
	assert_eq!(b.get(), 3);

	assert!(matches!(b.set(4), Err(Error::BoundPropertyMutation(_))));
	assert!(b.set_value(4).is_err());

	b.unbind();
	assert!(!b.is_bound());
	assert_eq!(b.get(), 3);

	a.set(9).unwrap();
	assert_eq!(b.get(), 3);
	b.set(4).unwrap();
	assert_eq!(b.get(), 4);

	// Unbinding twice is harmless.
	b.unbind();
}

#[test]
fn invalidations_coalesce_until_read() {
	let a = LongProperty::new(0);
	let b = LongProperty::new(0);
	b.bind(&a).unwrap();
	b.get();

	let mock = mock::SharedMock::new();
	spy_invalidations(&b, &mock);

	mock.get().expect_invalidated().times(1).return_const(());
	a.set(1).unwrap();
	a.set(2).unwrap();
	a.set(3).unwrap();
	mock.get().checkpoint();

	assert_eq!(b.get(), 3);

	mock.get().expect_invalidated().times(1).return_const(());
	a.set(4).unwrap();
	mock.get().checkpoint();
}

#[test]
fn change_listener_on_bound_property() {
	let a = LongProperty::new(1);
	let b = LongProperty::new(0);
	b.bind(&a).unwrap();

	let mock = mock::SharedMock::new();
	spy_changes(&b, &mock);

	mock.get().expect_changed().with(predicate::eq(1), predicate::eq(2)).times(1).return_const(());
	a.set(2).unwrap();
	mock.get().checkpoint();

	mock.get().expect_changed().with(predicate::eq(2), predicate::eq(7)).times(1).return_const(());
	a.set(7).unwrap();
	mock.get().checkpoint();
}

#[test]
fn rebinding_switches_source() {
	let a = IntegerProperty::new(1);
	let c = IntegerProperty::new(2);
	let b = IntegerProperty::new(0);

	b.bind(&a).unwrap();
	b.bind(&a).unwrap();
	assert_eq!(a.listener_count(), 1);

	b.bind(&c).unwrap();
	assert_eq!(b.get(), 2);
	assert_eq!(a.listener_count(), 0);

	a.set(10).unwrap();
	assert_eq!(b.get(), 2);
}

#[test]
fn self_binding_is_rejected() {
	let a = IntegerProperty::named("count", 1);
	assert_eq!(a.bind(&a), Err(Error::SelfBinding(a.name().clone())));
	assert_eq!(
		bidirectional::bind(&a, &a),
		Err(Error::SelfBinding(a.name().clone()))
	);
	assert!(!a.is_bound());
}

#[test]
fn error_names_the_property() {
	let source = IntegerProperty::new(0);
	let age = IntegerProperty::with_bean("Person", "age", 0);
	age.bind(&source).unwrap();

	let error = age.set(1).unwrap_err();
	assert_eq!(error.to_string(), "Person.age cannot be set because it is bound");
}

#[test]
fn dropped_property_stops_listening() {
	let a = IntegerProperty::new(1);
	{
		let b = IntegerProperty::new(0);
		b.bind(&a).unwrap();
		assert_eq!(a.listener_count(), 1);
	}

	a.set(2).unwrap();
	assert_eq!(a.listener_count(), 0);
}

#[test]
fn weak_listener_is_pruned() {
	let a = IntegerProperty::new(1);
	let calls = Rc::new(Cell::new(0));

	let listener: Rc<dyn InvalidationListener> = Rc::new({
		let calls = calls.clone();
		move |_: &dyn Observable| calls.set(calls.get() + 1)
	});
	a.add_invalidation_listener(Rc::new(WeakInvalidationListener::new(&listener)));

	a.set(2).unwrap();
	assert_eq!(calls.get(), 1);

	drop(listener);
	a.get();
	a.set(3).unwrap();
	assert_eq!(calls.get(), 1);
	assert_eq!(a.listener_count(), 0);
}

#[test]
fn removal_during_dispatch_uses_snapshot() {
	let a = IntegerProperty::new(0);
	let calls = Rc::new(Cell::new(0));

	let second: Rc<dyn InvalidationListener> = Rc::new({
		let calls = calls.clone();
		move |_: &dyn Observable| calls.set(calls.get() + 1)
	});

	let target = Rc::new(RefCell::new(Some(second.clone())));
	let first: Rc<dyn InvalidationListener> = Rc::new({
		let target = target.clone();
		move |observable: &dyn Observable| {
			if let Some(listener) = target.borrow_mut().take() {
				observable.remove_invalidation_listener(&listener);
			}
		}
	});

	a.add_invalidation_listener(first);
	a.add_invalidation_listener(second);

	a.set(1).unwrap();
	assert_eq!(calls.get(), 1);

	a.get();
	a.set(2).unwrap();
	assert_eq!(calls.get(), 1);
}

#[test]
fn change_listener_removes_itself_during_dispatch() {
	let a = LongProperty::new(0);
	let mock = mock::SharedMock::new();
	spy_changes(&a, &mock);

	let once_calls = Rc::new(Cell::new(0));
	let slot: Rc<RefCell<Option<Rc<dyn ChangeListener<i64>>>>> = Rc::new(RefCell::new(None));
	let once: Rc<dyn ChangeListener<i64>> = Rc::new({
		let slot = slot.clone();
		let once_calls = once_calls.clone();
		move |observable: &dyn ObservableValue<i64>, _: &i64, _: &i64| {
			once_calls.set(once_calls.get() + 1);
			if let Some(listener) = slot.borrow_mut().take() {
				observable.remove_change_listener(&listener);
			}
		}
	});
	*slot.borrow_mut() = Some(once.clone());
	a.add_change_listener(once);

	mock.get().expect_changed().with(predicate::eq(0), predicate::eq(1)).times(1).return_const(());
	a.set(1).unwrap();
	mock.get().checkpoint();

	mock.get().expect_changed().with(predicate::eq(1), predicate::eq(2)).times(1).return_const(());
	a.set(2).unwrap();
	mock.get().checkpoint();
	assert_eq!(once_calls.get(), 1);
	assert_eq!(a.listener_count(), 1);
}

#[test]
fn last_change_listener_removes_itself() {
	let a = IntegerProperty::new(0);
	let calls = Rc::new(Cell::new(0));

	let slot: Rc<RefCell<Option<Rc<dyn ChangeListener<i32>>>>> = Rc::new(RefCell::new(None));
	let once: Rc<dyn ChangeListener<i32>> = Rc::new({
		let slot = slot.clone();
		let calls = calls.clone();
		move |observable: &dyn ObservableValue<i32>, _: &i32, _: &i32| {
			calls.set(calls.get() + 1);
			if let Some(listener) = slot.borrow_mut().take() {
				observable.remove_change_listener(&listener);
			}
		}
	});
	*slot.borrow_mut() = Some(once.clone());
	a.add_change_listener(once);

	a.set(1).unwrap();
	a.set(2).unwrap();
	assert_eq!(calls.get(), 1);
	assert_eq!(a.listener_count(), 0);

	let seen = Rc::new(RefCell::new(Vec::new()));
	a.add_change_listener(Rc::new({
		let seen = seen.clone();
		move |_: &dyn ObservableValue<i32>, old: &i32, new: &i32| seen.borrow_mut().push((*old, *new))
	}));
	a.set(3).unwrap();
	assert_eq!(*seen.borrow(), vec![(2, 3)]);
}

#[test]
fn nested_write_runs_one_more_pass() {
	let a = IntegerProperty::new(0);
	let calls = Rc::new(Cell::new(0));

	a.add_invalidation_listener(Rc::new({
		let a = a.clone();
		let calls = calls.clone();
		move |_: &dyn Observable| {
			calls.set(calls.get() + 1);
			if a.get() < 10 {
				a.set(10).unwrap();
			}
		}
	}));

	let seen = Rc::new(Cell::new(0));
	a.add_invalidation_listener(Rc::new({
		let a = a.clone();
		let seen = seen.clone();
		move |_: &dyn Observable| seen.set(a.get())
	}));

	a.set(1).unwrap();
	assert_eq!(calls.get(), 2);
	assert_eq!(seen.get(), 10);
	assert_eq!(a.get(), 10);

	a.set(20).unwrap();
	assert_eq!(calls.get(), 3);
	assert_eq!(seen.get(), 20);
}

#[test]
fn nested_write_is_reported_after_the_pass() {
	let a = IntegerProperty::new(0);
	let seen = Rc::new(RefCell::new(Vec::new()));

	a.add_change_listener(Rc::new({
		let a = a.clone();
		let seen = seen.clone();
		move |_: &dyn ObservableValue<i32>, old: &i32, new: &i32| {
			seen.borrow_mut().push((*old, *new));
			if *new > 10 {
				a.set(10).unwrap();
			}
		}
	}));

	a.set(20).unwrap();
	assert_eq!(a.get(), 10);

	a.set(5).unwrap();
	a.set(7).unwrap();
	assert_eq!(*seen.borrow(), vec![(0, 20), (20, 10), (10, 5), (5, 7)]);
}

#[test]
fn invalidated_hook_runs_before_listeners() {
	let a = IntegerProperty::new(0);
	let order = Rc::new(RefCell::new(Vec::new()));

	a.on_invalidated({
		let order = order.clone();
		move || order.borrow_mut().push("hook")
	});
	a.add_invalidation_listener(Rc::new({
		let order = order.clone();
		move |_: &dyn Observable| order.borrow_mut().push("listener")
	}));

	a.set(1).unwrap();
	assert_eq!(*order.borrow(), vec!["hook", "listener"]);
}

#[test]
fn bidirectional_keeps_both_sides_equal() {
	let a = LongProperty::new(1);
	let b = LongProperty::new(2);

	a.bind_bidirectional(&b).unwrap();
	assert_eq!(a.get(), 2);
	assert_eq!(b.get(), 2);
	assert!(bidirectional::is_bound(&a, &b));

	let mock = mock::SharedMock::new();
	spy_changes(&b, &mock);

	mock.get().expect_changed().with(predicate::eq(2), predicate::eq(5)).times(1).return_const(());
	a.set(5).unwrap();
	assert_eq!(b.get(), 5);
	mock.get().checkpoint();

	mock.get().expect_changed().with(predicate::eq(5), predicate::eq(7)).times(1).return_const(());
	b.set(7).unwrap();
	assert_eq!(a.get(), 7);
	mock.get().checkpoint();

	a.unbind_bidirectional(&b);
	assert!(!bidirectional::is_bound(&a, &b));
	a.set(1).unwrap();
	assert_eq!(b.get(), 7);

	// Not bound any more.
	a.unbind_bidirectional(&b);
}

#[test]
fn bidirectional_without_feedback() {
	let a = IntegerProperty::new(0);
	let b = IntegerProperty::new(0);
	bidirectional::bind(&a, &b).unwrap();

	let updates = Rc::new(Cell::new(0));
	for side in [&a, &b] {
		side.add_invalidation_listener(Rc::new({
			let updates = updates.clone();
			move |_: &dyn Observable| updates.set(updates.get() + 1)
		}));
	}

	a.set(3).unwrap();
	assert_eq!(updates.get(), 2);
	assert_eq!((a.get(), b.get()), (3, 3));
}

#[test]
fn bidirectional_reverts_when_other_side_is_bound() {
	let a = IntegerProperty::new(0);
	let b = IntegerProperty::new(0);
	let c = IntegerProperty::new(4);
	bidirectional::bind(&a, &b).unwrap();

	b.bind(&c).unwrap();
	a.set(9).unwrap();

	assert_eq!(b.get(), 4);
	assert_eq!(a.get(), 4);
}

#[test]
fn bidirectional_conversion() {
	let celsius = DoubleProperty::new(0.0);
	let label: StringProperty = SimpleProperty::new(Some("10".to_string()));

	bidirectional::bind_converted(
		&celsius,
		&label,
		|text: &Option<String>| text.as_deref().and_then(|text| text.parse().ok()).unwrap_or(0.0),
		|value: &f64| Some(value.to_string()),
	)
	.unwrap();
	assert_eq!(celsius.get(), 10.0);

	celsius.set(21.5).unwrap();
	assert_eq!(label.get().as_deref(), Some("21.5"));

	label.set(Some("3".to_string())).unwrap();
	assert_eq!(celsius.get(), 3.0);
}

#[test]
fn bidirectional_ends_when_a_side_is_dropped() {
	let a = IntegerProperty::new(0);
	{
		let b = IntegerProperty::new(0);
		a.bind_bidirectional(&b).unwrap();
		assert_eq!(a.listener_count(), 1);
	}

	a.set(1).unwrap();
	assert_eq!(a.listener_count(), 0);
	assert_eq!(a.get(), 1);
}

#[test]
fn nullable_source_reads_as_zero() {
	let source: ObjectProperty<i32> = SimpleProperty::new(None);
	let target = IntegerProperty::new(7);

	target.bind_nullable(&source).unwrap();
	assert_eq!(target.get(), 0);

	source.set(Some(4)).unwrap();
	assert_eq!(target.get(), 4);

	source.set(None).unwrap();
	assert_eq!(target.get(), 0);
}

#[test]
fn object_mirror_of_primitive() {
	let count = IntegerProperty::new(3);
	let object = count.as_object();
	assert_eq!(object.get(), Some(3));

	count.set(8).unwrap();
	assert_eq!(object.get(), Some(8));

	object.set(None).unwrap();
	assert_eq!(count.get(), 0);

	let boxed: ObjectProperty<f64> = SimpleProperty::new(Some(2.5));
	let value = DoubleProperty::from_object(&boxed);
	assert_eq!(value.get(), 2.5);

	boxed.set(None).unwrap();
	assert_eq!(value.get(), 0.0);

	value.set(1.25).unwrap();
	assert_eq!(boxed.get(), Some(1.25));
}

#[test]
fn read_only_view_observes_wrapper() {
	let wrapper = ReadOnlyWrapper::new(1i64);
	let view = wrapper.read_only();

	let mock = mock::SharedMock::new();
	spy_changes(&view, &mock);

	mock.get().expect_changed().with(predicate::eq(1), predicate::eq(2)).times(1).return_const(());
	wrapper.set(2).unwrap();
	assert_eq!(view.get(), 2);
	mock.get().checkpoint();

	let follower = LongProperty::new(0);
	follower.bind(view.clone()).unwrap();
	assert_eq!(follower.get(), 2);
}

#[test]
fn binding_is_lazy() {
	let a = IntegerProperty::new(1);
	let computed = Rc::new(Cell::new(0));

	let double = Binding::new(vec![bindery::Dependency::dependency(&a)], {
		let a = a.clone();
		let computed = computed.clone();
		move || {
			computed.set(computed.get() + 1);
			a.get() * 2
		}
	});
	assert!(!double.is_valid());
	assert_eq!(double.get(), 2);
	assert_eq!(double.get(), 2);
	assert_eq!(computed.get(), 1);

	a.set(2).unwrap();
	a.set(3).unwrap();
	assert_eq!(computed.get(), 1);
	assert_eq!(double.get(), 6);
	assert_eq!(computed.get(), 2);
}

#[test]
fn binding_macro_and_bound_property() {
	let width = IntegerProperty::new(2);
	let height = IntegerProperty::new(3);
	let area = binding!((width, height) => width.get() * height.get());

	let target = IntegerProperty::new(0);
	target.bind(area.clone()).unwrap();
	assert_eq!(target.get(), 6);

	height.set(5).unwrap();
	assert_eq!(target.get(), 10);

	let label = Binding::map(&area, |area: &i32| format!("{area} m2"));
	assert_eq!(label.get(), "10 m2");
	width.set(1).unwrap();
	assert_eq!(label.get(), "5 m2");
}

#[test]
fn disposed_binding_keeps_last_value() {
	let a = IntegerProperty::new(1);
	let plus_one = Binding::map(&a, |a: &i32| a + 1);
	assert_eq!(plus_one.get(), 2);
	assert_eq!(a.listener_count(), 1);

	plus_one.dispose();
	assert_eq!(a.listener_count(), 0);

	a.set(5).unwrap();
	assert_eq!(plus_one.get(), 2);
}

#[test]
fn constant_source() {
	let a = IntegerProperty::new(0);
	a.bind(Const::new(5)).unwrap();
	assert_eq!(a.get(), 5);

	let value: Value<i32> = Const::new(3).into();
	assert_eq!(value.get(), 3);

	let constant = Const::new(7);
	constant.add_change_listener(Rc::new(|_: &dyn ObservableValue<i32>, _: &i32, _: &i32| {
		panic!("a constant never changes")
	}));
	assert_eq!(constant.value(), 7);
}
