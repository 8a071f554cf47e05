pub use enclose::*;

/// Builds a [`Binding`](crate::Binding) over the listed handles. Each one
/// is declared as a dependency and cloned into the closure.
///
/// ```
/// use bindery::{binding, IntegerProperty};
///
/// let width = IntegerProperty::new(2);
/// let height = IntegerProperty::new(3);
/// let area = binding!((width, height) => width.get() * height.get());
/// assert_eq!(area.get(), 6);
///
/// width.set(4).unwrap();
/// assert_eq!(area.get(), 12);
/// ```
#[macro_export]
macro_rules! binding {
    (( $($dep:ident),* $(,)? ) => $($b:tt)*) => {
        $crate::Binding::new(
            vec![$($crate::Dependency::dependency(&$dep)),*],
            $crate::macros::enclose!(($($dep),*) move || { $($b)* }),
        )
    };
}
