use std::borrow::Cow;
use std::fmt;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
	#[error("{0} cannot be set because it is bound")]
	BoundPropertyMutation(PropertyName),

	#[error("{0} cannot be bound to itself")]
	SelfBinding(PropertyName),

	#[error("index {index} out of range for length {len}")]
	IndexOutOfRange { index: usize, len: usize },

	#[error("list is not part of this transformation chain")]
	NotInChain,

	#[error("source index {0} is not visible in this view")]
	NotInView(usize),

	#[error("sub-change is not a permutation")]
	NotPermutation,
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
	pub(crate) fn out_of_range(index: usize, len: usize) -> Self {
		Error::IndexOutOfRange { index, len }
	}
}

/// Owner and name of a property, used in diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyName {
	bean: Option<Cow<'static, str>>,
	name: Cow<'static, str>,
}

impl PropertyName {
	pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
		PropertyName {
			bean: None,
			name: name.into(),
		}
	}

	pub fn with_bean(bean: impl Into<Cow<'static, str>>, name: impl Into<Cow<'static, str>>) -> Self {
		PropertyName {
			bean: Some(bean.into()),
			name: name.into(),
		}
	}

	pub fn bean(&self) -> Option<&str> {
		self.bean.as_deref()
	}

	pub fn name(&self) -> &str {
		&self.name
	}
}

impl fmt::Display for PropertyName {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = if self.name.is_empty() {
			"<unnamed>"
		} else {
			&self.name
		};

		match &self.bean {
			Some(bean) => write!(f, "{bean}.{name}"),
			None => f.write_str(name),
		}
	}
}
