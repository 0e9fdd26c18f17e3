/// Shared execution classes used for thread classification and observability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskClass {
	/// The single thread that owns shared project state and drains dispatched work.
	Owner,
	/// Any other thread that reaches project state only through a dispatcher.
	Caller,
}

impl TaskClass {
	pub(crate) const fn as_str(self) -> &'static str {
		match self {
			Self::Owner => "owner",
			Self::Caller => "caller",
		}
	}
}
