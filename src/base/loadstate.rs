/// Lifecycle state of a submitted request, as seen through its handle.
///
/// Transitions are monotonic: `Queued -> Running -> Completed`, and either
/// of the first two may move to `Cancelled`. Nothing leaves `Cancelled` or
/// `Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum RequestState {
    /// Submitted, waiting for a worker slot.
    #[default]
    Queued = 0,

    /// Claimed by a worker; `on_start` has been dispatched.
    Running = 1,

    /// Cancelled by the caller, a bulk cancel, or a timeout.
    Cancelled = 2,

    /// A success or failure terminal event won the race.
    Completed = 3,
}

impl RequestState {
    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            0 => RequestState::Queued,
            1 => RequestState::Running,
            2 => RequestState::Cancelled,
            _ => RequestState::Completed,
        }
    }

    /// True once the request can no longer change state.
    pub fn is_terminal(self) -> bool {
        matches!(self, RequestState::Cancelled | RequestState::Completed)
    }
}
