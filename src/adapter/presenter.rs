use crate::engine::state::SessionSnapshot;

/// Receives a read-only snapshot after every state change.
pub trait Presenter: Send {
    fn render(&mut self, snapshot: &SessionSnapshot);
}

pub struct NullPresenter;

impl Presenter for NullPresenter {
    fn render(&mut self, _snapshot: &SessionSnapshot) {}
}
