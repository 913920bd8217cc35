//! Collaborator seams: audio, minigame runtime, presentation and time.
//!
//! The session owns boxed trait objects for each seam, so hosts and tests
//! inject their own implementations. `console` backs the binary; `recording`
//! backs tests.

pub mod audio;
pub mod clock;
pub mod console;
pub mod minigame;
pub mod presenter;
pub mod recording;

pub use audio::{AudioEngine, NullAudio};
pub use clock::{Clock, ManualClock, SystemClock, TokioClock};
pub use minigame::{MinigameConfig, MinigameMode, MinigameRuntime, NullMinigame};
pub use presenter::{NullPresenter, Presenter};
