//! Progression engine: depth, content, timers and the phase state machine.
//!
//! Architecture:
//! ```text
//! ┌──────────────┐   intents    ┌──────────────┐   commands   ┌──────────────┐
//! │ Presentation │─────────────►│   Session    │─────────────►│ Audio Engine │
//! │    Layer     │◄─────────────│ (set_phase)  │─────────────►│   Minigame   │
//! └──────────────┘  snapshots   └──────────────┘              └──────────────┘
//!                                  │       ▲                         │
//!                                  ▼       │ fired timers            │ success /
//!                        ┌──────────────┐  │                         │ complete
//!                        │ DepthModel + │  └──── TimerRegistry ◄─────┘
//!                        │ContentSelector│
//!                        └──────────────┘
//! ```
//!
//! ## Phases
//!
//! `HeadphoneCheck → Intro → RoundInstructions → RoundActive →
//! (PostRoundSurvey | Interjection) → RoundInstructions → … → Complete`
//!
//! Every transition passes through one choke point that cancels all tracked
//! timers, applies entry effects, installs the new phase-scoped state and
//! notifies the presenter. Re-entering the current phase is a no-op apart
//! from the explicit patch.
//!
//! See [`session`] for the transition rules.

pub mod content;
pub mod depth;
pub mod events;
pub mod rounds;
pub mod session;
pub mod state;
pub mod timers;

pub use content::{ContentLibrary, ContentSelector, InterjectionKind, OutcomeCategory, SurveyItem};
pub use depth::{BeatFrequencies, DepthModel, EnvironmentSnapshot};
pub use events::{Inbound, Intent, MinigameEvent, Timestamp};
pub use rounds::RoundId;
pub use session::{Collaborators, Session};
pub use state::{SessionPhase, SessionSnapshot, SessionState, SessionStats, SurveyAnimPhase};
pub use timers::{TimerRegistry, TimerTag};
