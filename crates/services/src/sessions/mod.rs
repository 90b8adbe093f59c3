mod progress;
mod runner;
mod service;
mod timer;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use progress::SessionProgress;
pub use runner::{QuizEvent, QuizRunner, RunnerUpdate};
pub use service::{AnswerOutcome, Direction, QuizSession, TickOutcome};
pub use timer::QuestionTimer;
pub use workflow::{QuizLoopService, TickResult};
