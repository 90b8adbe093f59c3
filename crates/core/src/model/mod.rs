mod checkpoint;
mod custom_quiz;
mod history;
mod ids;
mod question;
mod session;
mod settings;
mod topic;
mod user;

pub use ids::{ParseIdError, QuestionId, UserId};

pub use checkpoint::Checkpoint;
pub use custom_quiz::CustomQuiz;
pub use history::HistoryRecord;
pub use question::{
    OPTION_COUNT, Question, QuestionDraft, QuestionError, partition_question_set,
    validate_question_set,
};
pub use session::{QuizResult, QuizResultError, SessionStatus, rounded_percentage};
pub use settings::{QuizSettings, SettingsError};
pub use topic::{Topic, TopicError};
pub use user::{Identity, Role, UserAccount};
