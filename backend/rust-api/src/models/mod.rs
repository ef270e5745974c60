pub mod attempt;
pub mod lesson;
pub mod user;

pub use attempt::{
    GradedAnswer, LessonAttempt, SubmissionResult, SubmitAnswersRequest, SubmittedAnswer,
};
pub use lesson::{
    AnswerKey, Lesson, LessonDetail, LessonStats, LessonSummary, OptionPublic, ProblemPublic,
    ProblemType,
};
pub use user::{
    AuthResponse, LoginRequest, RefreshTokenResponse, RegisterRequest, User, UserProfile,
    UserPublic, UserStats,
};
