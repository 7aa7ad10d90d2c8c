pub mod chat;
pub mod code;
pub mod progress;
pub mod roadmap;
pub mod room;
pub mod user;

pub use chat::{ChatMessage, ChatSession, SessionSummary};
pub use code::CodeHistoryEntry;
pub use progress::{Progress, QuizResult};
pub use roadmap::{Level, QuizQuestion, Roadmap, Subtopic};
pub use room::{Room, RoomMember, RoomMessage, RoomSummary};
pub use user::User;
