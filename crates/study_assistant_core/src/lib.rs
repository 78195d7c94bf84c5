pub mod assistant;
pub mod domain;
pub mod error;
pub mod orchestrator;
pub mod parser;
pub mod ports;
pub mod prompts;
pub mod session;
pub mod upload;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use assistant::{AssistantManager, AssistantSettings};
pub use domain::{
    AssistantInfo, AssistantStatus, Difficulty, FileStatus, GenerationRequest,
    IndexedDocument, Question, QuizResponse, RemoteFile, StoredDocument, User, UserCredentials,
};
pub use error::{StudyError, StudyResult};
pub use orchestrator::{Generation, StudyOrchestrator};
pub use parser::{parse_quiz, ParseError};
pub use ports::{AssistantService, DatabaseService, PortError, PortResult};
pub use session::{DocumentSession, DocumentState};
pub use upload::{UploadCoordinator, UploadSettings};
