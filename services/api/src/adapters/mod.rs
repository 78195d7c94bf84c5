pub mod db;
pub mod pinecone;

pub use db::DbAdapter;
pub use pinecone::{PineconeAssistantAdapter, PineconeConfig};
