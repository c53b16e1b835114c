pub mod anthropic;
pub mod mock;
pub mod provider;
pub mod types;

pub use anthropic::AnthropicClient;
pub use mock::MockModelClient;
pub use provider::{ModelClient, ModelError, ModelResult};
pub use types::{ModelCompletion, ModelMessage, ModelRequest, ModelRole, ToolCall, ToolResultMessage};
