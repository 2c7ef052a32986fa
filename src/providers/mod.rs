//! Provider fabric (§4.G, §4.H): the WebSocket provider base's state
//! machine and template-method trait, and the capability-indexed registry.

pub mod registry;
pub mod websocket;

pub use registry::ProviderRegistry;
pub use websocket::{ConnectionState, ProviderTemplate, WebSocketProvider};
