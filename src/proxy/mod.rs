// Gateway core: session-scoped token lifecycle + upstream request execution.

pub mod handlers;
pub mod middleware;
pub mod server;
pub mod session;
pub mod token_manager;
pub mod upstream;

pub use server::GatewayServer;
pub use token_manager::TokenManager;
