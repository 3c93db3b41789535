pub mod batch;
pub mod health;
pub mod mcp_http;
pub mod tools;
