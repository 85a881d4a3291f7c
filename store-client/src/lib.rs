//! Store Client - HTTP client for the hosted store backend
//!
//! Typed access to the backend's order, product, and auth endpoints.

pub mod config;
pub mod error;
pub mod gateway;
pub mod http;

pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use gateway::{AuthSession, HttpGateway, StoreGateway, UserProfile};
pub use http::HttpClient;
