//! HTTP adapter for session endpoints.

mod dto;
mod handlers;
mod routes;

pub use dto::{
    BulkResultResponse, BulkSendRequestDto, BulkSendResponse, ConnectResponse,
    DisconnectResponse, ErrorResponse, SendMessageRequest, SendMessageResponse,
    SessionListResponse, SessionStatusResponse,
};
pub use handlers::SessionHandlers;
pub use routes::session_routes;
