/// Event payloads published after committed match mutations.
pub mod broadcast_events;
/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Match creation, lifecycle and ball-by-ball scoring.
pub mod match_service;
/// Read-only match projections.
pub mod query_service;
/// Server-Sent Events streaming service.
pub mod sse_service;
/// Storage connection supervisor toggling degraded mode.
pub mod storage_supervisor;
/// Viewer WebSocket connection handling.
pub mod websocket_service;
