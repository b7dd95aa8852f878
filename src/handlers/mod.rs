// handlers - HTTP entry points grouped by resource
//
// Handlers only translate between HTTP and the service layer; failures
// surface as `ApiError` and successes as the `ApiResponse` envelope.

pub mod forms; // /form/*
pub mod resources; // /products/*, /wordings/*
pub mod system; // /, /health
pub mod tables; // /tables/*
