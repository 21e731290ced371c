// Streaming Result Consumer: submits the generation request, decodes the
// streamed document into partial results, and renders them for display.
// All remote calls go through the remote seams; nothing here touches reqwest.

pub mod consumer;
pub mod formatting;
pub mod handlers;
pub mod models;
pub mod partial_json;
