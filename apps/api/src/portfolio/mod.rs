// Resume upload → portfolio page → repository → deploy link.
// Provider calls go through the traits in ocr_client, llm_client and publisher.

pub mod handlers;
pub mod pipeline;
pub mod upload;
