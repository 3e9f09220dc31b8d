//! External collaborators: text generation, response parsing and link checks.

pub mod generation;
pub mod openai_client;
pub mod page_scraper;
pub mod response_parser;
pub mod url_validator;

pub use generation::{GenerationRequest, TextGenerator, DEFAULT_MAX_RETRIES};
pub use openai_client::OpenAiClient;
pub use page_scraper::PageScraper;
pub use response_parser::parse_structured;
pub use url_validator::{HttpLinkProbe, LinkProbe, SourceValidator};
