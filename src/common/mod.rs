pub mod response;
pub mod serializer;

pub use response::{ApiErrorResponse, ResponseBody, ResponseDecision};
pub use serializer::{JsonSerializer, SerializerSettings};
