// Service exports
pub mod llm;
pub mod location;
pub mod places;

pub use llm::{CompletionProvider, LlmCategorizer, LlmError, OpenAiClient};
pub use location::{FixedLocation, LocationError, LocationProvider, PermissionStatus};
pub use places::{PhotoUrlBuilder, PlacesClient, PlacesError, PlacesProvider};
