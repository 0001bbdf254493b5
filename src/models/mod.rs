// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    CategorizedRestaurant, CuisineLabel, CuisineMatch, GeoPoint, PlacePhoto, PriceLevel, RawPlace,
    Restaurant, FALLBACK_CUISINE,
};
pub use requests::{Coordinates, DiscoveryRequest, SearchRadius};
pub use responses::DiscoveryOutcome;
