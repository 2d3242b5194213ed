//! Location resolution: free-form place name (zh or en) to coordinates.
//!
//! Resolution is a three-tier fallback: cached result, local gazetteer
//! lookup, then remote geocoding with query-candidate rewrites.

pub mod gazetteer;
pub mod models;
pub mod resolver;

pub use gazetteer::Gazetteer;
pub use models::{Coordinates, GeoResult, LocationQuery};
pub use resolver::{GeocodingApi, OpenMeteoGeocoding, build_geocode_candidates, resolve};
