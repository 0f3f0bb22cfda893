pub mod api;
pub mod calendar;
pub mod chat;
pub mod colors;
pub mod dates;
pub mod geojson;
pub mod layers;
pub mod predict;
pub mod projection;
pub mod request;
pub mod route;
pub mod slider;

pub use api::*;
pub use dates::{AvailableDates, format_iso_date, parse_iso_date};
pub use geojson::{Feature, FeatureCollection, Geometry};
pub use route::{RouteControls, RouteStatus};
