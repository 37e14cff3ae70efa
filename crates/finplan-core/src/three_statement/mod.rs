pub mod generator;
pub mod model;
pub mod orchestrator;
pub mod triangulation;

pub use generator::{generate, generate_request, StatementsRequest};
pub use model::*;
pub use orchestrator::{
    derive_year_inputs, run_series, run_series_request, ProjectionSeries, SeriesRequest,
    YearAssumptions,
};
pub use triangulation::triangulate;
