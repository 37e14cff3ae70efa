pub mod alerts;
pub mod cascade;
pub mod ccc;
pub mod series;
pub mod statements;
