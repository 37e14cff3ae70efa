pub mod cash_conversion;

pub use cash_conversion::{compute_ccc, CashConversionCycle, CccBand, CccInputs};

#[cfg(feature = "three_statement")]
pub use cash_conversion::cash_conversion_for;
