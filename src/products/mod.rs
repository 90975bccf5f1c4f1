pub mod schema;

pub use schema::{
    CalculatorVariant, DirectionParseError, Product, ProductDirection, ProductParseError,
    ReactionTime, ReactionTimeError, RegulationDirection, VariantParseError,
};
