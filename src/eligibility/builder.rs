use tracing::debug;

use crate::eligibility::{Eligibility, ProductSelection, ReactionTimePair, RequestError};
use crate::products::{
    CalculatorVariant, Product, ProductDirection, ReactionTime, RegulationDirection,
};

/// Builds the eligibility map and adjusted reaction times for one submission.
pub fn build(
    direction: RegulationDirection,
    variant: CalculatorVariant,
    raw_reaction_time_up: u32,
    raw_reaction_time_down: u32,
) -> Result<ProductSelection, RequestError> {
    let up = ReactionTime::try_from(raw_reaction_time_up)?;
    let down = ReactionTime::try_from(raw_reaction_time_down)?;
    let selection = ProductSelection {
        eligibility: eligibility_for(variant, direction),
        reaction_times: adjust_reaction_times(direction, up, down),
    };
    debug!(
        "built {variant} selection for direction {direction}: {:?}",
        selection.eligibility.eligible_products()
    );
    Ok(selection)
}

/// Same as [`build`], parsing the direction from a selector value first.
pub fn build_from_label(
    direction: &str,
    variant: CalculatorVariant,
    raw_reaction_time_up: u32,
    raw_reaction_time_down: u32,
) -> Result<ProductSelection, RequestError> {
    let direction: RegulationDirection = direction.parse()?;
    build(direction, variant, raw_reaction_time_up, raw_reaction_time_down)
}

pub fn eligibility_for(variant: CalculatorVariant, direction: RegulationDirection) -> Eligibility {
    variant
        .product_set()
        .iter()
        .map(|product| {
            let eligible = match product.direction() {
                ProductDirection::Symmetric => fcr_eligible(variant, direction),
                other => direction.allows(other),
            };
            (*product, eligible)
        })
        .collect()
}

// P2H/P2G only bid FCR when both directions are available; BEKS always can.
fn fcr_eligible(variant: CalculatorVariant, direction: RegulationDirection) -> bool {
    match variant {
        CalculatorVariant::Beks => true,
        CalculatorVariant::P2h | CalculatorVariant::P2g | CalculatorVariant::Dsr => {
            direction == RegulationDirection::Both
        }
    }
}

pub fn adjust_reaction_times(
    direction: RegulationDirection,
    up: ReactionTime,
    down: ReactionTime,
) -> ReactionTimePair {
    ReactionTimePair {
        up: if direction == RegulationDirection::Down {
            0
        } else {
            up.seconds()
        },
        down: if direction == RegulationDirection::Up {
            0
        } else {
            down.seconds()
        },
    }
}

/// Checkbox selection used by the BEKS form: every offered product gets a flag,
/// true exactly when it was ticked.
pub fn checkbox_eligibility(
    variant: CalculatorVariant,
    ticked: &[Product],
) -> Result<Eligibility, RequestError> {
    if let Some(product) = ticked.iter().find(|p| !variant.offers(**p)) {
        return Err(RequestError::ProductNotOffered {
            variant,
            product: *product,
        });
    }
    Ok(variant
        .product_set()
        .iter()
        .map(|product| (*product, ticked.contains(product)))
        .collect())
}
