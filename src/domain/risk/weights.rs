use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    Volume,
    Price,
    Ml,
    Social,
}

impl Component {
    /// Fixed fusion order. Explanations and tie-breaks follow it.
    pub const ALL: [Component; 4] = [
        Component::Volume,
        Component::Price,
        Component::Ml,
        Component::Social,
    ];
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Volume => write!(f, "volume"),
            Self::Price => write!(f, "price"),
            Self::Ml => write!(f, "ml"),
            Self::Social => write!(f, "social"),
        }
    }
}

/// Which components produced a score for this assessment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ComponentAvailability {
    pub volume: bool,
    pub price: bool,
    pub ml: bool,
    pub social: bool,
}

impl ComponentAvailability {
    pub fn all() -> Self {
        Self {
            volume: true,
            price: true,
            ml: true,
            social: true,
        }
    }

    pub fn is_available(&self, component: Component) -> bool {
        match component {
            Component::Volume => self.volume,
            Component::Price => self.price,
            Component::Ml => self.ml,
            Component::Social => self.social,
        }
    }

    pub fn any(&self) -> bool {
        self.volume || self.price || self.ml || self.social
    }
}

/// Fusion weights in percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentWeights {
    pub volume: Decimal,
    pub price: Decimal,
    pub ml: Decimal,
    pub social: Decimal,
}

impl Default for ComponentWeights {
    fn default() -> Self {
        Self {
            volume: dec!(30),
            price: dec!(35),
            ml: dec!(25),
            social: dec!(10),
        }
    }
}

impl ComponentWeights {
    pub fn zero() -> Self {
        Self {
            volume: Decimal::ZERO,
            price: Decimal::ZERO,
            ml: Decimal::ZERO,
            social: Decimal::ZERO,
        }
    }

    pub fn get(&self, component: Component) -> Decimal {
        match component {
            Component::Volume => self.volume,
            Component::Price => self.price,
            Component::Ml => self.ml,
            Component::Social => self.social,
        }
    }

    fn slot(&mut self, component: Component) -> &mut Decimal {
        match component {
            Component::Volume => &mut self.volume,
            Component::Price => &mut self.price,
            Component::Ml => &mut self.ml,
            Component::Social => &mut self.social,
        }
    }

    pub fn total(&self) -> Decimal {
        self.volume + self.price + self.ml + self.social
    }

    /// Weights actually applied given component availability.
    ///
    /// Unavailable weight is spread proportionally over the available
    /// components. Each weight is rounded to 2 decimals and the rounding residual
    /// goes to the component with the largest raw weight, so the result sums to
    /// exactly 100. Returns `None` when nothing available carries weight.
    pub fn redistribute(&self, availability: ComponentAvailability) -> Option<ComponentWeights> {
        let enabled_total: Decimal = Component::ALL
            .iter()
            .filter(|c| availability.is_available(**c))
            .map(|c| self.get(*c))
            .sum();

        if enabled_total <= Decimal::ZERO {
            return None;
        }

        let mut active = ComponentWeights::zero();
        let mut largest: Option<(Component, Decimal)> = None;

        for component in Component::ALL {
            if !availability.is_available(component) {
                continue;
            }
            let raw = self.get(component) * dec!(100) / enabled_total;
            *active.slot(component) =
                raw.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
            if largest.is_none_or(|(_, w)| raw > w) {
                largest = Some((component, raw));
            }
        }

        let residual = dec!(100) - active.total();
        if let Some((component, _)) = largest {
            *active.slot(component) += residual;
        }

        Some(active)
    }
}
