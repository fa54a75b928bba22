//! Checkout pricing.

use crate::catalog::Metal;
use crate::error::CommerceError;
use crate::metal::MetalRates;
use crate::money::{Money, Weight};
use serde::{Deserialize, Serialize};

/// What the metal surcharge needs to know about one cart line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetalLine {
    /// Priced metal of the item's material, if any.
    pub metal: Option<Metal>,
    pub weight: Option<Weight>,
    pub quantity: i64,
}

/// Sum `rate × weight × quantity` over lines made of a priced metal with a
/// known weight. Other lines contribute nothing.
pub fn metal_surcharge(
    lines: impl IntoIterator<Item = MetalLine>,
    rates: &MetalRates,
) -> Result<Money, CommerceError> {
    let currency = rates.gold.currency;
    let mut total = Money::zero(currency);
    for line in lines {
        let (Some(metal), Some(weight)) = (line.metal, line.weight) else {
            continue;
        };
        let cost = rates
            .rate(metal)
            .per_gram_times(weight, line.quantity)
            .ok_or(CommerceError::Overflow)?;
        total = total.try_add(&cost).ok_or(CommerceError::Overflow)?;
    }
    Ok(total)
}

/// Totals for one checkout.
///
/// `final_total` is always exactly `base_total + making_charges + metal_cost`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckoutTotals {
    /// Σ snapshot price × quantity.
    pub base_total: Money,
    /// Flat labour fee supplied at checkout.
    pub making_charges: Money,
    /// Metal surcharge at current spot rates.
    pub metal_cost: Money,
    pub final_total: Money,
}

impl CheckoutTotals {
    pub fn new(
        base_total: Money,
        making_charges: Money,
        metal_cost: Money,
    ) -> Result<Self, CommerceError> {
        let mismatch = |got: &Money| CommerceError::CurrencyMismatch {
            expected: base_total.currency.code().to_string(),
            got: got.currency.code().to_string(),
        };
        if making_charges.currency != base_total.currency {
            return Err(mismatch(&making_charges));
        }
        if metal_cost.currency != base_total.currency {
            return Err(mismatch(&metal_cost));
        }

        let final_total = base_total
            .try_add(&making_charges)
            .and_then(|m| m.try_add(&metal_cost))
            .ok_or(CommerceError::Overflow)?;

        Ok(Self {
            base_total,
            making_charges,
            metal_cost,
            final_total,
        })
    }

    /// Client-facing numbers.
    pub fn to_view(&self) -> TotalsView {
        TotalsView {
            base_total: self.base_total.to_decimal(),
            making_charges: self.making_charges.to_decimal(),
            metal_cost: self.metal_cost.to_decimal(),
            final_total: self.final_total.to_decimal(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TotalsView {
    pub base_total: f64,
    pub making_charges: f64,
    pub metal_cost: f64,
    pub final_total: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metal::RateSource;
    use crate::money::Currency;

    fn rates() -> MetalRates {
        MetalRates::new(
            Money::from_decimal(6000.0, Currency::INR),
            Money::from_decimal(80.0, Currency::INR),
            RateSource::Live,
        )
    }

    #[test]
    fn test_surcharge_skips_unpriced_lines() {
        let lines = [
            MetalLine {
                metal: Some(Metal::Gold),
                weight: Some(Weight::from_grams(5.0)),
                quantity: 1,
            },
            MetalLine {
                metal: Some(Metal::Silver),
                weight: None,
                quantity: 3,
            },
            MetalLine {
                metal: None,
                weight: Some(Weight::from_grams(10.0)),
                quantity: 2,
            },
            MetalLine {
                metal: Some(Metal::Silver),
                weight: Some(Weight::from_milligrams(2500)),
                quantity: 2,
            },
        ];
        // 6000 * 5 + 80 * 2.5 * 2
        let total = metal_surcharge(lines, &rates()).unwrap();
        assert_eq!(total, Money::from_decimal(30_400.0, Currency::INR));
    }

    #[test]
    fn test_final_total_is_exact_sum() {
        let totals = CheckoutTotals::new(
            Money::from_decimal(250.0, Currency::INR),
            Money::from_decimal(20.0, Currency::INR),
            Money::from_decimal(30_000.0, Currency::INR),
        )
        .unwrap();
        assert_eq!(totals.final_total.amount_minor, 3_027_000);
        assert_eq!(totals.to_view().final_total, 30270.0);
    }

    #[test]
    fn test_mixed_currency_rejected() {
        let result = CheckoutTotals::new(
            Money::zero(Currency::INR),
            Money::zero(Currency::USD),
            Money::zero(Currency::INR),
        );
        assert!(matches!(result, Err(CommerceError::CurrencyMismatch { .. })));
    }
}
