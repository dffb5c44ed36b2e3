use crate::types::PriceUnit;

impl PriceUnit {
    pub fn grams(self) -> f64 {
        match self {
            PriceUnit::Gram => 1.0,
            PriceUnit::Kilogram => 1_000.0,
        }
    }

    /// Re-quote a USD price given per `self` as a price per `to`.
    pub fn convert_price(self, price_usd: f64, to: PriceUnit) -> f64 {
        if self == to {
            return price_usd;
        }
        price_usd / self.grams() * to.grams()
    }
}

/// Grams per unit for the weight suffixes seen in listing titles.
pub fn grams_per(suffix: &str) -> Option<f64> {
    match suffix.to_ascii_lowercase().as_str() {
        "g" | "gr" | "gram" | "grams" => Some(1.0),
        "ct" | "cts" | "carat" | "carats" => Some(0.2),
        "oz" => Some(28.35),
        "kg" => Some(1_000.0),
        "lb" | "lbs" => Some(453.6),
        _ => None,
    }
}
