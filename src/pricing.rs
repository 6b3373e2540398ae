use crate::api::Pricing;
use crate::validation::ValidationError;

fn check_amount(name: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ValidationError::InvalidAmount(name));
    }
    Ok(())
}

/// Build a pricing update, refusing non-admin sessions and malformed amounts.
pub fn pricing_update(is_admin: bool, nightly_rate: f64, electricity_surcharge: f64, currency: &str) -> Result<Pricing, ValidationError> {
    if !is_admin {
        return Err(ValidationError::NotAdmin);
    }
    check_amount("nightly rate", nightly_rate)?;
    check_amount("electricity surcharge", electricity_surcharge)?;

    let currency = currency.trim().to_ascii_uppercase();
    if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(ValidationError::InvalidCurrency(currency));
    }

    Ok(Pricing {
        nightly_rate: nightly_rate,
        electricity_surcharge: electricity_surcharge,
        currency: currency
    })
}
