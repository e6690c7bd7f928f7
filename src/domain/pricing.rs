//! Request price calculation.
//!
//! [`quote`] is a pure, total function from event settings and request
//! attributes to a price. It performs no I/O and never errors; missing
//! optional fields simply contribute no surcharge.

use super::event::EventSettings;
use super::request::{RequestType, SongRequestInput};

/// Base price of a standard request when the event settings omit one.
pub const DEFAULT_BASE_PRICE: f64 = 20.0;

/// Price multiplier applied to SPOTLIGHT requests.
pub const SPOTLIGHT_MULTIPLIER: f64 = 2.5;

/// Flat surcharge for an attached dedication.
pub const DEDICATION_SURCHARGE: f64 = 10.0;

/// Flat surcharge for an attached shoutout.
pub const SHOUTOUT_SURCHARGE: f64 = 15.0;

/// Computes the price of a request.
///
/// Base price from the event settings (platform default when absent),
/// multiplied by [`SPOTLIGHT_MULTIPLIER`] for SPOTLIGHT requests, plus
/// flat surcharges for dedication and shoutout add-ons.
#[must_use]
pub fn quote(settings: &EventSettings, input: &SongRequestInput) -> f64 {
    let mut price = settings.base_price.unwrap_or(DEFAULT_BASE_PRICE);
    if input.request_type == RequestType::Spotlight {
        price *= SPOTLIGHT_MULTIPLIER;
    }
    if input.dedication.is_some() {
        price += DEDICATION_SURCHARGE;
    }
    if input.shoutout.is_some() {
        price += SHOUTOUT_SURCHARGE;
    }
    price
}
