use crate::models::{Booking, BookingStatus, Invoice, LaborCharge, Money, PartLine, PaymentStatus};

#[derive(Debug, thiserror::Error)]
pub enum InvoiceError {
    #[error("booking {booking_id} is {status}, only completed bookings can be invoiced")]
    NotCompleted {
        booking_id: String,
        status: BookingStatus,
    },

    #[error("invalid invoice input: {0}")]
    InvalidInput(String),

    #[error("invoice amount overflows")]
    Overflow,
}

#[derive(Debug, Clone)]
pub struct InvoiceInputs {
    pub labor: LaborCharge,
    pub parts: Vec<PartLine>,
}

const INVOICE_PREFIX: &str = "INV-";

/// Invoice ids are stable for a booking: the prefix plus the first eight
/// characters of the booking id.
pub fn invoice_id(booking_id: &str) -> String {
    let short: String = booking_id.chars().take(8).collect();
    format!("{INVOICE_PREFIX}{}", short.to_uppercase())
}

/// Labor cost in minor units. Hours are hundredths, so the product is
/// rounded half up to the nearest cent.
pub fn labor_total(labor: &LaborCharge) -> Result<Money, InvoiceError> {
    let raw = labor
        .hours_hundredths
        .checked_mul(labor.rate.cents())
        .and_then(|v| v.checked_add(50))
        .ok_or(InvoiceError::Overflow)?;
    Ok(Money(raw / 100))
}

pub fn parts_total(parts: &[PartLine]) -> Result<Money, InvoiceError> {
    parts.iter().try_fold(Money::ZERO, |acc, part| {
        part.unit_price
            .checked_mul(part.quantity)
            .and_then(|line| acc.checked_add(line))
            .ok_or(InvoiceError::Overflow)
    })
}

fn validate(inputs: &InvoiceInputs) -> Result<(), InvoiceError> {
    if inputs.labor.hours_hundredths < 0 {
        return Err(InvoiceError::InvalidInput("labor hours cannot be negative".to_string()));
    }
    if inputs.labor.rate.cents() < 0 {
        return Err(InvoiceError::InvalidInput("labor rate cannot be negative".to_string()));
    }
    for part in &inputs.parts {
        if part.quantity < 0 || part.unit_price.cents() < 0 {
            return Err(InvoiceError::InvalidInput(format!(
                "part {} has a negative quantity or price",
                part.name
            )));
        }
    }
    Ok(())
}

pub fn generate_invoice(booking: &Booking, inputs: &InvoiceInputs) -> Result<Invoice, InvoiceError> {
    if booking.status != BookingStatus::Completed {
        return Err(InvoiceError::NotCompleted {
            booking_id: booking.id.clone(),
            status: booking.status,
        });
    }
    validate(inputs)?;

    let labor_total = labor_total(&inputs.labor)?;
    let parts_total = parts_total(&inputs.parts)?;
    let total = labor_total
        .checked_add(parts_total)
        .ok_or(InvoiceError::Overflow)?;

    Ok(Invoice {
        id: invoice_id(&booking.id),
        booking_id: booking.id.clone(),
        customer_id: booking.customer_id.clone(),
        service_type: booking.service_type.clone(),
        vehicle: booking.vehicle.describe(),
        service_date: booking.scheduled_time,
        labor: inputs.labor,
        parts: inputs.parts.clone(),
        labor_total,
        parts_total,
        total,
        payment_status: PaymentStatus::Unpaid,
    })
}
