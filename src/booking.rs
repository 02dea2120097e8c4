// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 The tour-ledger-rs Authors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Booking state and settlement.
//!
//! A booking is created with a fixed `total_amount` and an initial
//! prepayment of half that amount; verification gates the one-shot
//! settlement of the remainder. The paid-up sum is never stored — it is
//! recomputed from the payment list on every read, inside the same
//! critical section as any write that depends on it.

use crate::LedgerError;
use crate::base::{BookingId, PaymentId, TourId, UserId};
use crate::payment_journal::{PaymentJournal, PaymentRecord};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug)]
struct BookingData {
    id: BookingId,
    tour_id: TourId,
    user_id: UserId,
    adults_count: u16,
    children_count: u16,
    /// Fixed at creation from the price in effect at that moment.
    total_amount: Decimal,
    is_verified: bool,
    created_at: DateTime<Utc>,
    /// Append-only payment events, prepayment first.
    payments: Vec<Arc<PaymentRecord>>,
}

impl BookingData {
    /// Live sum of this booking's payments.
    fn payed_amount(&self) -> Decimal {
        self.payments.iter().map(|p| p.amount).sum()
    }

    fn assert_invariants(&self) {
        debug_assert!(
            self.payments.iter().all(|p| p.amount >= Decimal::ZERO),
            "Invariant violated: negative payment amount on booking {}",
            self.id
        );
        debug_assert!(
            self.payed_amount() <= self.total_amount,
            "Invariant violated: booking {} payed {} above total {}",
            self.id,
            self.payed_amount(),
            self.total_amount
        );
    }
}

/// A customer's reservation of adult and child places on a tour.
#[derive(Debug)]
pub struct Booking {
    inner: Mutex<BookingData>,
}

impl Booking {
    const DECIMAL_PRECISION: u32 = 2;

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        id: BookingId,
        tour_id: TourId,
        user_id: UserId,
        adults_count: u16,
        children_count: u16,
        total_amount: Decimal,
        created_at: DateTime<Utc>,
        prepayment: Arc<PaymentRecord>,
    ) -> Self {
        let data = BookingData {
            id,
            tour_id,
            user_id,
            adults_count,
            children_count,
            total_amount,
            is_verified: false,
            created_at,
            payments: vec![prepayment],
        };
        data.assert_invariants();
        Self {
            inner: Mutex::new(data),
        }
    }

    pub fn id(&self) -> BookingId {
        self.inner.lock().id
    }

    pub fn tour_id(&self) -> TourId {
        self.inner.lock().tour_id
    }

    pub fn user_id(&self) -> UserId {
        self.inner.lock().user_id
    }

    /// Places this booking occupies on its tour.
    pub fn seats(&self) -> u32 {
        let data = self.inner.lock();
        u32::from(data.adults_count) + u32::from(data.children_count)
    }

    pub fn total_amount(&self) -> Decimal {
        self.inner.lock().total_amount
    }

    /// Live sum of this booking's payments.
    pub fn payed_amount(&self) -> Decimal {
        self.inner.lock().payed_amount()
    }

    pub fn is_verified(&self) -> bool {
        self.inner.lock().is_verified
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.inner.lock().created_at
    }

    /// Marks the booking as verified. Re-verifying is a no-op.
    pub(crate) fn mark_verified(&self) {
        self.inner.lock().is_verified = true;
    }

    /// Settles the outstanding balance with a single payment.
    ///
    /// The remainder is recomputed and the payment journaled inside one
    /// critical section, so a concurrent second call observes the first
    /// and records a zero amount instead of doubling the settlement.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::UnverifiedBooking`] - the booking has not been
    ///   verified yet.
    /// - [`LedgerError::DuplicatePayment`] - the journal already holds
    ///   `payment_id`.
    pub(crate) fn settle_remaining(
        &self,
        journal: &PaymentJournal,
        payment_id: PaymentId,
        now: DateTime<Utc>,
    ) -> Result<Arc<PaymentRecord>, LedgerError> {
        let mut data = self.inner.lock();

        if !data.is_verified {
            return Err(LedgerError::UnverifiedBooking);
        }

        let remaining = data.total_amount - data.payed_amount();
        let payment = Arc::new(PaymentRecord {
            id: payment_id,
            booking_id: data.id,
            amount: remaining,
            created_at: now,
        });

        // Journal first, as with the prepayment at booking time; a journal
        // rejection must leave the booking untouched.
        journal.push(Arc::clone(&payment))?;
        data.payments.push(Arc::clone(&payment));
        data.assert_invariants();
        Ok(payment)
    }

    /// This booking's payment events in creation order.
    pub fn payments(&self) -> Vec<Arc<PaymentRecord>> {
        self.inner.lock().payments.clone()
    }

    /// A plain-value snapshot with display-rounded amounts.
    pub fn snapshot(&self) -> BookingRecord {
        let data = self.inner.lock();
        BookingRecord {
            id: data.id,
            tour_id: data.tour_id,
            user_id: data.user_id,
            adults_count: data.adults_count,
            children_count: data.children_count,
            total_amount: data.total_amount.round_dp(Self::DECIMAL_PRECISION),
            payed_amount: data.payed_amount().round_dp(Self::DECIMAL_PRECISION),
            is_verified: data.is_verified,
            created_at: data.created_at,
        }
    }
}

/// Point-in-time view of a [`Booking`], safe to hand across the API
/// boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookingRecord {
    pub id: BookingId,
    pub tour_id: TourId,
    pub user_id: UserId,
    pub adults_count: u16,
    pub children_count: u16,
    pub total_amount: Decimal,
    pub payed_amount: Decimal,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
}
