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

//! Booking admission engine.
//!
//! The [`Ledger`] admits bookings against tour capacity, records the
//! mandatory prepayment, and settles outstanding balances. It owns all
//! mutable state: bookings, per-tour seat registers, and the payment
//! journal; the [`Catalog`] it is built over stays read-mostly.
//!
//! # Capacity
//!
//! Admission is check-and-insert under a per-tour lock: the participant
//! sum is recomputed from the register while the lock is held, so two
//! concurrent bookings can never both pass the check against the same
//! stale remainder. Operations on different tours run in parallel.
//!
//! # Payments
//!
//! Every booking starts with a prepayment of half its total; the rest is
//! settled in one shot after an administrator verifies the booking.
//! Settlement recomputes the paid-up sum inside the booking's own critical
//! section, which makes a concurrent double call settle once.

use crate::base::{BookingId, CityId, CountryId, HotelId, PaymentId, Principal, TourId, UserId};
use crate::booking::{Booking, BookingRecord};
use crate::catalog::{Catalog, Tour};
use crate::error::LedgerError;
use crate::payment_journal::{PaymentJournal, PaymentRecord};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

/// One admitted party on a tour.
#[derive(Debug, Clone, Copy)]
struct Party {
    booking_id: BookingId,
    seats: u32,
}

/// Per-tour seat register.
///
/// The mutex serializes the capacity check with the insert; the seat
/// entries are the same sums the bookings themselves carry, maintained
/// under this lock so the check never reads a stale total.
#[derive(Debug, Default)]
struct TourRegister {
    parties: Mutex<Vec<Party>>,
}

/// Availability filter for the customer-facing tour search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TourSearch {
    /// Restrict to one city; takes precedence over `country_id`.
    pub city_id: Option<CityId>,
    pub country_id: Option<CountryId>,
    /// Earliest acceptable start date (date precision).
    pub start_date_from: Option<NaiveDate>,
    /// Latest acceptable start date (date precision).
    pub start_date_to: Option<NaiveDate>,
    /// Minimum tour duration in whole days.
    pub min_days: Option<u32>,
    pub adults_count: u16,
    pub children_count: u16,
}

impl Default for TourSearch {
    fn default() -> Self {
        Self {
            city_id: None,
            country_id: None,
            start_date_from: None,
            start_date_to: None,
            min_days: None,
            adults_count: 1,
            children_count: 0,
        }
    }
}

/// Booking engine over a tour catalog.
///
/// # Invariants
///
/// - For every tour, the seat sum of its bookings never exceeds
///   `max_participant_count`.
/// - A booking's `total_amount` is fixed at creation; later price changes
///   on the tour do not touch it.
/// - A booking's payments never sum above its `total_amount`.
/// - Deleting a booking removes its payments; deleting a catalog record
///   removes everything beneath it.
pub struct Ledger {
    catalog: Arc<Catalog>,
    /// Bookings indexed by id.
    bookings: DashMap<BookingId, Booking>,
    /// Per-tour seat registers guarding admission.
    registers: DashMap<TourId, TourRegister>,
    /// Global payment log.
    journal: PaymentJournal,
    next_booking_id: AtomicU32,
    next_payment_id: AtomicU32,
}

impl Ledger {
    /// Money amounts are fixed to cents when they are created.
    const DECIMAL_PRECISION: u32 = 2;

    /// Customers always prepay this share of the total at booking time.
    pub const PREPAYMENT_RATE: Decimal = dec!(0.5);

    /// Children are billed at this share of the adult price.
    pub const CHILD_PRICE_RATE: Decimal = dec!(0.5);

    /// Creates a ledger over the given catalog, with no bookings.
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            catalog,
            bookings: DashMap::new(),
            registers: DashMap::new(),
            journal: PaymentJournal::new(),
            next_booking_id: AtomicU32::new(1),
            next_payment_id: AtomicU32::new(1),
        }
    }

    /// The catalog this ledger books against.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    // === Booking admission ===

    /// Books places on a tour and records the initial prepayment.
    ///
    /// The total cost is `adults · price + children · price / 2`, fixed on
    /// the booking; the prepayment is half the total. Both records are
    /// created as one unit — a failure journaling the prepayment leaves no
    /// booking behind.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidParticipantCount`] - no adult in the party.
    /// - [`LedgerError::TourNotFound`] - unknown tour reference.
    /// - [`LedgerError::CapacityExceeded`] - the party does not fit into
    ///   the places left; the error carries the exact remainder.
    /// - [`LedgerError::AmountOverflow`] - cost arithmetic overflowed.
    pub fn make_booking(
        &self,
        tour_id: TourId,
        user_id: UserId,
        adults_count: u16,
        children_count: u16,
    ) -> Result<BookingRecord, LedgerError> {
        self.admit(tour_id, user_id, adults_count, children_count, Utc::now())
    }

    /// Admission with an explicit timestamp, for date-window tests.
    #[cfg(test)]
    pub(crate) fn make_booking_at(
        &self,
        tour_id: TourId,
        user_id: UserId,
        adults_count: u16,
        children_count: u16,
        created_at: DateTime<Utc>,
    ) -> Result<BookingRecord, LedgerError> {
        self.admit(tour_id, user_id, adults_count, children_count, created_at)
    }

    fn admit(
        &self,
        tour_id: TourId,
        user_id: UserId,
        adults_count: u16,
        children_count: u16,
        now: DateTime<Utc>,
    ) -> Result<BookingRecord, LedgerError> {
        if adults_count == 0 {
            return Err(LedgerError::InvalidParticipantCount);
        }
        let requested = u32::from(adults_count) + u32::from(children_count);

        // Fast-fail unknown tours before materializing a register for them.
        if self.catalog.tour(tour_id).is_none() {
            return Err(LedgerError::TourNotFound);
        }

        let register = self.registers.entry(tour_id).or_default();
        let mut parties = register.parties.lock();

        // The tour is loaded under the register lock so the capacity check
        // and the insert see one consistent record, and an admission racing
        // a tour deletion resolves to TourNotFound.
        let tour = self.catalog.tour(tour_id).ok_or(LedgerError::TourNotFound)?;

        let participant_count: u32 = parties.iter().map(|p| p.seats).sum();
        let places_left =
            u32::from(tour.max_participant_count).saturating_sub(participant_count);
        if requested > places_left {
            tracing::debug!(%tour_id, requested, places_left, "booking rejected");
            return Err(LedgerError::CapacityExceeded { places_left });
        }

        let total_amount = booking_cost(tour.adult_price, adults_count, children_count)?
            .round_dp(Self::DECIMAL_PRECISION);
        let prepayment_amount = total_amount
            .checked_mul(Self::PREPAYMENT_RATE)
            .ok_or(LedgerError::AmountOverflow)?
            .round_dp(Self::DECIMAL_PRECISION);

        let booking_id = BookingId(self.next_booking_id.fetch_add(1, Ordering::Relaxed));
        let payment_id = PaymentId(self.next_payment_id.fetch_add(1, Ordering::Relaxed));

        let prepayment = Arc::new(PaymentRecord {
            id: payment_id,
            booking_id,
            amount: prepayment_amount,
            created_at: now,
        });

        // Journal the prepayment first; the booking only becomes visible
        // once its payment is on record.
        self.journal.push(Arc::clone(&prepayment))?;

        let booking = Booking::new(
            booking_id,
            tour_id,
            user_id,
            adults_count,
            children_count,
            total_amount,
            now,
            prepayment,
        );
        let record = booking.snapshot();
        self.bookings.insert(booking_id, booking);
        parties.push(Party {
            booking_id,
            seats: requested,
        });

        debug_assert!(
            parties.iter().map(|p| p.seats).sum::<u32>()
                <= u32::from(tour.max_participant_count),
            "Invariant violated: tour {} overbooked",
            tour_id
        );
        tracing::debug!(%tour_id, %booking_id, %user_id, requested, "booking admitted");
        Ok(record)
    }

    /// Marks a booking as verified.
    ///
    /// Verification is the administrative approval gating settlement.
    /// Re-verifying an already-verified booking is a no-op success.
    pub fn verify_booking(&self, booking_id: BookingId) -> Result<(), LedgerError> {
        let booking = self
            .bookings
            .get(&booking_id)
            .ok_or(LedgerError::BookingNotFound)?;
        booking.mark_verified();
        Ok(())
    }

    /// Deletes a booking and, by cascade, its payments. Irreversible.
    pub fn delete_booking(&self, booking_id: BookingId) -> Result<(), LedgerError> {
        let tour_id = {
            let booking = self
                .bookings
                .get(&booking_id)
                .ok_or(LedgerError::BookingNotFound)?;
            booking.tour_id()
        };

        // Remove the booking before releasing its seats, so the tour's
        // live participant sum can shrink below the register total but
        // never exceed it.
        let Some((_, booking)) = self.bookings.remove(&booking_id) else {
            return Err(LedgerError::BookingNotFound);
        };
        for payment in booking.payments() {
            self.journal.remove(payment.id);
        }

        if let Some(register) = self.registers.get(&tour_id) {
            register.parties.lock().retain(|p| p.booking_id != booking_id);
        }
        tracing::debug!(%booking_id, %tour_id, "booking deleted");
        Ok(())
    }

    // === Listings ===

    /// A single booking snapshot.
    pub fn booking(&self, booking_id: BookingId) -> Option<BookingRecord> {
        self.bookings.get(&booking_id).map(|b| b.snapshot())
    }

    /// All bookings, most recent first.
    pub fn list_bookings(&self) -> Vec<BookingRecord> {
        let mut records: Vec<BookingRecord> =
            self.bookings.iter().map(|b| b.snapshot()).collect();
        records.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then(b.id.cmp(&a.id))
        });
        records
    }

    /// One user's bookings, most recent first.
    ///
    /// Restricted to the owner and administrators; the principal comes
    /// from the identity collaborator.
    pub fn list_bookings_for_user(
        &self,
        principal: &Principal,
        user_id: UserId,
    ) -> Result<Vec<BookingRecord>, LedgerError> {
        if !principal.may_act_for(user_id) {
            return Err(LedgerError::AccessDenied);
        }
        let mut records: Vec<BookingRecord> = self
            .bookings
            .iter()
            .filter(|b| b.user_id() == user_id)
            .map(|b| b.snapshot())
            .collect();
        records.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then(b.id.cmp(&a.id))
        });
        Ok(records)
    }

    /// All journaled payments in creation order.
    pub fn payments(&self) -> Vec<Arc<PaymentRecord>> {
        self.journal.records()
    }

    // === Settlement ===

    /// Settles the outstanding balance on a verified booking.
    ///
    /// Always pays the full remainder in one payment; no partial or custom
    /// amounts. The remainder is recomputed inside the booking's critical
    /// section, so two concurrent calls on an outstanding balance B add
    /// exactly B in total.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::BookingNotFound`] - unknown booking reference.
    /// - [`LedgerError::AccessDenied`] - principal is neither the owner
    ///   nor an administrator.
    /// - [`LedgerError::UnverifiedBooking`] - settlement requested before
    ///   verification.
    pub fn pay_remaining(
        &self,
        principal: &Principal,
        booking_id: BookingId,
    ) -> Result<PaymentRecord, LedgerError> {
        let booking = self
            .bookings
            .get(&booking_id)
            .ok_or(LedgerError::BookingNotFound)?;

        if !principal.may_act_for(booking.user_id()) {
            return Err(LedgerError::AccessDenied);
        }

        let payment_id = PaymentId(self.next_payment_id.fetch_add(1, Ordering::Relaxed));
        let payment = booking.settle_remaining(&self.journal, payment_id, Utc::now())?;
        tracing::debug!(%booking_id, amount = %payment.amount, "remainder settled");
        Ok((*payment).clone())
    }

    // === Capacity queries ===

    /// Live participant sum for a tour.
    pub fn participant_count(&self, tour_id: TourId) -> u32 {
        self.registers
            .get(&tour_id)
            .map(|r| r.parties.lock().iter().map(|p| p.seats).sum())
            .unwrap_or(0)
    }

    /// Places still available on a tour.
    pub fn places_left(&self, tour_id: TourId) -> Result<u32, LedgerError> {
        let tour = self.catalog.tour(tour_id).ok_or(LedgerError::TourNotFound)?;
        Ok(u32::from(tour.max_participant_count)
            .saturating_sub(self.participant_count(tour_id)))
    }

    /// Tours with room for the requested party, newest id first.
    ///
    /// A city filter narrows to that city; otherwise a country filter
    /// narrows to that country. Start-date bounds compare at date
    /// precision; `min_days` compares the full start-to-end span.
    pub fn search_tours(&self, search: &TourSearch) -> Vec<Tour> {
        let party = u32::from(search.adults_count) + u32::from(search.children_count);

        let mut matches: Vec<Tour> = self
            .catalog
            .all_tours()
            .into_iter()
            .filter(|tour| {
                let left = u32::from(tour.max_participant_count)
                    .saturating_sub(self.participant_count(tour.id));
                left >= party
            })
            .filter(|tour| self.matches_location(tour, search))
            .filter(|tour| {
                search
                    .start_date_from
                    .is_none_or(|from| tour.start_date.date() >= from)
            })
            .filter(|tour| {
                search
                    .start_date_to
                    .is_none_or(|to| tour.start_date.date() <= to)
            })
            .filter(|tour| {
                search.min_days.is_none_or(|days| {
                    tour.end_date - tour.start_date >= Duration::days(i64::from(days))
                })
            })
            .collect();

        matches.sort_by(|a, b| b.id.cmp(&a.id));
        matches
    }

    fn matches_location(&self, tour: &Tour, search: &TourSearch) -> bool {
        if let Some(city_id) = search.city_id {
            return self
                .catalog
                .city_of_tour(tour.id)
                .is_some_and(|city| city.id == city_id);
        }
        if let Some(country_id) = search.country_id {
            return self
                .catalog
                .country_of_tour(tour.id)
                .is_some_and(|country| country.id == country_id);
        }
        true
    }

    // === Catalog cascades ===

    /// Deletes a tour and, by cascade, its bookings and their payments.
    pub fn delete_tour(&self, tour_id: TourId) -> Result<(), LedgerError> {
        self.catalog.remove_tour(tour_id)?;
        self.purge_tour(tour_id);
        Ok(())
    }

    /// Deletes a hotel and everything beneath it.
    pub fn delete_hotel(&self, hotel_id: HotelId) -> Result<(), LedgerError> {
        for tour_id in self.catalog.remove_hotel(hotel_id)? {
            self.purge_tour(tour_id);
        }
        Ok(())
    }

    /// Deletes a city and everything beneath it.
    pub fn delete_city(&self, city_id: CityId) -> Result<(), LedgerError> {
        for tour_id in self.catalog.remove_city(city_id)? {
            self.purge_tour(tour_id);
        }
        Ok(())
    }

    /// Deletes a country and everything beneath it.
    pub fn delete_country(&self, country_id: CountryId) -> Result<(), LedgerError> {
        for tour_id in self.catalog.remove_country(country_id)? {
            self.purge_tour(tour_id);
        }
        Ok(())
    }

    /// Drops a removed tour's register, bookings, and payments.
    fn purge_tour(&self, tour_id: TourId) {
        let booking_ids: Vec<BookingId> = match self.registers.remove(&tour_id) {
            Some((_, register)) => {
                let parties = register.parties.lock();
                parties.iter().map(|p| p.booking_id).collect()
            }
            None => Vec::new(),
        };

        for booking_id in booking_ids {
            if let Some((_, booking)) = self.bookings.remove(&booking_id) {
                for payment in booking.payments() {
                    self.journal.remove(payment.id);
                }
            }
        }
        tracing::debug!(%tour_id, "tour purged");
    }
}

/// Total booking cost: adults at full price, children at half.
fn booking_cost(
    adult_price: Decimal,
    adults_count: u16,
    children_count: u16,
) -> Result<Decimal, LedgerError> {
    let adults_cost = adult_price
        .checked_mul(Decimal::from(adults_count))
        .ok_or(LedgerError::AmountOverflow)?;
    let child_price = adult_price
        .checked_mul(Ledger::CHILD_PRICE_RATE)
        .ok_or(LedgerError::AmountOverflow)?;
    let children_cost = child_price
        .checked_mul(Decimal::from(children_count))
        .ok_or(LedgerError::AmountOverflow)?;
    adults_cost
        .checked_add(children_cost)
        .ok_or(LedgerError::AmountOverflow)
}
