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

//! Occupancy analytics over a date window.
//!
//! Read-only administrative reports over committed bookings: booking
//! counts grouped by the city or country of the tour's hotel, and per-city
//! fill rates. Nothing here mutates ledger state; the functions read
//! booking snapshots and resolve the tour → hotel → city → country chain
//! through the catalog.

use crate::base::TourId;
use crate::ledger::Ledger;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// Inclusive date window for analytics queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    /// A window over explicit bounds, inclusive on both ends.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Everything from the Unix epoch up to now.
    pub fn all_time() -> Self {
        Self {
            start: DateTime::UNIX_EPOCH,
            end: Utc::now(),
        }
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant <= self.end
    }
}

impl Default for DateRange {
    fn default() -> Self {
        Self::all_time()
    }
}

/// Booking counts per city name for bookings created in the window.
pub fn bookings_count_by_city(ledger: &Ledger, range: &DateRange) -> BTreeMap<String, u64> {
    let mut counts = BTreeMap::new();
    for booking in ledger.list_bookings() {
        if !range.contains(booking.created_at) {
            continue;
        }
        let Some(city) = ledger.catalog().city_of_tour(booking.tour_id) else {
            continue;
        };
        *counts.entry(city.name).or_insert(0) += 1;
    }
    counts
}

/// Booking counts per country name for bookings created in the window.
pub fn bookings_count_by_country(ledger: &Ledger, range: &DateRange) -> BTreeMap<String, u64> {
    let mut counts = BTreeMap::new();
    for booking in ledger.list_bookings() {
        if !range.contains(booking.created_at) {
            continue;
        }
        let Some(country) = ledger.catalog().country_of_tour(booking.tour_id) else {
            continue;
        };
        *counts.entry(country.name).or_insert(0) += 1;
    }
    counts
}

/// Fill-rate percentage per city over tours booked in the window.
///
/// For each tour with at least one booking in the window, participants are
/// summed across its bookings while its capacity counts exactly once, no
/// matter how many bookings it has. A city's rate is
/// `total participants / total capacity · 100`; a zero aggregated
/// capacity yields 0 rather than a division error.
pub fn occupancy_by_city(ledger: &Ledger, range: &DateRange) -> BTreeMap<String, Decimal> {
    // Participants and capacity per tour booked in the window.
    let mut per_tour: BTreeMap<TourId, (u64, u64)> = BTreeMap::new();
    for booking in ledger.list_bookings() {
        if !range.contains(booking.created_at) {
            continue;
        }
        let Some(tour) = ledger.catalog().tour(booking.tour_id) else {
            continue;
        };
        let seats = u64::from(booking.adults_count) + u64::from(booking.children_count);
        let entry = per_tour
            .entry(tour.id)
            .or_insert((0, u64::from(tour.max_participant_count)));
        entry.0 += seats;
    }

    // Roll tours up into their cities.
    let mut per_city: BTreeMap<String, (u64, u64)> = BTreeMap::new();
    for (tour_id, (participants, capacity)) in per_tour {
        let Some(city) = ledger.catalog().city_of_tour(tour_id) else {
            continue;
        };
        let entry = per_city.entry(city.name).or_insert((0, 0));
        entry.0 += participants;
        entry.1 += capacity;
    }

    per_city
        .into_iter()
        .map(|(city, (participants, capacity))| {
            let rate = if capacity == 0 {
                Decimal::ZERO
            } else {
                Decimal::from(participants) / Decimal::from(capacity) * Decimal::ONE_HUNDRED
            };
            (city, rate)
        })
        .collect()
}
