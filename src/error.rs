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

//! Error types for catalog and booking operations.

use thiserror::Error;

/// Booking and catalog processing errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Bookings need at least one adult participant
    #[error("a booking requires at least one adult")]
    InvalidParticipantCount,

    /// Tour capacity must be a positive number of places
    #[error("tour capacity must be positive")]
    InvalidCapacity,

    /// Adult price is negative
    #[error("tour price must not be negative")]
    InvalidPrice,

    /// Referenced country id does not exist
    #[error("country not found")]
    CountryNotFound,

    /// Referenced city id does not exist
    #[error("city not found")]
    CityNotFound,

    /// Referenced hotel id does not exist
    #[error("hotel not found")]
    HotelNotFound,

    /// Referenced tour id does not exist
    #[error("tour not found")]
    TourNotFound,

    /// Referenced booking id does not exist
    #[error("booking not found")]
    BookingNotFound,

    /// Catalog record with the same id already exists
    #[error("duplicate catalog id")]
    DuplicateId,

    /// Country slug is already taken
    #[error("duplicate country slug")]
    DuplicateSlug,

    /// Payment id already present in the journal
    #[error("duplicate payment ID")]
    DuplicatePayment,

    /// Requested party does not fit into the tour's remaining places
    #[error("participant count exceeds the remaining number of places: {places_left}")]
    CapacityExceeded {
        /// Places still available at the time of the attempt.
        places_left: u32,
    },

    /// Remaining-balance settlement requested before verification
    #[error("cannot settle an unverified booking")]
    UnverifiedBooking,

    /// Principal is neither the record owner nor an administrator
    #[error("access denied")]
    AccessDenied,

    /// Decimal cost arithmetic overflowed
    #[error("amount out of range")]
    AmountOverflow,
}
