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

//! Core identifier types for catalog entities, bookings, and payments.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! id_type {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type! {
    /// Unique identifier for a country in the tour catalog.
    CountryId
}

id_type! {
    /// Unique identifier for a city in the tour catalog.
    CityId
}

id_type! {
    /// Unique identifier for a hotel in the tour catalog.
    HotelId
}

id_type! {
    /// Unique identifier for a scheduled tour.
    TourId
}

id_type! {
    /// Unique identifier for a customer.
    ///
    /// Users are owned by the identity collaborator; the ledger only stores
    /// their ids on bookings.
    UserId
}

id_type! {
    /// Unique identifier for a booking.
    ///
    /// Allocated by the ledger from a monotonic counter.
    BookingId
}

id_type! {
    /// Unique identifier for a payment event.
    ///
    /// Allocated by the ledger from a monotonic counter, so payment ids
    /// reflect creation order.
    PaymentId
}

/// The acting principal for a ledger call.
///
/// The identity collaborator authenticates the caller and hands the ledger
/// this value; operations scoped to "owner or admin" check it directly
/// instead of reaching into ambient session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct Principal {
    pub user_id: UserId,
    pub is_admin: bool,
}

impl Principal {
    /// A regular customer principal.
    pub fn user(user_id: UserId) -> Self {
        Self {
            user_id,
            is_admin: false,
        }
    }

    /// An administrator principal.
    pub fn admin(user_id: UserId) -> Self {
        Self {
            user_id,
            is_admin: true,
        }
    }

    /// Whether this principal may act on records owned by `owner`.
    pub fn may_act_for(&self, owner: UserId) -> bool {
        self.is_admin || self.user_id == owner
    }
}
