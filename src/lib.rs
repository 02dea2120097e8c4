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

//! # Tour Ledger
//!
//! This library provides a booking engine for tour agencies: capacity-safe
//! booking admission, split-payment tracking (half up front, the rest
//! settled after verification), and occupancy analytics.
//!
//! ## Core Components
//!
//! - [`Catalog`]: countries, cities, hotels, and scheduled tours
//! - [`Ledger`]: admits bookings against tour capacity and settles payments
//! - [`Booking`]: one customer's reservation with its payment history
//! - [`LedgerError`]: error types for booking and catalog failures
//! - [`analytics`]: booking counts and fill rates over a date window
//!
//! ## Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use std::sync::Arc;
//! use tour_ledger_rs::{
//!     Catalog, City, CityId, Country, CountryId, Hotel, HotelId, Ledger,
//!     Principal, Tour, TourId, UserId,
//! };
//!
//! let catalog = Catalog::new();
//! catalog.add_country(Country {
//!     id: CountryId(1),
//!     slug: "france".into(),
//!     name: "France".into(),
//!     description: String::new(),
//!     image_path: None,
//! }).unwrap();
//! catalog.add_city(City {
//!     id: CityId(1),
//!     country_id: CountryId(1),
//!     name: "Paris".into(),
//!     description: String::new(),
//!     image_path: None,
//! }).unwrap();
//! catalog.add_hotel(Hotel {
//!     id: HotelId(1),
//!     city_id: CityId(1),
//!     name: "Le Grand".into(),
//! }).unwrap();
//! catalog.add_tour(Tour {
//!     id: TourId(1),
//!     hotel_id: HotelId(1),
//!     start_date: "2026-06-01T10:00:00".parse().unwrap(),
//!     end_date: "2026-06-08T10:00:00".parse().unwrap(),
//!     max_participant_count: 5,
//!     adult_price: dec!(100.00),
//! }).unwrap();
//!
//! let ledger = Ledger::new(Arc::new(catalog));
//!
//! // Two adults and a child: 2 * 100 + 1 * 50 = 250, half prepaid.
//! let booking = ledger.make_booking(TourId(1), UserId(7), 2, 1).unwrap();
//! assert_eq!(booking.total_amount, dec!(250.00));
//! assert_eq!(booking.payed_amount, dec!(125.00));
//!
//! // After verification the remainder settles in one shot.
//! ledger.verify_booking(booking.id).unwrap();
//! let payment = ledger
//!     .pay_remaining(&Principal::user(UserId(7)), booking.id)
//!     .unwrap();
//! assert_eq!(payment.amount, dec!(125.00));
//! ```
//!
//! ## Thread Safety
//!
//! The ledger serializes conflicting calls on the same tour or booking and
//! lets operations on different tours and bookings run in parallel, so a
//! tour can never be overbooked by concurrent requests.

pub mod analytics;
mod base;
pub mod booking;
mod catalog;
pub mod error;
mod ledger;
mod payment_journal;

pub use base::{BookingId, CityId, CountryId, HotelId, PaymentId, Principal, TourId, UserId};
pub use booking::{Booking, BookingRecord};
pub use catalog::{Catalog, City, Country, Hotel, Tour};
pub use error::LedgerError;
pub use ledger::{Ledger, TourSearch};
pub use payment_journal::{PaymentJournal, PaymentRecord};
