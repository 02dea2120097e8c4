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

//! Ledger public API integration tests.

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use tour_ledger_rs::{
    BookingId, Catalog, City, CityId, Country, CountryId, Hotel, HotelId, Ledger, LedgerError,
    Principal, Tour, TourId, TourSearch, UserId,
};

// === Helper Functions ===

fn datetime(y: i32, m: u32, d: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(10, 0, 0)
        .unwrap()
}

fn make_tour(id: u32, capacity: u16, price: Decimal) -> Tour {
    Tour {
        id: TourId(id),
        hotel_id: HotelId(1),
        start_date: datetime(2026, 6, 1),
        end_date: datetime(2026, 6, 8),
        max_participant_count: capacity,
        adult_price: price,
    }
}

/// France/Paris/Le Grand with tour 1: 5 places at 100.00.
fn sample_ledger() -> Ledger {
    let catalog = Catalog::new();
    catalog
        .add_country(Country {
            id: CountryId(1),
            slug: "france".into(),
            name: "France".into(),
            description: String::new(),
            image_path: None,
        })
        .unwrap();
    catalog
        .add_city(City {
            id: CityId(1),
            country_id: CountryId(1),
            name: "Paris".into(),
            description: String::new(),
            image_path: None,
        })
        .unwrap();
    catalog
        .add_hotel(Hotel {
            id: HotelId(1),
            city_id: CityId(1),
            name: "Le Grand".into(),
        })
        .unwrap();
    catalog.add_tour(make_tour(1, 5, dec!(100.00))).unwrap();
    Ledger::new(Arc::new(catalog))
}

// === Admission ===

#[test]
fn booking_creates_record_and_prepayment() {
    let ledger = sample_ledger();

    let booking = ledger.make_booking(TourId(1), UserId(7), 2, 1).unwrap();

    assert_eq!(booking.total_amount, dec!(250.00));
    assert_eq!(booking.payed_amount, dec!(125.00));
    assert!(!booking.is_verified);

    let payments = ledger.payments();
    assert_eq!(payments.len(), 1);
    assert_eq!(payments[0].amount, dec!(125.00));
    assert_eq!(payments[0].booking_id, booking.id);

    assert_eq!(ledger.places_left(TourId(1)).unwrap(), 2);
}

#[test]
fn booking_requires_an_adult() {
    let ledger = sample_ledger();
    let result = ledger.make_booking(TourId(1), UserId(7), 0, 2);
    assert_eq!(result, Err(LedgerError::InvalidParticipantCount));
}

#[test]
fn booking_unknown_tour() {
    let ledger = sample_ledger();
    let result = ledger.make_booking(TourId(9), UserId(7), 1, 0);
    assert_eq!(result, Err(LedgerError::TourNotFound));
}

#[test]
fn capacity_rejection_reports_shortfall() {
    let ledger = sample_ledger();
    ledger.make_booking(TourId(1), UserId(1), 4, 0).unwrap();

    let result = ledger.make_booking(TourId(1), UserId(2), 2, 0);
    assert_eq!(result, Err(LedgerError::CapacityExceeded { places_left: 1 }));
}

#[test]
fn exact_fill_is_admitted() {
    let ledger = sample_ledger();
    ledger.make_booking(TourId(1), UserId(1), 3, 0).unwrap();
    ledger.make_booking(TourId(1), UserId(2), 1, 1).unwrap();

    assert_eq!(ledger.places_left(TourId(1)).unwrap(), 0);
    let result = ledger.make_booking(TourId(1), UserId(3), 1, 0);
    assert_eq!(result, Err(LedgerError::CapacityExceeded { places_left: 0 }));
}

#[test]
fn total_amount_survives_price_change() {
    let ledger = sample_ledger();
    let booking = ledger.make_booking(TourId(1), UserId(7), 1, 0).unwrap();
    assert_eq!(booking.total_amount, dec!(100.00));

    ledger
        .catalog()
        .update_tour(make_tour(1, 5, dec!(500.00)))
        .unwrap();

    // The old booking keeps its price; a new one pays the new price.
    assert_eq!(
        ledger.booking(booking.id).unwrap().total_amount,
        dec!(100.00)
    );
    let newer = ledger.make_booking(TourId(1), UserId(8), 1, 0).unwrap();
    assert_eq!(newer.total_amount, dec!(500.00));
}

#[test]
fn failed_cost_computation_leaves_no_booking() {
    let ledger = sample_ledger();
    ledger
        .catalog()
        .add_tour(make_tour(2, 5, Decimal::MAX))
        .unwrap();

    let result = ledger.make_booking(TourId(2), UserId(7), 2, 0);
    assert_eq!(result, Err(LedgerError::AmountOverflow));

    assert!(ledger.list_bookings().is_empty());
    assert!(ledger.payments().is_empty());
    assert_eq!(ledger.places_left(TourId(2)).unwrap(), 5);
}

// === Verification ===

#[test]
fn verify_marks_booking() {
    let ledger = sample_ledger();
    let booking = ledger.make_booking(TourId(1), UserId(7), 1, 0).unwrap();

    ledger.verify_booking(booking.id).unwrap();
    assert!(ledger.booking(booking.id).unwrap().is_verified);
}

#[test]
fn verify_is_idempotent() {
    let ledger = sample_ledger();
    let booking = ledger.make_booking(TourId(1), UserId(7), 1, 0).unwrap();

    ledger.verify_booking(booking.id).unwrap();
    ledger.verify_booking(booking.id).unwrap();
    assert!(ledger.booking(booking.id).unwrap().is_verified);
}

#[test]
fn verify_unknown_booking() {
    let ledger = sample_ledger();
    let result = ledger.verify_booking(BookingId(9));
    assert_eq!(result, Err(LedgerError::BookingNotFound));
}

// === Settlement ===

#[test]
fn settlement_pays_exact_remainder() {
    let ledger = sample_ledger();
    let owner = Principal::user(UserId(7));
    let booking = ledger.make_booking(TourId(1), UserId(7), 2, 1).unwrap();
    ledger.verify_booking(booking.id).unwrap();

    let payment = ledger.pay_remaining(&owner, booking.id).unwrap();
    assert_eq!(payment.amount, dec!(125.00));
    assert_eq!(ledger.booking(booking.id).unwrap().payed_amount, dec!(250.00));
}

#[test]
fn settlement_requires_verification() {
    let ledger = sample_ledger();
    let owner = Principal::user(UserId(7));
    let booking = ledger.make_booking(TourId(1), UserId(7), 1, 0).unwrap();

    let result = ledger.pay_remaining(&owner, booking.id);
    assert_eq!(result, Err(LedgerError::UnverifiedBooking));
    assert_eq!(ledger.payments().len(), 1); // Only the prepayment.
}

#[test]
fn second_settlement_adds_nothing() {
    let ledger = sample_ledger();
    let owner = Principal::user(UserId(7));
    let booking = ledger.make_booking(TourId(1), UserId(7), 1, 0).unwrap();
    ledger.verify_booking(booking.id).unwrap();

    ledger.pay_remaining(&owner, booking.id).unwrap();
    let second = ledger.pay_remaining(&owner, booking.id).unwrap();

    assert_eq!(second.amount, Decimal::ZERO);
    assert_eq!(
        ledger.booking(booking.id).unwrap().payed_amount,
        dec!(100.00)
    );
}

#[test]
fn settlement_restricted_to_owner_or_admin() {
    let ledger = sample_ledger();
    let booking = ledger.make_booking(TourId(1), UserId(7), 1, 0).unwrap();
    ledger.verify_booking(booking.id).unwrap();

    let stranger = Principal::user(UserId(8));
    assert_eq!(
        ledger.pay_remaining(&stranger, booking.id),
        Err(LedgerError::AccessDenied)
    );

    let admin = Principal::admin(UserId(8));
    assert!(ledger.pay_remaining(&admin, booking.id).is_ok());
}

#[test]
fn settlement_unknown_booking() {
    let ledger = sample_ledger();
    let admin = Principal::admin(UserId(1));
    let result = ledger.pay_remaining(&admin, BookingId(9));
    assert_eq!(result, Err(LedgerError::BookingNotFound));
}

// === Listings ===

#[test]
fn bookings_listed_most_recent_first() {
    let ledger = sample_ledger();
    let first = ledger.make_booking(TourId(1), UserId(1), 1, 0).unwrap();
    let second = ledger.make_booking(TourId(1), UserId(2), 1, 0).unwrap();
    let third = ledger.make_booking(TourId(1), UserId(1), 1, 0).unwrap();

    let ids: Vec<BookingId> = ledger.list_bookings().iter().map(|b| b.id).collect();
    assert_eq!(ids, vec![third.id, second.id, first.id]);
}

#[test]
fn user_listing_filters_and_checks_access() {
    let ledger = sample_ledger();
    ledger.make_booking(TourId(1), UserId(1), 1, 0).unwrap();
    ledger.make_booking(TourId(1), UserId(2), 1, 0).unwrap();
    ledger.make_booking(TourId(1), UserId(1), 1, 0).unwrap();

    let owner = Principal::user(UserId(1));
    let records = ledger.list_bookings_for_user(&owner, UserId(1)).unwrap();
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|b| b.user_id == UserId(1)));

    let admin = Principal::admin(UserId(9));
    assert_eq!(
        ledger
            .list_bookings_for_user(&admin, UserId(1))
            .unwrap()
            .len(),
        2
    );

    assert_eq!(
        ledger.list_bookings_for_user(&owner, UserId(2)),
        Err(LedgerError::AccessDenied)
    );
}

#[test]
fn payments_listed_in_creation_order() {
    let ledger = sample_ledger();
    let owner = Principal::user(UserId(7));
    let booking = ledger.make_booking(TourId(1), UserId(7), 1, 0).unwrap();
    ledger.make_booking(TourId(1), UserId(8), 1, 0).unwrap();
    ledger.verify_booking(booking.id).unwrap();
    ledger.pay_remaining(&owner, booking.id).unwrap();

    let payments = ledger.payments();
    assert_eq!(payments.len(), 3);
    assert!(payments.windows(2).all(|w| w[0].id < w[1].id));
}

// === Deletion ===

#[test]
fn delete_booking_cascades_payments_and_frees_places() {
    let ledger = sample_ledger();
    let booking = ledger.make_booking(TourId(1), UserId(7), 3, 0).unwrap();
    assert_eq!(ledger.places_left(TourId(1)).unwrap(), 2);

    ledger.delete_booking(booking.id).unwrap();

    assert!(ledger.booking(booking.id).is_none());
    assert!(ledger.payments().is_empty());
    assert_eq!(ledger.places_left(TourId(1)).unwrap(), 5);
}

#[test]
fn delete_unknown_booking() {
    let ledger = sample_ledger();
    assert_eq!(
        ledger.delete_booking(BookingId(9)),
        Err(LedgerError::BookingNotFound)
    );
}

#[test]
fn delete_tour_cascades_bookings() {
    let ledger = sample_ledger();
    ledger.make_booking(TourId(1), UserId(7), 2, 0).unwrap();
    ledger.make_booking(TourId(1), UserId(8), 1, 0).unwrap();

    ledger.delete_tour(TourId(1)).unwrap();

    assert!(ledger.catalog().tour(TourId(1)).is_none());
    assert!(ledger.list_bookings().is_empty());
    assert!(ledger.payments().is_empty());
}

#[test]
fn delete_country_cascades_everything() {
    let ledger = sample_ledger();
    ledger.make_booking(TourId(1), UserId(7), 2, 0).unwrap();

    ledger.delete_country(CountryId(1)).unwrap();

    assert!(ledger.catalog().country(CountryId(1)).is_none());
    assert!(ledger.catalog().tour(TourId(1)).is_none());
    assert!(ledger.list_bookings().is_empty());
    assert!(ledger.payments().is_empty());
}

// === Search ===

#[test]
fn search_excludes_full_tours() {
    let ledger = sample_ledger();
    ledger
        .catalog()
        .add_tour(make_tour(2, 2, dec!(80.00)))
        .unwrap();
    ledger.make_booking(TourId(2), UserId(1), 2, 0).unwrap();

    let found = ledger.search_tours(&TourSearch::default());
    let ids: Vec<TourId> = found.iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![TourId(1)]);
}

#[test]
fn search_respects_party_size() {
    let ledger = sample_ledger();
    ledger.make_booking(TourId(1), UserId(1), 3, 0).unwrap();

    let search = TourSearch {
        adults_count: 2,
        children_count: 1,
        ..TourSearch::default()
    };
    assert!(ledger.search_tours(&search).is_empty());

    let smaller = TourSearch {
        adults_count: 2,
        ..TourSearch::default()
    };
    assert_eq!(ledger.search_tours(&smaller).len(), 1);
}

#[test]
fn search_filters_by_start_date_and_duration() {
    let ledger = sample_ledger();

    let search = TourSearch {
        start_date_from: Some(NaiveDate::from_ymd_opt(2026, 6, 1).unwrap()),
        start_date_to: Some(NaiveDate::from_ymd_opt(2026, 6, 1).unwrap()),
        min_days: Some(7),
        ..TourSearch::default()
    };
    assert_eq!(ledger.search_tours(&search).len(), 1);

    let too_long = TourSearch {
        min_days: Some(8),
        ..TourSearch::default()
    };
    assert!(ledger.search_tours(&too_long).is_empty());

    let too_late = TourSearch {
        start_date_from: Some(NaiveDate::from_ymd_opt(2026, 6, 2).unwrap()),
        ..TourSearch::default()
    };
    assert!(ledger.search_tours(&too_late).is_empty());
}
