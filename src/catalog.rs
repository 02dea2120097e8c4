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

//! Tour catalog: countries, cities, hotels, and scheduled tours.
//!
//! The catalog is the read-mostly input to the booking ledger. Records are
//! plain value structs related by id references; lookups are explicit
//! fetch calls rather than lazy navigation, which keeps the join chain
//! (tour → hotel → city → country) visible at every call site.
//!
//! Catalog ids are assigned by the caller (administrative tooling or the
//! CSV loader); inserting a record under an id that is already taken is an
//! error rather than an overwrite.

use crate::base::{CityId, CountryId, HotelId, TourId};
use crate::error::LedgerError;
use chrono::NaiveDateTime;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A destination country.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Country {
    pub id: CountryId,
    /// URL-friendly unique key, e.g. `"france"`.
    pub slug: String,
    pub name: String,
    pub description: String,
    /// Opaque path into the file storage collaborator.
    pub image_path: Option<String>,
}

/// A city within a country.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct City {
    pub id: CityId,
    pub country_id: CountryId,
    pub name: String,
    pub description: String,
    pub image_path: Option<String>,
}

/// A hotel within a city.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hotel {
    pub id: HotelId,
    pub city_id: CityId,
    pub name: String,
}

/// A scheduled trip at a hotel with a date range, capacity, and price.
///
/// `max_participant_count` bounds the sum of adults and children across all
/// bookings of the tour; the live participant count is derived by the
/// ledger, never stored here. Children are billed at half the adult price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tour {
    pub id: TourId,
    pub hotel_id: HotelId,
    pub start_date: NaiveDateTime,
    pub end_date: NaiveDateTime,
    pub max_participant_count: u16,
    pub adult_price: Decimal,
}

/// Concurrent registry of catalog records.
///
/// Writes validate id uniqueness and referential integrity (a city needs
/// its country, a hotel its city, a tour its hotel). Removals cascade
/// downward and report the ids of every tour that went away so the ledger
/// can purge the bookings hanging off them.
#[derive(Debug, Default)]
pub struct Catalog {
    countries: DashMap<CountryId, Country>,
    /// Country slugs, for uniqueness and slug-keyed lookup.
    slugs: DashMap<String, CountryId>,
    cities: DashMap<CityId, City>,
    hotels: DashMap<HotelId, Hotel>,
    tours: DashMap<TourId, Tour>,
}

impl Catalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    // === Countries ===

    /// Adds a country.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::DuplicateSlug`] - the slug is already taken.
    /// - [`LedgerError::DuplicateId`] - the id is already taken.
    pub fn add_country(&self, country: Country) -> Result<(), LedgerError> {
        // Reserve the slug first; the entry API makes the check-and-insert
        // atomic under concurrent adds of the same slug.
        match self.slugs.entry(country.slug.clone()) {
            Entry::Occupied(_) => return Err(LedgerError::DuplicateSlug),
            Entry::Vacant(entry) => {
                entry.insert(country.id);
            }
        }

        match self.countries.entry(country.id) {
            Entry::Occupied(_) => {
                self.slugs.remove(&country.slug);
                Err(LedgerError::DuplicateId)
            }
            Entry::Vacant(entry) => {
                entry.insert(country);
                Ok(())
            }
        }
    }

    /// Replaces an existing country record, re-keying the slug if it changed.
    pub fn update_country(&self, country: Country) -> Result<(), LedgerError> {
        let mut existing = self
            .countries
            .get_mut(&country.id)
            .ok_or(LedgerError::CountryNotFound)?;

        if existing.slug != country.slug {
            match self.slugs.entry(country.slug.clone()) {
                Entry::Occupied(_) => return Err(LedgerError::DuplicateSlug),
                Entry::Vacant(entry) => {
                    entry.insert(country.id);
                }
            }
            self.slugs.remove(&existing.slug);
        }

        *existing = country;
        Ok(())
    }

    /// Removes a country and everything beneath it.
    ///
    /// Returns the ids of all tours removed by the cascade.
    pub fn remove_country(&self, id: CountryId) -> Result<Vec<TourId>, LedgerError> {
        let (_, country) = self
            .countries
            .remove(&id)
            .ok_or(LedgerError::CountryNotFound)?;
        self.slugs.remove(&country.slug);

        let city_ids: Vec<CityId> = self
            .cities
            .iter()
            .filter(|c| c.country_id == id)
            .map(|c| c.id)
            .collect();

        let mut removed = Vec::new();
        for city_id in city_ids {
            self.cities.remove(&city_id);
            removed.extend(self.cascade_city(city_id));
        }
        Ok(removed)
    }

    pub fn country(&self, id: CountryId) -> Option<Country> {
        self.countries.get(&id).map(|c| c.clone())
    }

    pub fn country_by_slug(&self, slug: &str) -> Option<Country> {
        let id = *self.slugs.get(slug)?;
        self.country(id)
    }

    /// All countries, ordered by id.
    pub fn countries(&self) -> Vec<Country> {
        let mut records: Vec<Country> = self.countries.iter().map(|c| c.clone()).collect();
        records.sort_by_key(|c| c.id);
        records
    }

    // === Cities ===

    /// Adds a city under an existing country.
    pub fn add_city(&self, city: City) -> Result<(), LedgerError> {
        if !self.countries.contains_key(&city.country_id) {
            return Err(LedgerError::CountryNotFound);
        }
        match self.cities.entry(city.id) {
            Entry::Occupied(_) => Err(LedgerError::DuplicateId),
            Entry::Vacant(entry) => {
                entry.insert(city);
                Ok(())
            }
        }
    }

    pub fn update_city(&self, city: City) -> Result<(), LedgerError> {
        if !self.countries.contains_key(&city.country_id) {
            return Err(LedgerError::CountryNotFound);
        }
        let mut existing = self
            .cities
            .get_mut(&city.id)
            .ok_or(LedgerError::CityNotFound)?;
        *existing = city;
        Ok(())
    }

    /// Removes a city, its hotels, and their tours.
    pub fn remove_city(&self, id: CityId) -> Result<Vec<TourId>, LedgerError> {
        self.cities.remove(&id).ok_or(LedgerError::CityNotFound)?;
        Ok(self.cascade_city(id))
    }

    pub fn city(&self, id: CityId) -> Option<City> {
        self.cities.get(&id).map(|c| c.clone())
    }

    /// Cities of one country, ordered by id.
    pub fn cities_of(&self, country_id: CountryId) -> Vec<City> {
        let mut records: Vec<City> = self
            .cities
            .iter()
            .filter(|c| c.country_id == country_id)
            .map(|c| c.clone())
            .collect();
        records.sort_by_key(|c| c.id);
        records
    }

    // === Hotels ===

    /// Adds a hotel under an existing city.
    pub fn add_hotel(&self, hotel: Hotel) -> Result<(), LedgerError> {
        if !self.cities.contains_key(&hotel.city_id) {
            return Err(LedgerError::CityNotFound);
        }
        match self.hotels.entry(hotel.id) {
            Entry::Occupied(_) => Err(LedgerError::DuplicateId),
            Entry::Vacant(entry) => {
                entry.insert(hotel);
                Ok(())
            }
        }
    }

    pub fn update_hotel(&self, hotel: Hotel) -> Result<(), LedgerError> {
        if !self.cities.contains_key(&hotel.city_id) {
            return Err(LedgerError::CityNotFound);
        }
        let mut existing = self
            .hotels
            .get_mut(&hotel.id)
            .ok_or(LedgerError::HotelNotFound)?;
        *existing = hotel;
        Ok(())
    }

    /// Removes a hotel and its tours.
    pub fn remove_hotel(&self, id: HotelId) -> Result<Vec<TourId>, LedgerError> {
        self.hotels.remove(&id).ok_or(LedgerError::HotelNotFound)?;
        Ok(self.cascade_hotel(id))
    }

    pub fn hotel(&self, id: HotelId) -> Option<Hotel> {
        self.hotels.get(&id).map(|h| h.clone())
    }

    /// Hotels of one city, ordered by id.
    pub fn hotels_of(&self, city_id: CityId) -> Vec<Hotel> {
        let mut records: Vec<Hotel> = self
            .hotels
            .iter()
            .filter(|h| h.city_id == city_id)
            .map(|h| h.clone())
            .collect();
        records.sort_by_key(|h| h.id);
        records
    }

    // === Tours ===

    /// Adds a tour under an existing hotel.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::HotelNotFound`] - unknown hotel reference.
    /// - [`LedgerError::InvalidCapacity`] - zero participant capacity.
    /// - [`LedgerError::InvalidPrice`] - negative adult price.
    /// - [`LedgerError::DuplicateId`] - the id is already taken.
    pub fn add_tour(&self, tour: Tour) -> Result<(), LedgerError> {
        self.validate_tour(&tour)?;
        match self.tours.entry(tour.id) {
            Entry::Occupied(_) => Err(LedgerError::DuplicateId),
            Entry::Vacant(entry) => {
                entry.insert(tour);
                Ok(())
            }
        }
    }

    /// Replaces an existing tour record.
    ///
    /// Price changes never touch existing bookings; their `total_amount`
    /// was fixed when they were created.
    pub fn update_tour(&self, tour: Tour) -> Result<(), LedgerError> {
        self.validate_tour(&tour)?;
        let mut existing = self
            .tours
            .get_mut(&tour.id)
            .ok_or(LedgerError::TourNotFound)?;
        *existing = tour;
        Ok(())
    }

    /// Removes a tour record. The caller is responsible for purging the
    /// bookings that referenced it.
    pub fn remove_tour(&self, id: TourId) -> Result<(), LedgerError> {
        self.tours
            .remove(&id)
            .map(|_| ())
            .ok_or(LedgerError::TourNotFound)
    }

    pub fn tour(&self, id: TourId) -> Option<Tour> {
        self.tours.get(&id).map(|t| t.clone())
    }

    /// Tours of one hotel, ordered by id.
    pub fn tours_of(&self, hotel_id: HotelId) -> Vec<Tour> {
        let mut records: Vec<Tour> = self
            .tours
            .iter()
            .filter(|t| t.hotel_id == hotel_id)
            .map(|t| t.clone())
            .collect();
        records.sort_by_key(|t| t.id);
        records
    }

    /// All tours, unordered.
    pub(crate) fn all_tours(&self) -> Vec<Tour> {
        self.tours.iter().map(|t| t.clone()).collect()
    }

    /// Resolves a tour's city through its hotel.
    pub fn city_of_tour(&self, tour_id: TourId) -> Option<City> {
        let tour = self.tour(tour_id)?;
        let hotel = self.hotel(tour.hotel_id)?;
        self.city(hotel.city_id)
    }

    /// Resolves a tour's country through its hotel and city.
    pub fn country_of_tour(&self, tour_id: TourId) -> Option<Country> {
        let city = self.city_of_tour(tour_id)?;
        self.country(city.country_id)
    }

    fn validate_tour(&self, tour: &Tour) -> Result<(), LedgerError> {
        if !self.hotels.contains_key(&tour.hotel_id) {
            return Err(LedgerError::HotelNotFound);
        }
        if tour.max_participant_count == 0 {
            return Err(LedgerError::InvalidCapacity);
        }
        if tour.adult_price < Decimal::ZERO {
            return Err(LedgerError::InvalidPrice);
        }
        Ok(())
    }

    fn cascade_city(&self, city_id: CityId) -> Vec<TourId> {
        let hotel_ids: Vec<HotelId> = self
            .hotels
            .iter()
            .filter(|h| h.city_id == city_id)
            .map(|h| h.id)
            .collect();

        let mut removed = Vec::new();
        for hotel_id in hotel_ids {
            self.hotels.remove(&hotel_id);
            removed.extend(self.cascade_hotel(hotel_id));
        }
        removed
    }

    fn cascade_hotel(&self, hotel_id: HotelId) -> Vec<TourId> {
        let tour_ids: Vec<TourId> = self
            .tours
            .iter()
            .filter(|t| t.hotel_id == hotel_id)
            .map(|t| t.id)
            .collect();

        for tour_id in &tour_ids {
            self.tours.remove(tour_id);
        }
        tour_ids
    }
}
