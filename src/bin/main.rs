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

use chrono::NaiveDateTime;
use clap::Parser;
use csv::{ReaderBuilder, Trim, Writer};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tour_ledger_rs::{
    Catalog, City, CityId, Country, CountryId, Hotel, HotelId, Ledger, LedgerError, Tour, TourId,
    UserId,
};

/// Tour Ledger - Process catalog and booking-request CSV files
///
/// Loads a tour catalog from one CSV file, runs booking requests from a
/// second one, and outputs the resulting booking records to stdout.
#[derive(Parser, Debug)]
#[command(name = "tour-ledger-rs")]
#[command(about = "A booking engine that processes catalog and booking-request CSVs", long_about = None)]
struct Args {
    /// Path to CSV file with catalog records
    ///
    /// Expected format: kind,id,parent,slug,name,start,end,capacity,price
    #[arg(value_name = "CATALOG")]
    catalog: PathBuf,

    /// Path to CSV file with booking requests
    ///
    /// Expected format: tour,user,adults,children
    #[arg(value_name = "REQUESTS")]
    requests: PathBuf,
}

fn main() {
    let args = Args::parse();

    let catalog_file = open_or_exit(&args.catalog);
    let catalog = match load_catalog(BufReader::new(catalog_file)) {
        Ok(catalog) => catalog,
        Err(e) => {
            eprintln!("Error loading catalog: {}", e);
            process::exit(1);
        }
    };

    let ledger = Ledger::new(Arc::new(catalog));

    let requests_file = open_or_exit(&args.requests);
    if let Err(e) = process_requests(BufReader::new(requests_file), &ledger) {
        eprintln!("Error processing booking requests: {}", e);
        process::exit(1);
    }

    if let Err(e) = write_bookings(&ledger, std::io::stdout()) {
        eprintln!("Error writing output: {}", e);
        process::exit(1);
    }
}

fn open_or_exit(path: &PathBuf) -> File {
    match File::open(path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Error opening file '{}': {}", path.display(), e);
            process::exit(1);
        }
    }
}

/// Raw catalog CSV record.
///
/// Fields: `kind, id, parent, slug, name, start, end, capacity, price` —
/// each kind uses the subset it needs and leaves the rest empty.
#[derive(Debug, Deserialize)]
struct CatalogRecord {
    kind: String,
    id: u32,
    #[serde(deserialize_with = "csv::invalid_option")]
    parent: Option<u32>,
    slug: Option<String>,
    name: Option<String>,
    start: Option<String>,
    end: Option<String>,
    #[serde(deserialize_with = "csv::invalid_option")]
    capacity: Option<u16>,
    #[serde(deserialize_with = "csv::invalid_option")]
    price: Option<Decimal>,
}

#[derive(Debug)]
enum CatalogEntry {
    Country(Country),
    City(City),
    Hotel(Hotel),
    Tour(Tour),
}

impl CatalogRecord {
    /// Converts a CSV record to a catalog entry.
    ///
    /// Returns `None` for unknown kinds or missing required fields.
    fn into_entry(self) -> Option<CatalogEntry> {
        match self.kind.to_lowercase().as_str() {
            "country" => Some(CatalogEntry::Country(Country {
                id: CountryId(self.id),
                slug: self.slug?,
                name: self.name?,
                description: String::new(),
                image_path: None,
            })),
            "city" => Some(CatalogEntry::City(City {
                id: CityId(self.id),
                country_id: CountryId(self.parent?),
                name: self.name?,
                description: String::new(),
                image_path: None,
            })),
            "hotel" => Some(CatalogEntry::Hotel(Hotel {
                id: HotelId(self.id),
                city_id: CityId(self.parent?),
                name: self.name?,
            })),
            "tour" => Some(CatalogEntry::Tour(Tour {
                id: TourId(self.id),
                hotel_id: HotelId(self.parent?),
                start_date: parse_datetime(&self.start?)?,
                end_date: parse_datetime(&self.end?)?,
                max_participant_count: self.capacity?,
                adult_price: self.price?,
            })),
            _ => None,
        }
    }
}

/// Parses `2026-06-01T10:00` or `2026-06-01T10:00:00`.
fn parse_datetime(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M"))
        .ok()
}

/// Raw booking-request CSV record.
///
/// Fields: `tour, user, adults, children`
#[derive(Debug, Deserialize)]
struct RequestRecord {
    tour: u32,
    user: u32,
    adults: u16,
    children: u16,
}

/// Loads catalog records from a CSV reader.
///
/// Rows must appear parents-first (countries before their cities, and so
/// on), matching how the records reference each other. Malformed rows and
/// failed inserts are skipped.
///
/// # Errors
///
/// Returns a CSV error if the reader fails or the CSV structure is invalid.
pub fn load_catalog<R: Read>(reader: R) -> Result<Catalog, csv::Error> {
    let catalog = Catalog::new();

    let mut rdr = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .has_headers(true)
        .from_reader(reader);

    for result in rdr.deserialize::<CatalogRecord>() {
        match result {
            Ok(record) => {
                let Some(entry) = record.into_entry() else {
                    #[cfg(debug_assertions)]
                    eprintln!("Skipping invalid catalog record");
                    continue;
                };

                if let Err(e) = apply_entry(&catalog, entry) {
                    #[cfg(debug_assertions)]
                    eprintln!("Skipping catalog record: {}", e);
                }
            }
            Err(e) => {
                #[cfg(debug_assertions)]
                eprintln!("Skipping malformed row: {}", e);
                continue;
            }
        }
    }

    Ok(catalog)
}

fn apply_entry(catalog: &Catalog, entry: CatalogEntry) -> Result<(), LedgerError> {
    match entry {
        CatalogEntry::Country(country) => catalog.add_country(country),
        CatalogEntry::City(city) => catalog.add_city(city),
        CatalogEntry::Hotel(hotel) => catalog.add_hotel(hotel),
        CatalogEntry::Tour(tour) => catalog.add_tour(tour),
    }
}

/// Runs booking requests from a CSV reader against the ledger.
///
/// Rejected requests (capacity, unknown tour) are skipped, leaving the
/// remaining requests to proceed, as are malformed rows.
///
/// # Errors
///
/// Returns a CSV error if the reader fails or the CSV structure is invalid.
pub fn process_requests<R: Read>(reader: R, ledger: &Ledger) -> Result<(), csv::Error> {
    let mut rdr = ReaderBuilder::new()
        .trim(Trim::All)
        .has_headers(true)
        .from_reader(reader);

    for result in rdr.deserialize::<RequestRecord>() {
        match result {
            Ok(record) => {
                if let Err(_e) = ledger.make_booking(
                    TourId(record.tour),
                    UserId(record.user),
                    record.adults,
                    record.children,
                ) {
                    #[cfg(debug_assertions)]
                    eprintln!("Skipping request for tour {}: {}", record.tour, _e);
                }
            }
            Err(e) => {
                #[cfg(debug_assertions)]
                eprintln!("Skipping malformed row: {}", e);
                continue;
            }
        }
    }

    Ok(())
}

/// Writes booking records to a CSV writer, most recent first.
///
/// # Errors
///
/// Returns a CSV error if writing fails.
pub fn write_bookings<W: Write>(ledger: &Ledger, writer: W) -> Result<(), csv::Error> {
    let mut wtr = Writer::from_writer(writer);

    for record in ledger.list_bookings() {
        wtr.serialize(&record)?;
    }

    wtr.flush()?;
    Ok(())
}
