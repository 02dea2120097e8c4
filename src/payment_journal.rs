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

//! Append-only journal of payment events.
//!
//! Every payment — the prepayment taken at booking time and the remainder
//! settlement — lands here in addition to its booking, giving
//! administrators one flat listing of all money movements. Entries are
//! never updated; they only disappear when their parent booking is
//! deleted.

use crate::LedgerError;
use crate::base::{BookingId, PaymentId};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;

/// One payment event against a booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentRecord {
    pub id: PaymentId,
    pub booking_id: BookingId,
    pub amount: Decimal,
    pub created_at: DateTime<Utc>,
}

/// A thread-safe payment journal with duplicate detection.
///
/// Payment ids are allocated from a monotonic counter, so listing entries
/// in id order reproduces creation order without a separate queue.
#[derive(Debug, Default)]
pub struct PaymentJournal {
    payments: DashMap<PaymentId, Arc<PaymentRecord>>,
}

impl PaymentJournal {
    /// Creates a new empty journal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a payment to the journal.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::DuplicatePayment`] if a payment with the
    /// same id already exists.
    pub fn push(&self, payment: Arc<PaymentRecord>) -> Result<(), LedgerError> {
        // Use entry API for atomic check-and-insert to prevent race conditions
        match self.payments.entry(payment.id) {
            Entry::Occupied(_) => Err(LedgerError::DuplicatePayment),
            Entry::Vacant(entry) => {
                entry.insert(payment);
                Ok(())
            }
        }
    }

    /// Removes a payment, as part of deleting its parent booking.
    pub(crate) fn remove(&self, id: PaymentId) {
        self.payments.remove(&id);
    }

    /// All journaled payments in creation order.
    pub fn records(&self) -> Vec<Arc<PaymentRecord>> {
        let mut records: Vec<Arc<PaymentRecord>> =
            self.payments.iter().map(|p| Arc::clone(p.value())).collect();
        records.sort_by_key(|p| p.id);
        records
    }

    /// Number of journaled payments.
    pub fn len(&self) -> usize {
        self.payments.len()
    }

    /// Whether the journal holds no payments.
    pub fn is_empty(&self) -> bool {
        self.payments.is_empty()
    }
}
