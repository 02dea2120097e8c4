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

//! Deadlock detection tests using parking_lot's built-in deadlock detector.
//!
//! These tests verify that the locking patterns used in the booking
//! ledger — per-tour registers guarding admission, per-booking state
//! guarding settlement, and the shared payment journal — do not lead to
//! deadlocks under concurrent access.
//!
//! The tests use parking_lot::Mutex with the `deadlock_detection` feature
//! to automatically detect cycles in the lock graph.

use dashmap::DashMap;
use parking_lot::{Mutex, deadlock};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::thread;
use std::time::Duration;

// === Test Wrappers (mirror production locking patterns) ===

/// Mirrors the production per-tour seat register.
struct TestRegister {
    capacity: u32,
    parties: Mutex<Vec<(u32, u32)>>,
}

impl TestRegister {
    fn new(capacity: u32) -> Self {
        Self {
            capacity,
            parties: Mutex::new(Vec::new()),
        }
    }
}

/// Mirrors the production booking structure with parking_lot::Mutex.
struct TestBooking {
    tour_id: u32,
    total: Decimal,
    verified: AtomicBool,
    payments: Mutex<Vec<(u32, Decimal)>>,
}

impl TestBooking {
    fn payed(&self) -> Decimal {
        self.payments.lock().iter().map(|(_, amount)| *amount).sum()
    }
}

/// Mirrors the production Ledger structure: registers, bookings, and the
/// payment journal, acquired in that order.
struct TestLedger {
    registers: DashMap<u32, Arc<TestRegister>>,
    bookings: DashMap<u32, Arc<TestBooking>>,
    journal: DashMap<u32, Decimal>,
    next_booking_id: AtomicU32,
    next_payment_id: AtomicU32,
}

impl TestLedger {
    fn new() -> Self {
        Self {
            registers: DashMap::new(),
            bookings: DashMap::new(),
            journal: DashMap::new(),
            next_booking_id: AtomicU32::new(1),
            next_payment_id: AtomicU32::new(1),
        }
    }

    fn add_tour(&self, tour_id: u32, capacity: u32) {
        self.registers
            .insert(tour_id, Arc::new(TestRegister::new(capacity)));
    }

    /// Admission path: register lock, then journal insert, then booking
    /// map insert.
    fn admit(&self, tour_id: u32, seats: u32, total: Decimal) -> Option<u32> {
        let register = self.registers.get(&tour_id).map(|r| r.clone())?;
        let mut parties = register.parties.lock();

        let taken: u32 = parties.iter().map(|(_, s)| *s).sum();
        if taken + seats > register.capacity {
            return None;
        }

        let booking_id = self.next_booking_id.fetch_add(1, Ordering::SeqCst);
        let payment_id = self.next_payment_id.fetch_add(1, Ordering::SeqCst);
        let prepayment = total * dec!(0.5);

        self.journal.insert(payment_id, prepayment);
        self.bookings.insert(
            booking_id,
            Arc::new(TestBooking {
                tour_id,
                total,
                verified: AtomicBool::new(true),
                payments: Mutex::new(vec![(payment_id, prepayment)]),
            }),
        );
        parties.push((booking_id, seats));
        Some(booking_id)
    }

    /// Settlement path: booking lock, then journal insert.
    fn settle(&self, booking_id: u32) -> bool {
        let Some(booking) = self.bookings.get(&booking_id).map(|b| b.clone()) else {
            return false;
        };
        if !booking.verified.load(Ordering::SeqCst) {
            return false;
        }

        let mut payments = booking.payments.lock();
        let payed: Decimal = payments.iter().map(|(_, amount)| *amount).sum();
        let remaining = booking.total - payed;

        let payment_id = self.next_payment_id.fetch_add(1, Ordering::SeqCst);
        self.journal.insert(payment_id, remaining);
        payments.push((payment_id, remaining));
        true
    }

    /// Deletion path: booking removed first, then journal, then the
    /// register seats, with no lock held across the steps.
    fn delete(&self, booking_id: u32) -> bool {
        let Some(tour_id) = self.bookings.get(&booking_id).map(|b| b.tour_id) else {
            return false;
        };

        let Some((_, booking)) = self.bookings.remove(&booking_id) else {
            return false;
        };
        for (payment_id, _) in booking.payments.lock().iter() {
            self.journal.remove(payment_id);
        }

        if let Some(register) = self.registers.get(&tour_id) {
            register
                .parties
                .lock()
                .retain(|(id, _)| *id != booking_id);
        }
        true
    }

    fn read_booking(&self, booking_id: u32) -> Option<Decimal> {
        self.bookings.get(&booking_id).map(|b| b.payed())
    }
}

// === Deadlock Detection Infrastructure ===

/// Starts a background thread that checks for deadlocks.
/// Returns a handle to stop the detector.
fn start_deadlock_detector() -> Arc<AtomicBool> {
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = running.clone();

    thread::spawn(move || {
        while running_clone.load(Ordering::SeqCst) {
            thread::sleep(Duration::from_millis(100));
            let deadlocks = deadlock::check_deadlock();
            if !deadlocks.is_empty() {
                eprintln!("\n=== DEADLOCK DETECTED ===");
                for (i, threads) in deadlocks.iter().enumerate() {
                    eprintln!("\nDeadlock #{}", i + 1);
                    for t in threads {
                        eprintln!("Thread ID: {:?}", t.thread_id());
                        eprintln!("Backtrace:\n{:#?}", t.backtrace());
                    }
                }
                panic!("Deadlock detected! See output above for details.");
            }
        }
    });

    running
}

/// Stops the deadlock detector.
fn stop_deadlock_detector(running: Arc<AtomicBool>) {
    running.store(false, Ordering::SeqCst);
    thread::sleep(Duration::from_millis(150)); // Let detector thread exit
}

// === Tests ===

/// Test high contention on a single tour with many threads.
#[test]
fn no_deadlock_high_contention_single_tour() {
    let detector = start_deadlock_detector();
    let ledger = Arc::new(TestLedger::new());
    ledger.add_tour(1, 1_000_000);

    const NUM_THREADS: usize = 50;
    const OPS_PER_THREAD: usize = 100;

    let mut handles = Vec::with_capacity(NUM_THREADS);

    for _ in 0..NUM_THREADS {
        let ledger = ledger.clone();

        let handle = thread::spawn(move || {
            for i in 0..OPS_PER_THREAD {
                if i % 3 == 0 {
                    ledger.admit(1, 1, dec!(100.00));
                } else if i % 3 == 1 {
                    ledger.settle((i % 20) as u32 + 1);
                } else {
                    let _ = ledger.read_booking((i % 20) as u32 + 1);
                }
            }
        });

        handles.push(handle);
    }

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    stop_deadlock_detector(detector);

    println!(
        "High contention test passed: {} threads x {} ops",
        NUM_THREADS, OPS_PER_THREAD
    );
}

/// Test admissions and settlements across multiple tours.
#[test]
fn no_deadlock_cross_tour_operations() {
    let detector = start_deadlock_detector();
    let ledger = Arc::new(TestLedger::new());

    const NUM_THREADS: usize = 20;
    const NUM_TOURS: u32 = 10;
    const OPS_PER_THREAD: usize = 50;

    for tour_id in 1..=NUM_TOURS {
        ledger.add_tour(tour_id, 1_000_000);
    }

    let mut handles = Vec::with_capacity(NUM_THREADS);

    for thread_id in 0..NUM_THREADS {
        let ledger = ledger.clone();

        let handle = thread::spawn(move || {
            for i in 0..OPS_PER_THREAD {
                let tour_id = ((thread_id + i) % (NUM_TOURS as usize)) as u32 + 1;

                if i % 2 == 0 {
                    if let Some(booking_id) = ledger.admit(tour_id, 2, dec!(50.00)) {
                        ledger.settle(booking_id);
                    }
                } else {
                    let _ = ledger.read_booking((i as u32) % 100 + 1);
                }
            }
        });

        handles.push(handle);
    }

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    stop_deadlock_detector(detector);

    println!("Cross-tour test passed: {} tours, {} threads", NUM_TOURS, NUM_THREADS);
}

/// Test admissions racing deletions on the same tour.
#[test]
fn no_deadlock_admit_delete_same_tour() {
    let detector = start_deadlock_detector();
    let ledger = Arc::new(TestLedger::new());
    ledger.add_tour(1, 1_000_000);

    const NUM_PAIRS: usize = 10;
    const OPS_PER_THREAD: usize = 100;

    let mut handles = Vec::with_capacity(NUM_PAIRS * 2);

    for _ in 0..NUM_PAIRS {
        let admitter = {
            let ledger = ledger.clone();
            thread::spawn(move || {
                for _ in 0..OPS_PER_THREAD {
                    ledger.admit(1, 1, dec!(10.00));
                }
            })
        };
        let deleter = {
            let ledger = ledger.clone();
            thread::spawn(move || {
                for i in 0..OPS_PER_THREAD {
                    ledger.delete(i as u32 + 1);
                }
            })
        };
        handles.push(admitter);
        handles.push(deleter);
    }

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    stop_deadlock_detector(detector);

    println!("Admit/delete race test passed");
}

/// Test racing settlements on the same booking.
#[test]
fn no_deadlock_concurrent_settle_same_booking() {
    let detector = start_deadlock_detector();
    let ledger = Arc::new(TestLedger::new());
    ledger.add_tour(1, 100);

    let booking_id = ledger.admit(1, 2, dec!(200.00)).unwrap();

    const NUM_THREADS: usize = 20;
    let mut handles = Vec::with_capacity(NUM_THREADS);

    for _ in 0..NUM_THREADS {
        let ledger = ledger.clone();
        let handle = thread::spawn(move || {
            for _ in 0..50 {
                ledger.settle(booking_id);
                let _ = ledger.read_booking(booking_id);
            }
        });
        handles.push(handle);
    }

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    stop_deadlock_detector(detector);

    // Settlement converges on the total no matter how often it raced.
    assert_eq!(ledger.read_booking(booking_id), Some(dec!(200.00)));
    println!("Concurrent settlement test passed");
}

/// Rapid lock cycling across the register, booking, and journal maps.
#[test]
fn no_deadlock_rapid_lock_cycling() {
    let detector = start_deadlock_detector();
    let ledger = Arc::new(TestLedger::new());
    ledger.add_tour(1, 1_000_000);
    ledger.add_tour(2, 1_000_000);

    const NUM_THREADS: usize = 8;
    const OPS_PER_THREAD: usize = 500;

    let mut handles = Vec::with_capacity(NUM_THREADS);

    for thread_id in 0..NUM_THREADS {
        let ledger = ledger.clone();
        let handle = thread::spawn(move || {
            for i in 0..OPS_PER_THREAD {
                let tour_id = (thread_id % 2) as u32 + 1;
                match i % 4 {
                    0 => {
                        ledger.admit(tour_id, 1, dec!(10.00));
                    }
                    1 => {
                        ledger.settle((i % 50) as u32 + 1);
                    }
                    2 => {
                        ledger.delete((i % 50) as u32 + 1);
                    }
                    _ => {
                        let _ = ledger.read_booking((i % 50) as u32 + 1);
                    }
                }
            }
        });
        handles.push(handle);
    }

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    stop_deadlock_detector(detector);

    println!("Rapid lock cycling test passed");
}
