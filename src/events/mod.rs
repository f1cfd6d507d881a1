//! # Events Module
//!
//! Progress reporting for long scans.
//!
//! ## Design
//! The scanner emits events through a channel, so any front end can show
//! progress while the lazy scan is being consumed.
//!
//! ## Example
//! ```rust,ignore
//! let (sender, receiver) = EventChannel::new();
//!
//! std::thread::spawn(move || {
//!     for event in receiver.iter() {
//!         if let Event::Scan(ScanEvent::BigKeyFound(f)) = event {
//!             println!("{} ({}) = {}", f.key, f.key_type, f.size);
//!         }
//!     }
//! });
//!
//! let report = ScanReport::collect(scanner.scan_with_events(&mut store, sender))?;
//! ```

mod channel;
mod types;

pub use channel::{EventChannel, EventReceiver, EventSender};
pub use types::*;
