//! # bigkey-scan CLI
//!
//! Command-line interface for the Redis big key scanner.
//!
//! ## Usage
//! ```bash
//! bigkey-scan scan --password 123456 --db 0
//! bigkey-scan scan --url redis://cache:6379/ --match 'user:*' --output json
//! ```

mod cli;

use bigkey_scanner::Result;

fn main() -> Result<()> {
    cli::run()
}
