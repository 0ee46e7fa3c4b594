//! # shutter-sort CLI
//!
//! Command-line interface for the media organizer.
//!
//! ## Usage
//! ```bash
//! shutter-sort organize ~/DCIM ~/Photos --dedupe both --sessions
//! shutter-sort backup ~/Photos /mnt/mirror --verify
//! ```

mod cli;

use shutter_sort::Result;

fn main() -> Result<()> {
    cli::run()
}
