//! Shared test harness modules for the Tourlane CLI.

use super::*;

mod helpers;
mod refresh_steps;
