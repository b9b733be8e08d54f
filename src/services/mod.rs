// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod athletes;
pub mod check_in;
pub mod disclaimer;
pub mod hosts;
pub mod rewards;

pub use athletes::AthleteService;
pub use check_in::CheckInEngine;
pub use disclaimer::{DisclaimerGate, DisclaimerStatus};
pub use hosts::{HostAdmin, HostRegistration};
pub use rewards::{find_one_away, OneAway, OneAwayEntry, PetProgress, RewardEngine, RewardProgress};
