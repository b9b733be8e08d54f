// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Weekly check-ins: attendance tracking across independently run hosts.
//!
//! This crate provides the storage schema, repositories, the check-in and
//! reward engines, and the HTTP API used by host staff.

pub mod config;
pub mod db;
pub mod error;
pub mod keys;
pub mod middleware;
pub mod models;
pub mod repo;
pub mod routes;
pub mod services;
pub mod time_utils;

use std::sync::Arc;

use config::{Config, ConfigError};
use db::ItemStore;
use repo::Repositories;
use services::{AthleteService, CheckInEngine, DisclaimerGate, HostAdmin, RewardEngine};
use time_utils::Clock;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub repos: Repositories,
    pub check_ins: CheckInEngine,
    pub disclaimers: DisclaimerGate,
    pub rewards: RewardEngine,
    pub hosts: HostAdmin,
    pub athletes: AthleteService,
}

impl AppState {
    /// Wire repositories and engines over one store and clock.
    pub fn new(
        config: Config,
        store: Arc<dyn ItemStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        let calendar = config.week_calendar()?;
        let repos = Repositories::new(store, clock.clone());
        Ok(Self {
            check_ins: CheckInEngine::new(repos.clone(), clock.clone(), calendar),
            disclaimers: DisclaimerGate::new(repos.clone(), clock),
            rewards: RewardEngine::new(repos.clone()),
            hosts: HostAdmin::new(repos.clone(), config.passphrase_key.clone()),
            athletes: AthleteService::new(repos.clone()),
            repos,
            config,
        })
    }
}
